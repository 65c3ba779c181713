//! 存储层和 Web 层的错误类型。

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::handlers::Reply;

/// 读写磁盘上的 JSON 文档失败
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("atomic replace failed: {0}")]
    Persist(#[from] tempfile::PersistError),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BankError {
    #[error("invalid project id {0:?}")]
    InvalidId(String),

    #[error("project {0:?} not found")]
    NotFound(String),

    #[error("project {id:?} is ambiguous: {candidates:?}")]
    Ambiguous { id: String, candidates: Vec<String> },

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("question {index} out of range (project has {total})")]
    IndexOutOfRange { index: i64, total: usize },

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdminError {
    #[error("token must not be empty")]
    EmptyToken,

    #[error("token {0:?} already exists")]
    DuplicateToken(String),

    #[error("password must not be empty")]
    EmptyPassword,

    #[error("announcement title and content must not be empty")]
    EmptyAnnouncement,

    #[error("could not derive a unique announcement hash")]
    HashExhausted,

    #[error("announcement {0:?} not found")]
    AnnouncementNotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// 请求层错误，各存储层错误最终都转换成它
#[derive(Debug, Error)]
pub enum AppError {
    #[error("请先登录")]
    LoginRequired,

    #[error("redirect to {0}")]
    Redirect(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn incomplete() -> Self {
        AppError::BadRequest("参数不完整".to_string())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::LoginRequired | AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Redirect(_) => StatusCode::SEE_OTHER,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Redirect(location) => HttpResponse::SeeOther()
                .insert_header((header::LOCATION, *location))
                .finish(),
            _ => HttpResponse::build(self.status_code()).json(Reply::failure(self.to_string())),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        log::error!("Storage failure: {}", e);
        AppError::Internal("服务器内部错误".to_string())
    }
}

impl From<BankError> for AppError {
    fn from(e: BankError) -> Self {
        match e {
            BankError::InvalidId(_) | BankError::NotFound(_) => {
                AppError::NotFound("项目不存在".to_string())
            }
            BankError::Ambiguous { .. } => {
                log::warn!("{}", e);
                AppError::Conflict("项目名称不唯一".to_string())
            }
            BankError::Store(e) => e.into(),
        }
    }
}

impl From<ProgressError> for AppError {
    fn from(e: ProgressError) -> Self {
        match e {
            ProgressError::IndexOutOfRange { .. } => AppError::NotFound("题目不存在".to_string()),
            ProgressError::Bank(e) => e.into(),
            ProgressError::Store(e) => e.into(),
        }
    }
}

impl From<AdminError> for AppError {
    fn from(e: AdminError) -> Self {
        match e {
            AdminError::EmptyToken => AppError::BadRequest("口令不能为空".to_string()),
            AdminError::DuplicateToken(_) => AppError::Conflict("口令已存在".to_string()),
            AdminError::EmptyPassword => AppError::BadRequest("密码不能为空".to_string()),
            AdminError::EmptyAnnouncement => AppError::BadRequest("标题和内容不能为空".to_string()),
            AdminError::HashExhausted => {
                log::error!("{}", e);
                AppError::Internal("公告哈希生成失败".to_string())
            }
            AdminError::AnnouncementNotFound(_) => AppError::NotFound("公告不存在".to_string()),
            AdminError::Store(e) => e.into(),
        }
    }
}
