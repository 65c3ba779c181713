//! HTTP 路由。

mod admin;
mod api;
mod auth;
mod pages;

use actix_web::http::header;
use actix_web::{web, HttpResponse};
use log::warn;
use serde::Serialize;

use crate::error::AppError;

/// JSON 接口统一的 `{success, message}` 返回体
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Reply {
    pub fn ok() -> Self {
        Self { success: true, message: None }
    }

    pub fn with_message(message: impl Into<String>) -> Self {
        Self { success: true, message: Some(message.into()) }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, message: Some(message.into()) }
    }
}

pub(crate) fn redirect(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}

/// 空字符串按缺少参数处理
pub(crate) fn required(value: Option<String>) -> Result<String, AppError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(AppError::incomplete)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, req| {
        warn!("Rejected JSON body for {}: {}", req.path(), err);
        AppError::incomplete().into()
    }))
    .app_data(web::FormConfig::default().error_handler(|err, req| {
        warn!("Rejected form body for {}: {}", req.path(), err);
        AppError::incomplete().into()
    }))
    .service(auth::index)
    .service(auth::login_form)
    .service(auth::login)
    .service(auth::logout)
    .service(pages::projects)
    .service(pages::practice)
    .service(api::submit_answer)
    .service(api::reset_progress)
    .service(api::get_random_unanswered)
    .service(api::get_unread_announcements)
    .service(api::get_all_announcements)
    .service(api::mark_announcement_read)
    .service(admin::login_form)
    .service(admin::login)
    .service(admin::logout)
    .service(admin::dashboard)
    .service(admin::add_token)
    .service(admin::remove_token)
    .service(admin::change_password)
    .service(admin::add_announcement)
    .service(admin::delete_announcement);
}

#[cfg(test)]
mod tests {
    use actix_web::cookie::Cookie;
    use actix_web::http::StatusCode;
    use actix_web::{test, web, App};

    use crate::session::SESSION_COOKIE;
    use crate::settings::Settings;
    use crate::AppState;

    fn state(dir: &tempfile::TempDir) -> web::Data<AppState> {
        let settings = Settings {
            bind: "127.0.0.1:0".into(),
            data_dir: dir.path().join("data"),
            usr_dir: dir.path().to_path_buf(),
            default_admin_password: "admin123".into(),
        };
        web::Data::new(AppState::new(&settings))
    }

    fn session_cookie<B>(resp: &actix_web::dev::ServiceResponse<B>) -> Cookie<'static> {
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        resp.response()
            .cookies()
            .find(|c| c.name() == SESSION_COOKIE)
            .unwrap()
            .into_owned()
    }

    #[actix_web::test]
    async fn logout_releases_the_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(&dir);
        let app =
            test::init_service(App::new().app_data(state.clone()).configure(super::configure))
                .await;

        for _ in 0..50 {
            let req = test::TestRequest::post()
                .uri("/login")
                .set_form([("token", "student")])
                .to_request();
            let cookie = session_cookie(&test::call_service(&app, req).await);
            assert_eq!(state.sessions.len(), 1);

            let req = test::TestRequest::get().uri("/logout").cookie(cookie).to_request();
            test::call_service(&app, req).await;
            assert_eq!(state.sessions.len(), 0);
        }

        let req = test::TestRequest::post()
            .uri("/admin/login")
            .set_form([("password", "admin123")])
            .to_request();
        let admin = session_cookie(&test::call_service(&app, req).await);
        let req = test::TestRequest::post()
            .uri("/login")
            .cookie(admin)
            .set_form([("token", "student")])
            .to_request();
        let both = session_cookie(&test::call_service(&app, req).await);
        assert_eq!(state.sessions.len(), 1);

        // 只退出管理员，用户登录仍然有效
        let req = test::TestRequest::get().uri("/admin/logout").cookie(both.clone()).to_request();
        test::call_service(&app, req).await;
        assert_eq!(state.sessions.len(), 1);
        let req = test::TestRequest::get().uri("/logout").cookie(both).to_request();
        test::call_service(&app, req).await;
        assert_eq!(state.sessions.len(), 0);
    }
}
