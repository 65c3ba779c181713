use actix_web::http::header::{self, ContentType};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{redirect, required, Reply};
use crate::admin::Announcement;
use crate::error::AppError;
use crate::progress::UserStats;
use crate::session::{session_cookie, session_id, AdminUser};
use crate::AppState;

const ADMIN_LOGIN_FORM: &str = r#"<!doctype html>
<meta charset="utf-8">
<title>管理员登录</title>
<form method="post" action="/admin/login">
  <input type="password" name="password" placeholder="管理员密码" autofocus>
  <button type="submit">登录</button>
</form>
"#;

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewPasswordForm {
    #[serde(default)]
    new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
pub struct HashForm {
    hash: Option<String>,
}

#[derive(Debug, Serialize)]
struct Dashboard {
    tokens: Vec<String>,
    users_stats: Vec<UserStats>,
    announcements: Vec<Announcement>,
}

#[derive(Debug, Serialize)]
struct Published {
    #[serde(flatten)]
    reply: Reply,
    announcement: Announcement,
}

#[get("/admin/login")]
pub async fn login_form() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(ADMIN_LOGIN_FORM)
}

#[post("/admin/login")]
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<PasswordForm>,
) -> Result<HttpResponse, AppError> {
    if !state.config.verify_password(&form.password)? {
        warn!("Admin login rejected");
        return Err(AppError::Unauthorized("密码错误".to_string()));
    }
    let id = state.sessions.rotate(session_id(&req), |s| s.is_admin = true);
    info!("Admin logged in (session {})", id);
    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/admin"))
        .cookie(session_cookie(id))
        .finish())
}

#[get("/admin/logout")]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(id) = session_id(&req) {
        state.sessions.release(id, |s| s.is_admin = false);
    }
    redirect("/admin/login")
}

#[get("/admin")]
pub async fn dashboard(
    _admin: AdminUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let config = state.config.load()?;
    Ok(HttpResponse::Ok().json(Dashboard {
        tokens: config.allowed_tokens,
        users_stats: state.progress.user_stats()?,
        announcements: config.announcements,
    }))
}

#[post("/admin/add_token")]
pub async fn add_token(
    _admin: AdminUser,
    state: web::Data<AppState>,
    form: web::Form<TokenForm>,
) -> Result<HttpResponse, AppError> {
    let token = required(form.into_inner().token)?;
    state.config.add_token(&token)?;
    Ok(HttpResponse::Ok().json(Reply::with_message(format!("口令 \"{token}\" 已添加"))))
}

#[post("/admin/remove_token")]
pub async fn remove_token(
    _admin: AdminUser,
    state: web::Data<AppState>,
    form: web::Form<TokenForm>,
) -> Result<HttpResponse, AppError> {
    let token = required(form.into_inner().token)?;
    let message = if state.config.remove_token(&token)? {
        format!("口令 \"{token}\" 已删除")
    } else {
        format!("口令 \"{token}\" 不存在")
    };
    Ok(HttpResponse::Ok().json(Reply::with_message(message)))
}

#[post("/admin/change_password")]
pub async fn change_password(
    _admin: AdminUser,
    state: web::Data<AppState>,
    form: web::Form<NewPasswordForm>,
) -> Result<HttpResponse, AppError> {
    state.config.change_password(&form.new_password)?;
    Ok(HttpResponse::Ok().json(Reply::with_message("密码已修改")))
}

#[post("/admin/add_announcement")]
pub async fn add_announcement(
    _admin: AdminUser,
    state: web::Data<AppState>,
    form: web::Form<AnnouncementForm>,
) -> Result<HttpResponse, AppError> {
    let announcement = state.config.add_announcement(&form.title, &form.content)?;
    Ok(HttpResponse::Ok().json(Published {
        reply: Reply::with_message("公告发布成功"),
        announcement,
    }))
}

#[post("/admin/delete_announcement")]
pub async fn delete_announcement(
    _admin: AdminUser,
    state: web::Data<AppState>,
    form: web::Form<HashForm>,
) -> Result<HttpResponse, AppError> {
    let hash = required(form.into_inner().hash)?;
    state.config.delete_announcement(&hash)?;
    Ok(HttpResponse::Ok().json(Reply::with_message("公告已删除")))
}
