use actix_web::http::header::{self, ContentType};
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use log::{info, warn};
use serde::Deserialize;

use super::redirect;
use crate::error::AppError;
use crate::session::{current_session, session_cookie, session_id};
use crate::AppState;

const LOGIN_FORM: &str = r#"<!doctype html>
<meta charset="utf-8">
<title>登录</title>
<form method="post" action="/login">
  <input name="token" placeholder="口令" autofocus>
  <button type="submit">进入</button>
</form>
"#;

#[derive(Debug, Deserialize)]
pub struct TokenForm {
    #[serde(default)]
    token: String,
}

#[get("/")]
pub async fn index(req: HttpRequest) -> HttpResponse {
    let logged_in = current_session(&req).is_some_and(|s| s.token.is_some());
    redirect(if logged_in { "/projects" } else { "/login" })
}

#[get("/login")]
pub async fn login_form() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(LOGIN_FORM)
}

#[post("/login")]
pub async fn login(
    req: HttpRequest,
    state: web::Data<AppState>,
    form: web::Form<TokenForm>,
) -> Result<HttpResponse, AppError> {
    let token = form.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("请输入口令".to_string()));
    }
    if !state.config.is_token_allowed(token)? {
        warn!("Login rejected for unknown token");
        return Err(AppError::Unauthorized("口令无效".to_string()));
    }

    let id = state
        .sessions
        .rotate(session_id(&req), |s| s.token = Some(token.to_string()));
    info!("User logged in (session {})", id);

    Ok(HttpResponse::SeeOther()
        .insert_header((header::LOCATION, "/projects"))
        .cookie(session_cookie(id))
        .finish())
}

#[get("/logout")]
pub async fn logout(req: HttpRequest, state: web::Data<AppState>) -> HttpResponse {
    if let Some(id) = session_id(&req) {
        state.sessions.release(id, |s| s.token = None);
    }
    redirect("/login")
}
