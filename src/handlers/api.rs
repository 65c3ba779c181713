use actix_web::{get, post, web, HttpResponse};
use serde::{Deserialize, Serialize};

use super::{required, Reply};
use crate::admin::{Announcement, AnnouncementStatus};
use crate::error::AppError;
use crate::progress::SubmitOutcome;
use crate::session::CurrentUser;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    project: Option<String>,
    index: Option<i64>,
    /// 用户选择的答案，如 "A" 或 "ABC"
    answer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProjectRequest {
    project: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HashRequest {
    hash: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitResponse {
    success: bool,
    #[serde(flatten)]
    outcome: SubmitOutcome,
}

#[derive(Debug, Serialize)]
struct RandomResponse {
    success: bool,
    index: Option<usize>,
    all_answered: bool,
}

#[derive(Debug, Serialize)]
struct AnnouncementsResponse<T> {
    success: bool,
    announcements: Vec<T>,
}

#[post("/api/submit_answer")]
pub async fn submit_answer(
    user: CurrentUser,
    state: web::Data<AppState>,
    body: web::Json<SubmitRequest>,
) -> Result<HttpResponse, AppError> {
    let SubmitRequest { project, index, answer } = body.into_inner();
    let project = required(project)?;
    let answer = required(answer)?;
    let index = index.ok_or_else(AppError::incomplete)?;

    let outcome = state
        .progress
        .submit_answer(&state.bank, &user.token, &project, index, &answer)?;
    Ok(HttpResponse::Ok().json(SubmitResponse { success: true, outcome }))
}

#[post("/api/reset_progress")]
pub async fn reset_progress(
    user: CurrentUser,
    state: web::Data<AppState>,
    body: web::Json<ProjectRequest>,
) -> Result<HttpResponse, AppError> {
    let project = required(body.into_inner().project)?;
    state.progress.reset(&user.token, &project)?;
    Ok(HttpResponse::Ok().json(Reply::ok()))
}

#[post("/api/get_random_unanswered")]
pub async fn get_random_unanswered(
    user: CurrentUser,
    state: web::Data<AppState>,
    body: web::Json<ProjectRequest>,
) -> Result<HttpResponse, AppError> {
    let project = required(body.into_inner().project)?;
    let index = state
        .progress
        .pick_random_unanswered(&state.bank, &user.token, &project)?;
    Ok(HttpResponse::Ok().json(RandomResponse {
        success: true,
        index,
        all_answered: index.is_none(),
    }))
}

#[get("/api/get_unread_announcements")]
pub async fn get_unread_announcements(
    user: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let read = state.progress.get(&user.token)?.read_announcements;
    let announcements: Vec<Announcement> = state.config.unread_announcements(&read)?;
    Ok(HttpResponse::Ok().json(AnnouncementsResponse { success: true, announcements }))
}

#[get("/api/get_all_announcements")]
pub async fn get_all_announcements(
    user: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let read = state.progress.get(&user.token)?.read_announcements;
    let announcements: Vec<AnnouncementStatus> = state.config.announcements_with_status(&read)?;
    Ok(HttpResponse::Ok().json(AnnouncementsResponse { success: true, announcements }))
}

#[post("/api/mark_announcement_read")]
pub async fn mark_announcement_read(
    user: CurrentUser,
    state: web::Data<AppState>,
    body: web::Json<HashRequest>,
) -> Result<HttpResponse, AppError> {
    let hash = required(body.into_inner().hash)?;
    state.progress.mark_announcement_read(&user.token, &hash)?;
    Ok(HttpResponse::Ok().json(Reply::ok()))
}
