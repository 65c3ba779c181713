use std::collections::BTreeMap;
use std::str::FromStr;

use actix_web::{get, web, HttpResponse};
use log::warn;
use serde::Serialize;

use super::redirect;
use crate::bank::ProjectEntry;
use crate::error::{AppError, BankError};
use crate::parser::ParsedQuestion;
use crate::progress::{AnswerRecord, ProgressSummary, UserProgress};
use crate::session::CurrentUser;
use crate::AppState;

/// 练习模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// 背题
    Memorize,
    /// 顺序练习
    Sequential,
    /// 随机练习
    Random,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memorize" => Ok(Mode::Memorize),
            "sequential" => Ok(Mode::Sequential),
            "random" => Ok(Mode::Random),
            other => Err(format!("unknown practice mode {other:?}")),
        }
    }
}

#[derive(Debug, Serialize)]
struct ProjectView {
    #[serde(flatten)]
    entry: ProjectEntry,
    #[serde(flatten)]
    progress: ProgressSummary,
}

#[derive(Debug, Serialize)]
struct ProjectsPage {
    folders: BTreeMap<String, Vec<ProjectView>>,
    standalone_projects: Vec<ProjectView>,
}

#[derive(Debug, Serialize)]
struct PracticeQuestion {
    index: usize,
    #[serde(flatten)]
    parsed: ParsedQuestion,
    answer: String,
    is_multi: bool,
}

#[derive(Debug, Serialize)]
struct PracticePage {
    project_name: String,
    mode: Mode,
    questions: Vec<PracticeQuestion>,
    user_answers: BTreeMap<String, AnswerRecord>,
    total: usize,
}

fn project_view(state: &AppState, progress: &UserProgress, entry: &ProjectEntry) -> ProjectView {
    // 单个题库损坏不影响整个列表
    let total = match state.bank.load_entry(entry) {
        Ok(records) => records.len(),
        Err(e) => {
            warn!("Failed to load project {}: {}", entry.id, e);
            0
        }
    };
    ProjectView {
        entry: entry.clone(),
        progress: progress.summary(&entry.id, total),
    }
}

#[get("/projects")]
pub async fn projects(
    user: CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let existing = state.config.load()?.announcement_hashes();
    let progress = state
        .progress
        .prune_read_announcements(&user.token, &existing)?;
    let listing = state.bank.list_projects()?;

    let page = ProjectsPage {
        folders: listing
            .folders
            .iter()
            .map(|(folder, entries)| {
                let views = entries
                    .iter()
                    .map(|e| project_view(&state, &progress, e))
                    .collect();
                (folder.clone(), views)
            })
            .collect(),
        standalone_projects: listing
            .standalone
            .iter()
            .map(|e| project_view(&state, &progress, e))
            .collect(),
    };
    Ok(HttpResponse::Ok().json(page))
}

#[get("/practice/{project}/{mode}")]
pub async fn practice(
    user: CurrentUser,
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (project, mode) = path.into_inner();
    let Ok(mode) = mode.parse::<Mode>() else {
        return Ok(redirect("/projects"));
    };

    let records = match state.bank.load_project(&project) {
        Ok(records) if !records.is_empty() => records,
        Ok(_) => {
            warn!("Project {} has no questions", project);
            return Ok(redirect("/projects"));
        }
        Err(BankError::Store(e)) => return Err(e.into()),
        Err(e) => {
            warn!("Practice requested for unavailable project: {}", e);
            return Ok(redirect("/projects"));
        }
    };

    let questions = records
        .iter()
        .enumerate()
        .map(|(index, record)| PracticeQuestion {
            index,
            parsed: record.parse(),
            answer: record.answer.clone(),
            is_multi: record.answer.chars().count() > 1,
        })
        .collect();

    let user_answers = state
        .progress
        .get(&user.token)?
        .projects
        .remove(&project)
        .map(|p| p.answers)
        .unwrap_or_default();

    Ok(HttpResponse::Ok().json(PracticePage {
        total: records.len(),
        project_name: project,
        mode,
        questions,
        user_answers,
    }))
}
