//! 用户做题进度，每个口令一个 JSON 文件。

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use md5::Md5;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::bank::QuestionBank;
use crate::error::{ProgressError, StoreError};
use crate::storage::{read_json, timestamp_now, write_json_atomic, KeyedLocks};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub answer: String,
    pub correct: bool,
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectProgress {
    /// 题目下标（字符串）-> 作答记录
    #[serde(default)]
    pub answers: BTreeMap<String, AnswerRecord>,
}

/// 进度文档顶层的已读公告字段，项目 id 不能占用
pub const READ_ANNOUNCEMENTS_KEY: &str = "read_announcements";

/// 用户进度文档：项目 id 作为顶层键，与 `read_announcements` 并列
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProgress {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub read_announcements: Vec<String>,
    #[serde(flatten)]
    pub projects: BTreeMap<String, ProjectProgress>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSummary {
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
}

impl UserProgress {
    pub fn project(&self, project_id: &str) -> Option<&ProjectProgress> {
        self.projects.get(project_id)
    }

    pub fn summary(&self, project_id: &str, total: usize) -> ProgressSummary {
        let answers = self.project(project_id).map(|p| &p.answers);
        ProgressSummary {
            total,
            answered: answers.map_or(0, BTreeMap::len),
            correct: answers.map_or(0, |a| a.values().filter(|r| r.correct).count()),
        }
    }

    /// 所有项目合计 (answered, correct)
    pub fn totals(&self) -> (usize, usize) {
        self.projects.values().fold((0, 0), |(answered, correct), p| {
            (
                answered + p.answers.len(),
                correct + p.answers.values().filter(|r| r.correct).count(),
            )
        })
    }

    pub fn unanswered(&self, project_id: &str, total: usize) -> Vec<usize> {
        let answers = self.project(project_id).map(|p| &p.answers);
        (0..total)
            .filter(|i| answers.map_or(true, |a| !a.contains_key(&i.to_string())))
            .collect()
    }
}

/// 答案比较：不计顺序，但重复字母要一致
pub fn answers_match(submitted: &str, expected: &str) -> bool {
    let mut a: Vec<char> = submitted.chars().collect();
    let mut b: Vec<char> = expected.chars().collect();
    a.sort_unstable();
    b.sort_unstable();
    a == b
}

pub fn pick_unanswered<R: Rng + ?Sized>(
    progress: &UserProgress,
    project_id: &str,
    total: usize,
    rng: &mut R,
) -> Option<usize> {
    progress.unanswered(project_id, total).choose(rng).copied()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitOutcome {
    pub correct: bool,
    pub correct_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStats {
    pub file: String,
    pub total_answered: usize,
    pub total_correct: usize,
}

#[derive(Debug)]
pub struct ProgressStore {
    dir: PathBuf,
    locks: KeyedLocks,
}

fn token_key(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn legacy_key(token: &str) -> String {
    hex::encode(Md5::digest(token.as_bytes()))[..16].to_string()
}

impl ProgressStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: KeyedLocks::new(),
        }
    }

    pub fn path_for(&self, token: &str) -> PathBuf {
        self.dir.join(format!("user_{}.json", token_key(token)))
    }

    fn legacy_path_for(&self, token: &str) -> PathBuf {
        self.dir.join(format!("user_{}.json", legacy_key(token)))
    }

    // 旧版文件名只取了 md5 前 16 位，首次访问时改名
    fn migrate_legacy(&self, token: &str, path: &Path) -> Result<(), StoreError> {
        if path.exists() {
            return Ok(());
        }
        let legacy = self.legacy_path_for(token);
        if legacy.is_file() {
            fs::rename(&legacy, path)?;
            info!("Migrated progress file {} -> {}", legacy.display(), path.display());
        }
        Ok(())
    }

    fn load(&self, token: &str) -> Result<UserProgress, StoreError> {
        let path = self.path_for(token);
        self.migrate_legacy(token, &path)?;
        Ok(read_json(&path)?.unwrap_or_default())
    }

    pub fn get(&self, token: &str) -> Result<UserProgress, StoreError> {
        let lock = self.locks.handle(&token_key(token));
        let _guard = lock.lock();
        self.load(token)
    }

    pub fn put(&self, token: &str, progress: &UserProgress) -> Result<(), StoreError> {
        let lock = self.locks.handle(&token_key(token));
        let _guard = lock.lock();
        write_json_atomic(&self.path_for(token), progress)
    }

    // 持有该口令的锁完成读-改-写；f 返回 false 时不落盘
    pub fn update<T>(
        &self,
        token: &str,
        f: impl FnOnce(&mut UserProgress) -> (T, bool),
    ) -> Result<T, StoreError> {
        let lock = self.locks.handle(&token_key(token));
        let _guard = lock.lock();
        let mut progress = self.load(token)?;
        let (out, changed) = f(&mut progress);
        if changed {
            write_json_atomic(&self.path_for(token), &progress)?;
        }
        Ok(out)
    }

    pub fn submit_answer(
        &self,
        bank: &QuestionBank,
        token: &str,
        project_id: &str,
        index: i64,
        submitted: &str,
    ) -> Result<SubmitOutcome, ProgressError> {
        let questions = bank.load_project(project_id)?;
        let idx = usize::try_from(index)
            .ok()
            .filter(|i| *i < questions.len())
            .ok_or(ProgressError::IndexOutOfRange {
                index,
                total: questions.len(),
            })?;

        let correct_answer = questions[idx].answer.clone();
        let correct = answers_match(submitted, &correct_answer);
        let record = AnswerRecord {
            answer: submitted.to_string(),
            correct,
            timestamp: timestamp_now(),
        };
        self.update(token, |progress| {
            progress
                .projects
                .entry(project_id.to_string())
                .or_default()
                .answers
                .insert(idx.to_string(), record);
            ((), true)
        })?;

        info!("Answer recorded: project={} index={} correct={}", project_id, idx, correct);
        Ok(SubmitOutcome {
            correct,
            correct_answer,
        })
    }

    /// 清空项目的作答记录，项目键保留
    pub fn reset(&self, token: &str, project_id: &str) -> Result<(), StoreError> {
        self.update(token, |progress| match progress.projects.get_mut(project_id) {
            Some(project) => {
                project.answers.clear();
                ((), true)
            }
            None => ((), false),
        })
    }

    /// 全部答完时返回 `Ok(None)`
    pub fn pick_random_unanswered(
        &self,
        bank: &QuestionBank,
        token: &str,
        project_id: &str,
    ) -> Result<Option<usize>, ProgressError> {
        let total = bank.load_project(project_id)?.len();
        let progress = self.get(token)?;
        Ok(pick_unanswered(&progress, project_id, total, &mut rand::thread_rng()))
    }

    pub fn mark_announcement_read(&self, token: &str, hash: &str) -> Result<(), StoreError> {
        self.update(token, |progress| {
            if progress.read_announcements.iter().any(|h| h == hash) {
                return ((), false);
            }
            progress.read_announcements.push(hash.to_string());
            ((), true)
        })
    }

    // 公告被删除后清理对应的已读记录
    pub fn prune_read_announcements(
        &self,
        token: &str,
        existing: &HashSet<String>,
    ) -> Result<UserProgress, StoreError> {
        self.update(token, |progress| {
            let before = progress.read_announcements.len();
            progress.read_announcements.retain(|h| existing.contains(h));
            let changed = progress.read_announcements.len() < before;
            (progress.clone(), changed)
        })
    }

    /// 管理后台用：逐个统计用户进度文件
    pub fn user_stats(&self) -> Result<Vec<UserStats>, StoreError> {
        let mut stats = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e.into()),
        };

        for entry in entries {
            let path = entry?.path();
            let Some(file) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
                continue;
            };
            if !file.starts_with("user_") || !file.ends_with(".json") {
                continue;
            }
            let progress: UserProgress = match read_json(&path) {
                Ok(Some(progress)) => progress,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping unreadable progress file {}: {}", file, e);
                    continue;
                }
            };
            let (total_answered, total_correct) = progress.totals();
            stats.push(UserStats {
                file,
                total_answered,
                total_correct,
            });
        }

        stats.sort_by(|a, b| a.file.cmp(&b.file));
        Ok(stats)
    }
}
