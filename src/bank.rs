//! 题库目录。
//!
//! - `<root>/<name>.json`：独立项目，id 为 `name`
//! - `<root>/<folder>/<name>.json`：文件夹项目，id 为 `folder + name`
//!
//! 每个文件是 `{"Q": ..., "A": ...}` 数组。

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::chapter::chapter_sort_key;
use crate::error::{BankError, StoreError};
use crate::parser::{parse_question, ParsedQuestion};
use crate::progress::READ_ANNOUNCEMENTS_KEY;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(rename = "Q", alias = "question")]
    pub question: String,
    #[serde(rename = "A", alias = "answer")]
    pub answer: String,
}

impl QuestionRecord {
    pub fn parse(&self) -> ParsedQuestion {
        parse_question(&self.question)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectEntry {
    pub id: String,
    pub display_name: String,
    pub folder: Option<String>,
    pub file: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProjectListing {
    /// 文件夹按名称排序，文件夹内按章节排序
    pub folders: BTreeMap<String, Vec<ProjectEntry>>,
    pub standalone: Vec<ProjectEntry>,
}

#[derive(Debug, Clone)]
pub struct QuestionBank {
    root: PathBuf,
}

fn json_stem(path: &Path) -> Option<String> {
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return None;
    }
    path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

// 与进度文档的顶层字段同名的 id 不能作为项目
fn is_reserved(id: &str) -> bool {
    id == READ_ANNOUNCEMENTS_KEY
}

fn read_records(path: &Path) -> Result<Vec<QuestionRecord>, BankError> {
    let data = fs::read_to_string(path).map_err(StoreError::from)?;
    let records = serde_json::from_str(&data).map_err(|e| {
        warn!("Failed to parse question bank {}: {}", path.display(), e);
        StoreError::from(e)
    })?;
    Ok(records)
}

impl QuestionBank {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 列出题库根目录下的全部项目
    pub fn list_projects(&self) -> Result<ProjectListing, BankError> {
        let mut listing = ProjectListing::default();

        for entry in fs::read_dir(&self.root).map_err(StoreError::from)? {
            let path = entry.map_err(StoreError::from)?.path();

            if path.is_dir() {
                let folder = file_name(&path);
                let mut projects = Vec::new();
                for child in fs::read_dir(&path).map_err(StoreError::from)? {
                    let child = child.map_err(StoreError::from)?.path();
                    if !child.is_file() {
                        continue;
                    }
                    if let Some(stem) = json_stem(&child) {
                        let id = format!("{folder}{stem}");
                        if is_reserved(&id) {
                            warn!("Skipping project with reserved id: {}", child.display());
                            continue;
                        }
                        projects.push(ProjectEntry {
                            id,
                            display_name: stem,
                            folder: Some(folder.clone()),
                            file: file_name(&child),
                        });
                    }
                }
                if projects.is_empty() {
                    continue;
                }
                // read_dir 顺序不固定，先按名称排，章节相同的保持名称顺序
                projects.sort_by(|a, b| a.display_name.cmp(&b.display_name));
                projects.sort_by_key(|p| chapter_sort_key(&p.display_name));
                listing.folders.insert(folder, projects);
            } else if let Some(stem) = json_stem(&path) {
                if is_reserved(&stem) {
                    warn!("Skipping project with reserved id: {}", path.display());
                    continue;
                }
                listing.standalone.push(ProjectEntry {
                    id: stem.clone(),
                    display_name: stem,
                    folder: None,
                    file: file_name(&path),
                });
            }
        }

        listing.standalone.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(listing)
    }

    /// 项目 id 必须恰好对应一个文件
    pub fn resolve(&self, id: &str) -> Result<PathBuf, BankError> {
        if id.is_empty() || id.contains(['/', '\\', '\0']) || is_reserved(id) {
            return Err(BankError::InvalidId(id.to_string()));
        }

        let standalone = self.root.join(format!("{id}.json"));
        if standalone.is_file() {
            return Ok(standalone);
        }

        let mut candidates = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(StoreError::from)? {
            let folder = entry.map_err(StoreError::from)?.path();
            if !folder.is_dir() {
                continue;
            }
            let name = file_name(&folder);
            let Some(rest) = id.strip_prefix(name.as_str()) else {
                continue;
            };
            let candidate = folder.join(format!("{rest}.json"));
            if candidate.is_file() {
                candidates.push(candidate);
            }
        }

        match candidates.len() {
            0 => Err(BankError::NotFound(id.to_string())),
            1 => Ok(candidates.remove(0)),
            _ => {
                candidates.sort();
                Err(BankError::Ambiguous {
                    id: id.to_string(),
                    candidates: candidates
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect(),
                })
            }
        }
    }

    // 空文件返回 Ok(vec![])，不存在的 id 是 NotFound
    pub fn load_project(&self, id: &str) -> Result<Vec<QuestionRecord>, BankError> {
        let records = read_records(&self.resolve(id)?)?;
        info!("Loaded {} questions for project {}", records.len(), id);
        Ok(records)
    }

    /// 按列表项的路径直接读取，不经过 id 解析
    pub fn load_entry(&self, entry: &ProjectEntry) -> Result<Vec<QuestionRecord>, BankError> {
        let path = match &entry.folder {
            Some(folder) => self.root.join(folder).join(&entry.file),
            None => self.root.join(&entry.file),
        };
        read_records(&path)
    }
}
