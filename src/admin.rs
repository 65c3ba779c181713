//! 管理配置：管理员密码哈希、允许的口令列表和公告。

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::info;
use md5::Md5;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{AdminError, StoreError};
use crate::storage::{read_json, timestamp_now, write_json_atomic};

pub const SEED_TOKENS: [&str; 2] = ["user123", "student"];
const HASH_RETRIES: usize = 10;
const HASH_LEN: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Announcement {
    pub hash: String,
    pub title: String,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnouncementStatus {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub is_read: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminConfig {
    pub admin_password: String,
    pub allowed_tokens: Vec<String>,
    /// 最新的在前
    #[serde(default)]
    pub announcements: Vec<Announcement>,
}

impl AdminConfig {
    pub fn with_password(password: &str) -> Self {
        Self {
            admin_password: hash_password(password),
            allowed_tokens: SEED_TOKENS.iter().map(|t| t.to_string()).collect(),
            announcements: Vec::new(),
        }
    }

    pub fn announcement_hashes(&self) -> HashSet<String> {
        self.announcements.iter().map(|a| a.hash.clone()).collect()
    }
}

pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn short_md5(source: &str) -> String {
    hex::encode(Md5::digest(source.as_bytes()))[..HASH_LEN].to_string()
}

/// 公告哈希：md5(时间戳+标题+内容) 前 10 位，冲突时追加尝试次数重算，最多 10 次
pub fn derive_announcement_hash(
    timestamp: &str,
    title: &str,
    content: &str,
    existing: &HashSet<String>,
) -> Result<String, AdminError> {
    let base = format!("{timestamp}{title}{content}");
    let mut hash = short_md5(&base);
    let mut attempt = 0;
    while existing.contains(&hash) && attempt < HASH_RETRIES {
        attempt += 1;
        hash = short_md5(&format!("{base}{attempt}"));
    }
    if existing.contains(&hash) {
        return Err(AdminError::HashExhausted);
    }
    Ok(hash)
}

/// 管理配置文档，首次访问时按默认值创建
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    default_password: String,
    lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, default_password: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            default_password: default_password.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // 调用方必须持有 self.lock
    fn load_locked(&self) -> Result<AdminConfig, StoreError> {
        if let Some(config) = read_json(&self.path)? {
            return Ok(config);
        }
        let config = AdminConfig::with_password(&self.default_password);
        write_json_atomic(&self.path, &config)?;
        info!("Created default admin config at {}", self.path.display());
        Ok(config)
    }

    pub fn load(&self) -> Result<AdminConfig, StoreError> {
        let _guard = self.lock.lock();
        self.load_locked()
    }

    fn modify<T>(
        &self,
        f: impl FnOnce(&mut AdminConfig) -> Result<T, AdminError>,
    ) -> Result<T, AdminError> {
        let _guard = self.lock.lock();
        let mut config = self.load_locked()?;
        let out = f(&mut config)?;
        write_json_atomic(&self.path, &config)?;
        Ok(out)
    }

    pub fn is_token_allowed(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.load()?.allowed_tokens.iter().any(|t| t == token))
    }

    pub fn verify_password(&self, password: &str) -> Result<bool, StoreError> {
        Ok(self.load()?.admin_password == hash_password(password))
    }

    pub fn add_token(&self, token: &str) -> Result<(), AdminError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AdminError::EmptyToken);
        }
        self.modify(|config| {
            if config.allowed_tokens.iter().any(|t| t == token) {
                return Err(AdminError::DuplicateToken(token.to_string()));
            }
            config.allowed_tokens.push(token.to_string());
            Ok(())
        })?;
        info!("Access token added");
        Ok(())
    }

    // 返回是否真的删掉了；该口令的进度文件保留
    pub fn remove_token(&self, token: &str) -> Result<bool, AdminError> {
        let token = token.trim();
        let _guard = self.lock.lock();
        let mut config = self.load_locked()?;
        let before = config.allowed_tokens.len();
        config.allowed_tokens.retain(|t| t != token);
        if config.allowed_tokens.len() == before {
            return Ok(false);
        }
        write_json_atomic(&self.path, &config)?;
        info!("Access token removed");
        Ok(true)
    }

    pub fn change_password(&self, new_password: &str) -> Result<(), AdminError> {
        let new_password = new_password.trim();
        if new_password.is_empty() {
            return Err(AdminError::EmptyPassword);
        }
        self.modify(|config| {
            config.admin_password = hash_password(new_password);
            Ok(())
        })?;
        info!("Admin password changed");
        Ok(())
    }

    pub fn announcements(&self) -> Result<Vec<Announcement>, StoreError> {
        Ok(self.load()?.announcements)
    }

    pub fn add_announcement(&self, title: &str, content: &str) -> Result<Announcement, AdminError> {
        self.add_announcement_at(&timestamp_now(), title, content)
    }

    pub fn add_announcement_at(
        &self,
        timestamp: &str,
        title: &str,
        content: &str,
    ) -> Result<Announcement, AdminError> {
        let (title, content) = (title.trim(), content.trim());
        if title.is_empty() || content.is_empty() {
            return Err(AdminError::EmptyAnnouncement);
        }
        let announcement = self.modify(|config| {
            let hash =
                derive_announcement_hash(timestamp, title, content, &config.announcement_hashes())?;
            let announcement = Announcement {
                hash,
                title: title.to_string(),
                content: content.to_string(),
                timestamp: timestamp.to_string(),
            };
            config.announcements.insert(0, announcement.clone());
            Ok(announcement)
        })?;
        info!("Announcement {} published", announcement.hash);
        Ok(announcement)
    }

    pub fn delete_announcement(&self, hash: &str) -> Result<(), AdminError> {
        self.modify(|config| {
            let before = config.announcements.len();
            config.announcements.retain(|a| a.hash != hash);
            if config.announcements.len() == before {
                return Err(AdminError::AnnouncementNotFound(hash.to_string()));
            }
            Ok(())
        })?;
        info!("Announcement {} deleted", hash);
        Ok(())
    }

    pub fn unread_announcements(&self, read: &[String]) -> Result<Vec<Announcement>, StoreError> {
        Ok(self
            .announcements()?
            .into_iter()
            .filter(|a| !read.contains(&a.hash))
            .collect())
    }

    pub fn announcements_with_status(
        &self,
        read: &[String],
    ) -> Result<Vec<AnnouncementStatus>, StoreError> {
        Ok(self
            .announcements()?
            .into_iter()
            .map(|announcement| AnnouncementStatus {
                is_read: read.contains(&announcement.hash),
                announcement,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ConfigStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::new(dir.path().join("admin_config.json"), "admin123");
        (dir, store)
    }

    #[test]
    fn defaults_are_created_lazily() {
        let (_dir, store) = store();
        assert!(!store.path().exists());
        let config = store.load().unwrap();
        assert!(store.path().exists());
        assert_eq!(config.allowed_tokens, vec!["user123", "student"]);
        assert_eq!(
            config.admin_password,
            "240be518fabd2724ddb6f04eeb1da5967448d7e831c08c8fa822809f74c720a9"
        );
        assert!(store.verify_password("admin123").unwrap());
        assert!(!store.verify_password("wrong").unwrap());
    }

    #[test]
    fn tokens_can_be_added_and_removed() {
        let (_dir, store) = store();
        store.add_token("  newbie ").unwrap();
        assert!(store.is_token_allowed("newbie").unwrap());
        assert!(matches!(store.add_token("newbie"), Err(AdminError::DuplicateToken(_))));
        assert!(matches!(store.add_token("   "), Err(AdminError::EmptyToken)));

        assert!(store.remove_token("newbie").unwrap());
        assert!(!store.remove_token("newbie").unwrap());
        assert!(!store.is_token_allowed("newbie").unwrap());
    }

    #[test]
    fn password_change_rejects_empty() {
        let (_dir, store) = store();
        assert!(matches!(store.change_password("  "), Err(AdminError::EmptyPassword)));
        store.change_password("s3cret").unwrap();
        assert!(store.verify_password("s3cret").unwrap());
        assert!(!store.verify_password("admin123").unwrap());
    }

    #[test]
    fn identical_announcements_get_distinct_hashes() {
        let (_dir, store) = store();
        let ts = "2024-05-01T08:00:00.000000";
        let first = store.add_announcement_at(ts, "停机", "今晚维护").unwrap();
        let second = store.add_announcement_at(ts, "停机", "今晚维护").unwrap();
        assert_ne!(first.hash, second.hash);
        assert_eq!(first.hash.len(), 10);
        assert_eq!(first.hash, short_md5(&format!("{ts}停机今晚维护")));
        assert_eq!(second.hash, short_md5(&format!("{ts}停机今晚维护1")));

        // 最新的在前
        let all = store.announcements().unwrap();
        assert_eq!(all[0].hash, second.hash);
        assert_eq!(all[1].hash, first.hash);
    }

    #[test]
    fn hash_retries_are_bounded() {
        let (_dir, store) = store();
        let ts = "2024-05-01T08:00:00.000000";
        for _ in 0..=HASH_RETRIES {
            store.add_announcement_at(ts, "t", "c").unwrap();
        }
        assert!(matches!(
            store.add_announcement_at(ts, "t", "c"),
            Err(AdminError::HashExhausted)
        ));
        assert_eq!(store.announcements().unwrap().len(), HASH_RETRIES + 1);
    }

    #[test]
    fn empty_announcements_are_rejected() {
        let (_dir, store) = store();
        assert!(matches!(
            store.add_announcement("", "body"),
            Err(AdminError::EmptyAnnouncement)
        ));
        assert!(matches!(
            store.add_announcement("title", " "),
            Err(AdminError::EmptyAnnouncement)
        ));
    }

    #[test]
    fn unread_and_delete() {
        let (_dir, store) = store();
        let a = store.add_announcement("一", "内容一").unwrap();
        let b = store.add_announcement("二", "内容二").unwrap();
        let read = vec![a.hash.clone()];

        let unread = store.unread_announcements(&read).unwrap();
        assert_eq!(unread, vec![b.clone()]);

        let status = store.announcements_with_status(&read).unwrap();
        assert_eq!(
            status.iter().map(|s| (s.announcement.title.as_str(), s.is_read)).collect::<Vec<_>>(),
            vec![("二", false), ("一", true)]
        );

        store.delete_announcement(&a.hash).unwrap();
        assert!(matches!(
            store.delete_announcement(&a.hash),
            Err(AdminError::AnnouncementNotFound(_))
        ));
        assert_eq!(store.announcements().unwrap(), vec![b]);
    }

    #[test]
    fn config_without_announcements_still_loads() {
        let (_dir, store) = store();
        std::fs::write(
            store.path(),
            r#"{"admin_password": "x", "allowed_tokens": ["only"]}"#,
        )
        .unwrap();
        let config = store.load().unwrap();
        assert_eq!(config.allowed_tokens, vec!["only"]);
        assert!(config.announcements.is_empty());
    }
}
