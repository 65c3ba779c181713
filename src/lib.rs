//! 刷题 Web 服务：口令登录，按项目练习（背题 / 顺序 / 随机），进度按用户保存。

pub mod admin;
pub mod bank;
pub mod chapter;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod progress;
pub mod session;
pub mod settings;
pub mod storage;

use actix_web::web;

use crate::admin::ConfigStore;
use crate::bank::QuestionBank;
use crate::progress::ProgressStore;
use crate::session::SessionStore;
use crate::settings::Settings;

/// 所有 worker 共享，写操作都经过各存储自己的锁
#[derive(Debug)]
pub struct AppState {
    pub bank: QuestionBank,
    pub progress: ProgressStore,
    pub config: ConfigStore,
    pub sessions: SessionStore,
}

impl AppState {
    pub fn new(settings: &Settings) -> Self {
        Self {
            bank: QuestionBank::new(&settings.data_dir),
            progress: ProgressStore::new(&settings.usr_dir),
            config: ConfigStore::new(
                settings.admin_config_path(),
                settings.default_admin_password.clone(),
            ),
            sessions: SessionStore::new(),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    handlers::configure(cfg);
}
