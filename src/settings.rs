use std::path::PathBuf;

use clap::Parser;

/// 运行参数，均可通过环境变量设置
#[derive(Debug, Clone, Parser)]
#[command(name = "quizbank", version, about = "刷题服务：背题、顺序练习、随机练习")]
pub struct Settings {
    /// HTTP 监听地址
    #[arg(long, env = "QUIZ_BIND", default_value = "127.0.0.1:8790")]
    pub bind: String,

    /// 题库目录（JSON 文件和一层子文件夹）
    #[arg(long, env = "QUIZ_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// 用户进度和管理配置的目录
    #[arg(long, env = "QUIZ_USR_DIR", default_value = "usr")]
    pub usr_dir: PathBuf,

    /// 首次创建管理配置时使用的管理员密码
    #[arg(
        long,
        env = "QUIZ_ADMIN_PASSWORD",
        default_value = "admin123",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub default_admin_password: String,
}

impl Settings {
    pub fn admin_config_path(&self) -> PathBuf {
        self.usr_dir.join("admin_config.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = Settings::parse_from(["quizbank"]);
        assert_eq!(settings.bind, "127.0.0.1:8790");
        assert_eq!(settings.admin_config_path(), PathBuf::from("usr/admin_config.json"));
    }

    #[test]
    fn flags_override_defaults() {
        let settings = Settings::parse_from([
            "quizbank",
            "--bind",
            "0.0.0.0:5000",
            "--data-dir",
            "/srv/banks",
        ]);
        assert_eq!(settings.bind, "0.0.0.0:5000");
        assert_eq!(settings.data_dir, PathBuf::from("/srv/banks"));
    }
}
