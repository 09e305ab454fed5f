pub mod config;
pub mod manager;

pub use config::{
    ApiToken, AuthConfig, Config, ConfigError, ConfigResult, LlmConfig, LogLevel, LoggingConfig,
    ServerConfig, StorageConfig, StorageType, DEFAULT_COLLECTION, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
pub use manager::ConfigManager;

use std::path::PathBuf;

/// 获取 Parley 配置目录路径
pub fn parley_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".parley"))
}

/// 获取默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    parley_dir().map(|dir| dir.join("config.json"))
}

/// 获取默认数据目录
pub fn default_data_dir() -> Option<PathBuf> {
    parley_dir().map(|dir| dir.join("data"))
}

/// 展开路径中的 ~ 为用户主目录
pub fn expand_tilde(path: &str) -> Option<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map(|home| home.join(rest)),
        None => Some(PathBuf::from(path)),
    }
}
