//! 配置加载
//!
//! 查找顺序：显式路径 → `EASYAI_CONFIG` 环境变量 → 默认值。
//! `api_key` 为空时用 `OPENROUTER_API_KEY` 环境变量补齐。

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{ApiKey, ChatConfig};

/// 配置文件路径环境变量
pub const CONFIG_PATH_ENV: &str = "EASYAI_CONFIG";
/// API Key 环境变量
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件失败 {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("解析配置文件失败 {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("序列化配置失败: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// 加载配置
pub fn load_config(path: Option<&Path>) -> Result<ChatConfig, ConfigError> {
    let path = path
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

    let config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            let config = parse_config(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
            tracing::info!("[Config] 已加载配置文件: {}", path.display());
            config
        }
        None => {
            tracing::info!("[Config] 未指定配置文件，使用默认配置");
            ChatConfig::default()
        }
    };

    Ok(apply_env(config).normalized())
}

/// 解析 YAML
pub fn parse_config(content: &str) -> Result<ChatConfig, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(ChatConfig::default());
    }
    serde_yaml::from_str(content)
}

/// 保存配置
pub fn save_config(config: &ChatConfig, path: &Path) -> Result<(), ConfigError> {
    let content = serde_yaml::to_string(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_env(mut config: ChatConfig) -> ChatConfig {
    if config.api_key.is_empty() {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                tracing::debug!("[Config] 使用环境变量中的 API Key");
                config.api_key = ApiKey::new(key);
            }
        }
    }
    config
}
