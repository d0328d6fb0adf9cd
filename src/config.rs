use std::env;
use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// 意图存储路径（sled 数据库目录）
    pub intent_store_path: String,
    /// 会话有效期（秒）
    pub session_ttl_secs: u64,
    /// 日志级别
    pub log_level: String,
    /// 日志格式（json / pretty / compact）
    pub log_format: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            intent_store_path: "./storage/intents".to_string(),
            session_ttl_secs: 3600,
            log_level: "info".to_string(),
            log_format: None,
        }
    }
}

impl ServiceConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("无法读取配置文件: {:?}", path.as_ref()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| "配置文件格式错误")?;

        Ok(toml_config.into())
    }

    /// 从环境变量合并配置（MENTORGATE_ 前缀）
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(path) = env::var("MENTORGATE_INTENT_STORE_PATH") {
            self.intent_store_path = path;
        }
        if let Ok(ttl) = env::var("MENTORGATE_SESSION_TTL_SECS") {
            self.session_ttl_secs = ttl.parse().unwrap_or(self.session_ttl_secs);
        }
        if let Ok(log_level) = env::var("MENTORGATE_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(log_format) = env::var("MENTORGATE_LOG_FORMAT") {
            self.log_format = Some(log_format);
        }

        Ok(())
    }

    /// 加载配置
    ///
    /// 优先级：MENTORGATE_CONFIG 指定的文件 > 当前目录的
    /// mentorgate.toml > 内置默认值；环境变量最后合并覆盖。
    pub fn load() -> Result<Self> {
        let mut config = if let Ok(config_file) = env::var("MENTORGATE_CONFIG") {
            info!("📄 从配置文件加载: {}", config_file);
            Self::from_toml_file(&config_file)?
        } else if Path::new("mentorgate.toml").exists() {
            info!("📄 从默认配置文件加载: mentorgate.toml");
            Self::from_toml_file("mentorgate.toml")?
        } else {
            Self::default()
        };

        config.merge_from_env()?;
        Ok(config)
    }
}

/// TOML 配置文件结构（各段均可省略）
#[derive(Debug, Deserialize)]
struct TomlConfig {
    store: Option<StoreSection>,
    session: Option<SessionSection>,
    log: Option<LogSection>,
}

#[derive(Debug, Deserialize)]
struct StoreSection {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionSection {
    ttl_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LogSection {
    level: Option<String>,
    format: Option<String>,
}

impl From<TomlConfig> for ServiceConfig {
    fn from(toml: TomlConfig) -> Self {
        let mut config = ServiceConfig::default();

        if let Some(store) = toml.store {
            if let Some(path) = store.path {
                config.intent_store_path = path;
            }
        }
        if let Some(session) = toml.session {
            if let Some(ttl_secs) = session.ttl_secs {
                config.session_ttl_secs = ttl_secs;
            }
        }
        if let Some(log) = toml.log {
            if let Some(level) = log.level {
                config.log_level = level;
            }
            config.log_format = log.format;
        }

        config
    }
}
