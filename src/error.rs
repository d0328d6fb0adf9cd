use std::fmt;
use std::error::Error as StdError;
use serde::{Serialize, Deserialize};

/// 服务错误类型
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServiceError {
    /// 内部错误
    Internal(String),
    /// 认证错误
    Authentication(String),
    /// 存储错误
    Storage(String),
    /// 序列化错误
    Serialization(String),
    /// 配置错误
    Configuration(String),
    /// 无效的请求
    InvalidRequest(String),
    /// 延迟动作执行失败
    ActionFailed(String),
    /// 会话未找到
    SessionNotFound(String),
    /// 用户未找到
    UserNotFound(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::Internal(msg) => write!(f, "Internal error: {}", msg),
            ServiceError::Authentication(msg) => write!(f, "Authentication error: {}", msg),
            ServiceError::Storage(msg) => write!(f, "Storage error: {}", msg),
            ServiceError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
            ServiceError::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            ServiceError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ServiceError::ActionFailed(msg) => write!(f, "Deferred action failed: {}", msg),
            ServiceError::SessionNotFound(id) => write!(f, "Session not found: {}", id),
            ServiceError::UserNotFound(id) => write!(f, "User not found: {}", id),
        }
    }
}

impl StdError for ServiceError {}

impl From<std::io::Error> for ServiceError {
    fn from(err: std::io::Error) -> Self {
        ServiceError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Serialization(err.to_string())
    }
}

impl From<sled::Error> for ServiceError {
    fn from(err: sled::Error) -> Self {
        ServiceError::Storage(err.to_string())
    }
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, ServiceError>;
