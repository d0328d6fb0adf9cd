use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 用户角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// 学员
    Student,
    /// 评审
    Judge,
    /// 管理员
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Student => "student",
            UserRole::Judge => "judge",
            UserRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 用户档案
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// 用户 ID
    pub user_id: String,
    /// 邮箱
    pub email: String,
    /// 角色
    pub role: UserRole,
}

impl UserProfile {
    pub fn new(user_id: impl Into<String>, email: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: user_id.into(),
            email: email.into(),
            role,
        }
    }
}

/// 认证会话
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    /// 会话 ID
    pub session_id: Uuid,
    /// 用户 ID
    pub user_id: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 过期时间
    pub expires_at: DateTime<Utc>,
}

impl AuthSession {
    /// 为用户创建新会话
    pub fn new(user_id: impl Into<String>, ttl_secs: u64) -> Self {
        let now = Utc::now();
        Self {
            session_id: Uuid::new_v4(),
            user_id: user_id.into(),
            created_at: now,
            expires_at: now + Duration::seconds(ttl_secs as i64),
        }
    }

    /// 判断会话是否已过期
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
