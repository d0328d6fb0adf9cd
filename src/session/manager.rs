use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, ServiceError};
use super::model::{AuthSession, UserProfile, UserRole};

/// 会话预言机接口
///
/// 认证状态的唯一裁决方。协调器只通过这个接口询问"当前是否有登录
/// 会话"；生产环境由托管认证服务适配实现，进程内实现见
/// [`SessionManager`]。接口返回 `Err` 时调用方按"未登录"处理，
/// 保证认证服务不可用时不会放行受保护动作。
#[async_trait]
pub trait SessionOracle: Send + Sync {
    /// 当前登录用户
    async fn current_user(&self) -> Result<Option<UserProfile>>;

    /// 当前认证会话
    async fn current_session(&self) -> Result<Option<AuthSession>>;
}

/// 会话管理器
///
/// 进程内的会话预言机实现：维护账号目录和当前登录态，
/// 过期会话在读取时惰性清除。
pub struct SessionManager {
    /// 账号目录
    accounts: Arc<DashMap<String, UserProfile>>,
    /// 当前登录态（档案 + 会话）
    current: RwLock<Option<(UserProfile, AuthSession)>>,
    /// 会话有效期（秒）
    session_ttl_secs: u64,
}

impl SessionManager {
    /// 创建新的会话管理器
    pub fn new(session_ttl_secs: u64) -> Self {
        Self {
            accounts: Arc::new(DashMap::new()),
            current: RwLock::new(None),
            session_ttl_secs,
        }
    }

    /// 注册账号
    pub fn register_account(&self, profile: UserProfile) {
        debug!("Registered account: {} ({})", profile.user_id, profile.role);
        self.accounts.insert(profile.user_id.clone(), profile);
    }

    /// 登录指定用户，返回新会话
    pub fn sign_in(&self, user_id: &str) -> Result<AuthSession> {
        let profile = self
            .accounts
            .get(user_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| ServiceError::UserNotFound(user_id.to_string()))?;

        let session = AuthSession::new(user_id, self.session_ttl_secs);
        info!("User signed in: {} -> {}", user_id, session.session_id);

        let mut current = self.current.write();
        *current = Some((profile, session.clone()));

        Ok(session)
    }

    /// 登出当前用户
    pub fn sign_out(&self) {
        let mut current = self.current.write();
        match current.take() {
            Some((profile, session)) => {
                info!("User signed out: {} ({})", profile.user_id, session.session_id);
            }
            None => {
                warn!("Sign-out requested with no active session");
            }
        }
    }

    /// 是否有活跃会话
    pub fn is_signed_in(&self) -> bool {
        self.active().is_some()
    }

    /// 当前登录用户的角色
    pub fn current_role(&self) -> Option<UserRole> {
        self.active().map(|(profile, _)| profile.role)
    }

    /// 读取当前登录态，过期会话就地清除
    fn active(&self) -> Option<(UserProfile, AuthSession)> {
        {
            let current = self.current.read();
            match current.as_ref() {
                Some((profile, session)) if !session.is_expired() => {
                    return Some((profile.clone(), session.clone()));
                }
                Some(_) => {}
                None => return None,
            }
        }

        // 会话已过期，升级为写锁清除
        let mut current = self.current.write();
        if let Some((profile, session)) = current.take() {
            if session.is_expired() {
                info!("Expired session removed for user: {}", profile.user_id);
                None
            } else {
                // 锁间隙内被重新登录
                let result = (profile.clone(), session.clone());
                *current = Some((profile, session));
                Some(result)
            }
        } else {
            None
        }
    }
}

#[async_trait]
impl SessionOracle for SessionManager {
    async fn current_user(&self) -> Result<Option<UserProfile>> {
        Ok(self.active().map(|(profile, _)| profile))
    }

    async fn current_session(&self) -> Result<Option<AuthSession>> {
        Ok(self.active().map(|(_, session)| session))
    }
}
