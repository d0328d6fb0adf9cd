use std::sync::Arc;

use tracing::info;

use crate::config::ServiceConfig;
use crate::coordinator::ProtectedActionCoordinator;
use crate::error::Result;
use crate::intent::SledIntentStore;
use crate::session::SessionManager;

/// 受保护动作服务
///
/// 按配置装配整个子系统：打开持久化意图存储，创建会话管理器，
/// 再把两者交给协调器。各组件以 `Arc` 共享，表示层和页面回调
/// 可以分别持有协调器与会话管理器。
pub struct ProtectedActionService {
    config: ServiceConfig,
    sessions: Arc<SessionManager>,
    coordinator: Arc<ProtectedActionCoordinator>,
}

impl ProtectedActionService {
    /// 按配置创建服务
    pub fn from_config(config: ServiceConfig) -> Result<Self> {
        let store = Arc::new(SledIntentStore::new(&config.intent_store_path)?);
        let sessions = Arc::new(SessionManager::new(config.session_ttl_secs));
        let coordinator = Arc::new(ProtectedActionCoordinator::new(
            store,
            sessions.clone(),
        ));

        info!(
            "Protected action service ready (store: {}, session ttl: {}s)",
            config.intent_store_path, config.session_ttl_secs
        );

        Ok(Self {
            config,
            sessions,
            coordinator,
        })
    }

    /// 当前配置
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// 会话管理器
    pub fn sessions(&self) -> Arc<SessionManager> {
        self.sessions.clone()
    }

    /// 协调器
    pub fn coordinator(&self) -> Arc<ProtectedActionCoordinator> {
        self.coordinator.clone()
    }
}
