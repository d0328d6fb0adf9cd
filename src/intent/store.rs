use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::ServiceError;
use super::model::PendingIntent;

/// 持久化槽位的键名
///
/// 槽位下存放 JSON 序列化的 `PendingIntent`；键不存在即表示没有待执行意图。
pub const PENDING_INTENT_KEY: &str = "pending_intent";

/// 意图存储 Trait
///
/// 单槽位存储：任何时刻最多保存一个待执行意图，新的 `save` 覆盖旧值
/// （last-writer-wins，不排队）。调用方只通过协调器访问，不直接操作存储。
#[async_trait]
pub trait IntentStore: Send + Sync {
    /// 存储意图，替换已有值
    async fn save(&self, intent: &PendingIntent) -> Result<(), ServiceError>;

    /// 读取意图（非破坏性）
    ///
    /// 槽位为空返回 `None`；反序列化失败时清空槽位并返回 `None`，
    /// 避免损坏的数据反复触发失败。
    async fn load(&self) -> Result<Option<PendingIntent>, ServiceError>;

    /// 无条件清空槽位
    async fn clear(&self) -> Result<(), ServiceError>;
}

/// 内存意图存储（用于测试和同会话流程）
pub struct MemoryIntentStore {
    slot: RwLock<Option<PendingIntent>>,
}

impl MemoryIntentStore {
    pub fn new() -> Self {
        Self {
            slot: RwLock::new(None),
        }
    }
}

impl Default for MemoryIntentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IntentStore for MemoryIntentStore {
    async fn save(&self, intent: &PendingIntent) -> Result<(), ServiceError> {
        let mut slot = self.slot.write();
        *slot = Some(intent.clone());

        debug!("Stored pending intent: {}", intent.kind);
        Ok(())
    }

    async fn load(&self) -> Result<Option<PendingIntent>, ServiceError> {
        Ok(self.slot.read().clone())
    }

    async fn clear(&self) -> Result<(), ServiceError> {
        let mut slot = self.slot.write();
        if slot.take().is_some() {
            debug!("Cleared pending intent slot");
        }
        Ok(())
    }
}

/// Sled 数据库意图存储
///
/// 持久化实现，进程重启后意图仍然可读，覆盖带重定向跳转的登录流程。
pub struct SledIntentStore {
    /// Sled 数据库实例
    db: sled::Db,
    /// 数据库路径
    path: String,
}

impl SledIntentStore {
    /// 打开指定路径下的意图存储
    pub fn new(path: &str) -> Result<Self, ServiceError> {
        let db = sled::open(path)
            .map_err(|e| ServiceError::Storage(format!("Failed to open sled database: {}", e)))?;

        info!("Opened intent store at: {}", path);

        Ok(Self {
            db,
            path: path.to_string(),
        })
    }

    /// 存储路径
    pub fn path(&self) -> &str {
        &self.path
    }
}

#[async_trait]
impl IntentStore for SledIntentStore {
    async fn save(&self, intent: &PendingIntent) -> Result<(), ServiceError> {
        let value = serde_json::to_vec(intent)
            .map_err(|e| ServiceError::Serialization(format!("Failed to serialize intent: {}", e)))?;

        self.db
            .insert(PENDING_INTENT_KEY, value)
            .map_err(|e| ServiceError::Storage(format!("Failed to store intent: {}", e)))?;
        self.db
            .flush_async()
            .await
            .map_err(|e| ServiceError::Storage(format!("Failed to flush intent store: {}", e)))?;

        debug!("Persisted pending intent: {}", intent.kind);
        Ok(())
    }

    async fn load(&self) -> Result<Option<PendingIntent>, ServiceError> {
        let bytes = match self
            .db
            .get(PENDING_INTENT_KEY)
            .map_err(|e| ServiceError::Storage(format!("Failed to read intent slot: {}", e)))?
        {
            Some(bytes) => bytes,
            None => return Ok(None),
        };

        match serde_json::from_slice::<PendingIntent>(&bytes) {
            Ok(intent) => Ok(Some(intent)),
            Err(e) => {
                // 槽位损坏：静默丢弃，当作没有待执行意图
                warn!("Dropping corrupt pending intent slot: {}", e);
                self.clear().await?;
                Ok(None)
            }
        }
    }

    async fn clear(&self) -> Result<(), ServiceError> {
        let removed = self
            .db
            .remove(PENDING_INTENT_KEY)
            .map_err(|e| ServiceError::Storage(format!("Failed to clear intent slot: {}", e)))?
            .is_some();
        self.db
            .flush_async()
            .await
            .map_err(|e| ServiceError::Storage(format!("Failed to flush intent store: {}", e)))?;

        if removed {
            debug!("Cleared persisted intent slot");
        }
        Ok(())
    }
}
