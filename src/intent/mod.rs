// 意图模块 - 待执行意图模型与单槽位持久化存储

pub mod model;
pub mod store;

pub use model::{IntentKind, PendingIntent};
pub use store::{IntentStore, MemoryIntentStore, SledIntentStore, PENDING_INTENT_KEY};
