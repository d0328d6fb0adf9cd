// 会话模块 - 会话预言机接口与进程内实现

pub mod manager;
pub mod model;

pub use manager::{SessionManager, SessionOracle};
pub use model::{AuthSession, UserProfile, UserRole};
