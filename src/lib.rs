pub mod config;
pub mod coordinator;
pub mod error;
pub mod intent;
pub mod logging;
pub mod service;
pub mod session;

pub use config::ServiceConfig;
pub use coordinator::{
    AttemptOutcome, CoordinatorState, DrainOutcome, ProtectedActionCoordinator,
};
pub use error::{Result, ServiceError};
pub use intent::{IntentKind, IntentStore, MemoryIntentStore, PendingIntent, SledIntentStore};
pub use service::ProtectedActionService;
pub use session::{AuthSession, SessionManager, SessionOracle, UserProfile, UserRole};
