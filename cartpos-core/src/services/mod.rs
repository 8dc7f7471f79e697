//! Service layer - session lifecycle orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

mod admin;
pub mod logging;
pub mod migration;
pub mod poller;
pub mod retry;
pub mod session;

pub use admin::AdminService;
pub use logging::{EntryPoint, LogEntry, LogEvent, LoggingService};
pub use migration::{MigrationResult, MigrationService};
pub use poller::{AppLifecycle, PollerHandle, StatusPoller, DEFAULT_POLL_INTERVAL};
pub use retry::RetryPolicy;
pub use session::{SessionManager, DEFAULT_COUNTRY_CODE, DEACTIVATED_MESSAGE};
