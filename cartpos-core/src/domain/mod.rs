//! Core domain entities
//!
//! Pure data structures with validation logic - no I/O or external dependencies.

mod admin_user;
pub mod result;
mod session;
mod user;
pub mod verification;

pub use admin_user::{AdminUser, AdminUserUpdate};
pub use result::{Alert, Error, OperationResult, Result};
pub use session::{SessionNotice, SessionState, StatusOutcome};
pub use user::SessionUser;
pub use verification::VerificationHandle;
