//! Session state machine vocabulary

use serde::Serialize;

use super::user::SessionUser;

/// Where the session manager currently believes the user stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Before the first check at startup
    Unknown,
    Unauthenticated,
    Authenticated,
    /// Deactivation detected; the manager settles in `Unauthenticated` right after
    Deactivated,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Unknown => "unknown",
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticated => "authenticated",
            SessionState::Deactivated => "deactivated",
        }
    }
}

/// User-facing events the presentation layer reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionNotice {
    /// The account was disabled by an administrator; show the notice and go to login
    AccountDeactivated { message: String },
    /// The session ended; go to the login entry point
    SignedOut,
}

/// What a status check did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusOutcome {
    /// No principal is signed in, nothing to check
    Skipped,
    /// Fresh record applied to the cache
    Refreshed(SessionUser),
    /// Account was deactivated and the session ended
    Deactivated,
    /// Check failed transiently; state left unchanged
    Unavailable(String),
    /// Session changed while the check was in flight; result discarded
    Stale,
}
