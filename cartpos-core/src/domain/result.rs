//! Result and error types for the core library

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Core library error type
///
/// Every network, provider and storage failure is converted into one of these
/// variants at the adapter boundary. The session manager then decides whether
/// a failure is swallowed (transient) or surfaced as an [`Alert`].
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    /// Identity provider rejected the request (bad code, expired handle, ...)
    #[error("Verification failed: {0}")]
    Identity(String),

    /// Backend answered with an authorization denial for this account
    #[error("Account deactivated: {0}")]
    AccountDeactivated(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an identity provider error
    pub fn identity(msg: impl Into<String>) -> Self {
        Self::Identity(msg.into())
    }

    /// Create a storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// True when the backend has authoritatively denied this account.
    ///
    /// Only this class of failure may end a session during a status check.
    pub fn is_authorization_denied(&self) -> bool {
        matches!(self, Self::AccountDeactivated(_))
    }

    /// True for failures worth retrying: connectivity, 5xx and rate limiting
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Backend { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Convert into the alert shown to the user
    pub fn alert(&self) -> Alert {
        let title = match self {
            Self::AccountDeactivated(_) => "Account Deactivated",
            Self::Validation(_) => "Invalid Input",
            Self::Identity(_) => "Verification Failed",
            Self::AuthenticationFailed(_) | Self::NotAuthenticated => "Authentication Failed",
            Self::Forbidden(_) => "Access Denied",
            Self::Network(_) => "Connection Problem",
            _ => "Error",
        };

        let message = match self {
            Self::AccountDeactivated(msg)
            | Self::Validation(msg)
            | Self::Identity(msg)
            | Self::AuthenticationFailed(msg)
            | Self::Forbidden(msg) => msg.clone(),
            Self::NotAuthenticated => "Please sign in again.".to_string(),
            other => other.to_string(),
        };

        Alert { title, message }
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// User-facing alert derived from an [`Error`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Alert {
    pub title: &'static str,
    pub message: String,
}

/// Operation result with optional context (for JSON output)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub context: Option<HashMap<String, serde_json::Value>>,
}

impl<T> OperationResult<T> {
    /// Create a successful result
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            context: None,
        }
    }

    /// Create a failed result
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            context: None,
        }
    }

    /// Attach a context entry
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value);
        self
    }
}

impl<T> From<Result<T>> for OperationResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => Self::ok(data),
            Err(e) => {
                let alert = e.alert();
                Self::fail(alert.message).with_context("title", serde_json::json!(alert.title))
            }
        }
    }
}
