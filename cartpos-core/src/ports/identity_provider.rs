//! Identity provider port - phone number verification

use async_trait::async_trait;

use crate::domain::Result;

/// The signed-in identity as the provider knows it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub phone_number: String,
}

/// Third-party phone verification flow
///
/// Implementations keep their own signed-in state, the way mobile auth SDKs
/// do, so that `current_principal` survives application restarts.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Send an OTP to `phone_number` (E.164); returns the opaque verification id
    async fn send_verification_code(&self, phone_number: &str) -> Result<String>;

    /// Exchange the verification id and OTP for a signed-in principal
    async fn confirm_code(&self, verification_id: &str, code: &str) -> Result<Principal>;

    /// Currently signed-in principal, if any
    async fn current_principal(&self) -> Result<Option<Principal>>;

    /// Short-lived bearer token for the signed-in principal, refreshed as needed
    async fn id_token(&self) -> Result<String>;

    /// End the provider session
    async fn sign_out(&self) -> Result<()>;
}
