//! Backend API port - authorization records and user administration

use async_trait::async_trait;

use crate::domain::{AdminUser, AdminUserUpdate, Result, SessionUser};

/// Companion backend that turns identity tokens into application users
#[async_trait]
pub trait BackendApi: Send + Sync {
    /// `GET /api/health`
    async fn health(&self) -> Result<()>;

    /// `POST /api/auth/verify-token`
    ///
    /// Returns `Error::AccountDeactivated` when the backend denies the account
    /// (HTTP 403) and `Error::AuthenticationFailed` when it answers without a
    /// user record.
    async fn verify_token(&self, id_token: &str) -> Result<SessionUser>;

    /// `PUT /api/users/profile`
    async fn update_profile(&self, id_token: &str, name: &str) -> Result<()>;

    /// `GET /api/admin/users`
    async fn list_users(&self, id_token: &str) -> Result<Vec<AdminUser>>;

    /// `GET /api/admin/users/search?query=`
    async fn search_users(&self, id_token: &str, query: &str) -> Result<Vec<AdminUser>>;

    /// `PUT /api/admin/users/{phoneNumber}`
    async fn update_user(
        &self,
        id_token: &str,
        phone_number: &str,
        update: &AdminUserUpdate,
    ) -> Result<()>;
}
