//! User administration for super-admins

use std::sync::Arc;

use crate::domain::{AdminUser, AdminUserUpdate, Error, Result, SessionUser};
use crate::ports::BackendApi;
use crate::services::session::SessionManager;

/// Lists, searches and edits registered users
///
/// Every call first checks the cached session user locally; non-admins are
/// turned away without touching the network.
pub struct AdminService {
    session: Arc<SessionManager>,
    backend: Arc<dyn BackendApi>,
}

impl AdminService {
    pub fn new(session: Arc<SessionManager>, backend: Arc<dyn BackendApi>) -> Self {
        Self { session, backend }
    }

    async fn authorize(&self) -> Result<(SessionUser, String)> {
        let user = self
            .session
            .current_user()
            .await?
            .ok_or(Error::NotAuthenticated)?;
        if !user.is_super_admin {
            return Err(Error::Forbidden("Access denied".to_string()));
        }
        let token = self.session.id_token().await?;
        Ok((user, token))
    }

    pub async fn list_users(&self) -> Result<Vec<AdminUser>> {
        let (_, token) = self.authorize().await?;
        self.backend.list_users(&token).await
    }

    /// Users whose phone number contains `query`
    pub async fn search_users(&self, query: &str) -> Result<Vec<AdminUser>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::validation("Enter a phone number to search"));
        }
        let (_, token) = self.authorize().await?;
        self.backend.search_users(&token, query).await
    }

    pub async fn update_user(&self, phone_number: &str, update: &AdminUserUpdate) -> Result<()> {
        if update.name.trim().is_empty() {
            return Err(Error::validation("Name cannot be empty"));
        }
        let (caller, token) = self.authorize().await?;
        if caller.phone_number == phone_number {
            return Err(Error::validation("You cannot edit your own account"));
        }

        self.backend.update_user(&token, phone_number, update).await?;
        tracing::info!(active = update.is_active, "user record updated");
        Ok(())
    }
}
