//! cartpos core - session and authorization lifecycle for the food-cart POS
//!
//! This crate implements the core logic following hexagonal architecture:
//!
//! - **domain**: Session user, admin records, state machine vocabulary, errors
//! - **ports**: Trait definitions for external dependencies (IdentityProvider, BackendApi, LocalStore)
//! - **services**: Session manager, status poller, admin service, event log
//! - **adapters**: Concrete implementations (Firebase REST, reqwest backend client, DuckDB)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Result};

use adapters::backend_http::HttpBackendClient;
use adapters::duckdb_store::DuckDbStore;
use adapters::firebase::{FirebaseConfig, FirebasePhoneAuth};
use config::Config;
use ports::{BackendApi, IdentityProvider, LocalStore};
use services::*;

// Re-export commonly used types at crate root
pub use domain::{
    AdminUser, AdminUserUpdate, Alert, SessionNotice, SessionState, SessionUser, StatusOutcome,
    VerificationHandle,
};
pub use domain::result::{Error, OperationResult};

/// File name of the local store inside the data directory
pub const STORE_DB_FILE: &str = "cartpos.duckdb";

/// Main context for cartpos operations
///
/// Built once at startup and handed to every consumer. Authentication state
/// is only ever changed through `session`.
pub struct CartContext {
    pub config: Config,
    pub session: Arc<SessionManager>,
    pub admin: AdminService,
    pub backend: Arc<dyn BackendApi>,
    pub logger: Option<Arc<LoggingService>>,
}

impl CartContext {
    /// Wire up the production adapters from `data_dir`
    pub fn new(data_dir: &Path, entry_point: EntryPoint) -> Result<Self> {
        let config = Config::load(data_dir)?;
        std::fs::create_dir_all(data_dir)?;

        let store: Arc<dyn LocalStore> = Arc::new(DuckDbStore::open(&data_dir.join(STORE_DB_FILE))?);

        let api_key = config.firebase_api_key.clone().ok_or_else(|| {
            anyhow!(
                "Firebase API key is not configured. Set auth.firebaseApiKey or {}",
                config::ENV_FIREBASE_API_KEY
            )
        })?;
        let identity: Arc<dyn IdentityProvider> = Arc::new(FirebasePhoneAuth::new(
            FirebaseConfig {
                api_key,
                identity_toolkit_url: config.identity_toolkit_url.clone(),
                secure_token_url: config.secure_token_url.clone(),
                recaptcha_token: config.recaptcha_token.clone(),
                timeout: config.http_timeout,
            },
            Arc::clone(&store),
        )?);

        let backend: Arc<dyn BackendApi> =
            Arc::new(HttpBackendClient::new(&config.backend_url, config.http_timeout)?);

        // The event log is best effort; a locked or broken logs.duckdb must not block sign-in
        let logger = match LoggingService::new(data_dir, entry_point, env!("CARGO_PKG_VERSION")) {
            Ok(logger) => Some(Arc::new(logger)),
            Err(e) => {
                tracing::warn!(error = %e, "event log unavailable");
                None
            }
        };

        Self::with_parts(config, identity, backend, store, logger)
    }

    /// Assemble a context from already-built adapters
    pub fn with_parts(
        config: Config,
        identity: Arc<dyn IdentityProvider>,
        backend: Arc<dyn BackendApi>,
        store: Arc<dyn LocalStore>,
        logger: Option<Arc<LoggingService>>,
    ) -> Result<Self> {
        let mut manager = SessionManager::new(identity, Arc::clone(&backend), store)
            .with_retry(config.retry)
            .with_country_code(config.country_code.clone())?;
        if let Some(logger) = &logger {
            manager = manager.with_logger(Arc::clone(logger));
        }

        let session = Arc::new(manager);
        let admin = AdminService::new(Arc::clone(&session), Arc::clone(&backend));

        Ok(Self {
            config,
            session,
            admin,
            backend,
            logger,
        })
    }

    /// Poller wired to this context's session and configured interval
    pub fn poller(&self) -> StatusPoller {
        StatusPoller::new(Arc::clone(&self.session), self.config.poll_interval)
    }
}
