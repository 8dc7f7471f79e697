//! Session manager - the authoritative "who is signed in" state machine
//!
//! Reconciles three sources of truth: the identity provider's signed-in
//! principal, the backend's authorization record and the cached
//! [`SessionUser`] in the local store.
//!
//! ```text
//! Unknown ──initialize──▶ Authenticated ──check (inactive / 403)──▶ Deactivated ──▶ Unauthenticated
//!    │                        ▲      │                                                  │
//!    └──no principal──────────┼──────┴──logout─────────────────────────────────────────▶│
//!                             └──────────────confirm_code───────────────────────────────┘
//! ```
//!
//! Transient failures during a status check never end a session; only an
//! authoritative denial from the backend does.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, watch, Mutex};

use crate::domain::verification::{to_e164, validate_country_code, validate_local_phone, validate_otp_code};
use crate::domain::{
    Error, Result, SessionNotice, SessionState, SessionUser, StatusOutcome, VerificationHandle,
};
use crate::ports::{keys, read_json, write_json, BackendApi, IdentityProvider, LocalStore};
use crate::services::logging::{LogEvent, LoggingService};
use crate::services::retry::RetryPolicy;

/// Shown when the backend disables an account without saying more
pub const DEACTIVATED_MESSAGE: &str = "Your account has been deactivated. Please contact support.";

/// Default country calling code prefixed to local numbers
pub const DEFAULT_COUNTRY_CODE: &str = "+91";

const NOTICE_CAPACITY: usize = 16;

pub struct SessionManager {
    identity: Arc<dyn IdentityProvider>,
    backend: Arc<dyn BackendApi>,
    store: Arc<dyn LocalStore>,
    logger: Option<Arc<LoggingService>>,
    retry: RetryPolicy,
    country_code: String,
    state: watch::Sender<SessionState>,
    notices: broadcast::Sender<SessionNotice>,
    // Bumped by login (accepted or rejected), logout and deactivation; checks
    // started under an older generation drop their result
    generation: AtomicU64,
    apply_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(
        identity: Arc<dyn IdentityProvider>,
        backend: Arc<dyn BackendApi>,
        store: Arc<dyn LocalStore>,
    ) -> Self {
        let (state, _) = watch::channel(SessionState::Unknown);
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);

        Self {
            identity,
            backend,
            store,
            logger: None,
            retry: RetryPolicy::default(),
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            state,
            notices,
            generation: AtomicU64::new(0),
            apply_lock: Mutex::new(()),
        }
    }

    /// Append lifecycle events to the event log
    pub fn with_logger(mut self, logger: Arc<LoggingService>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_country_code(mut self, country_code: impl Into<String>) -> Result<Self> {
        let country_code = country_code.into();
        validate_country_code(&country_code)?;
        self.country_code = country_code;
        Ok(self)
    }

    // =========================================================================
    // Observers
    // =========================================================================

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver that sees every state transition
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Receiver for user-facing notices (deactivation, sign-out)
    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    /// Cached session user, if any
    pub async fn current_user(&self) -> Result<Option<SessionUser>> {
        read_json(self.store.as_ref(), keys::SESSION_USER).await
    }

    /// Bearer token for the signed-in principal
    pub async fn id_token(&self) -> Result<String> {
        self.identity.id_token().await
    }

    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Resolve the `Unknown` startup state
    pub async fn initialize(&self) -> Result<SessionState> {
        let principal = match self.identity.current_principal().await {
            Ok(p) => p,
            Err(e) => {
                self.set_state(SessionState::Unauthenticated);
                return Err(e);
            }
        };

        let Some(principal) = principal else {
            // A cache without a provider session is stale
            if let Err(e) = self.store.remove(keys::SESSION_USER).await {
                tracing::warn!(error = %e, "failed to clear stale session cache");
            }
            self.set_state(SessionState::Unauthenticated);
            return Ok(self.state());
        };

        let cached = match self.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, "unreadable session cache, discarding");
                None
            }
        };

        if cached.is_none() {
            // Provider session without a verified user: never finished login
            tracing::info!("signed-in principal has no cached user, signing out");
            self.end_provider_session().await;
            self.set_state(SessionState::Unauthenticated);
            return Ok(self.state());
        }

        match self.check_status().await {
            StatusOutcome::Skipped | StatusOutcome::Unavailable(_) => {
                self.set_state(SessionState::Authenticated);
            }
            StatusOutcome::Refreshed(_) | StatusOutcome::Deactivated | StatusOutcome::Stale => {}
        }

        tracing::debug!(uid = %principal.uid, state = self.state().as_str(), "session initialized");
        Ok(self.state())
    }

    /// Send an OTP to a local (10-digit) phone number
    pub async fn request_code(&self, phone_number: &str) -> Result<VerificationHandle> {
        validate_local_phone(phone_number)?;
        let e164 = to_e164(&self.country_code, phone_number);

        match self.identity.send_verification_code(&e164).await {
            Ok(verification_id) => {
                self.record(LogEvent::new("verification_requested").with_subject(&e164));
                Ok(VerificationHandle::new(verification_id, e164))
            }
            Err(e) => {
                self.record(
                    LogEvent::new("verification_request_failed")
                        .with_subject(&e164)
                        .with_error(e.to_string()),
                );
                Err(e)
            }
        }
    }

    /// Exchange an OTP for a backend-verified session
    ///
    /// The handle is only borrowed, so the caller can retry with another code
    /// after a provider failure.
    pub async fn confirm_code(&self, handle: &VerificationHandle, code: &str) -> Result<SessionUser> {
        validate_otp_code(code)?;

        let principal = self
            .identity
            .confirm_code(handle.verification_id(), code)
            .await?;

        let verified = match self.identity.id_token().await {
            Ok(token) => self.backend.verify_token(&token).await,
            Err(e) => Err(e),
        };

        let user = match verified {
            Ok(user) if user.is_permitted() => user,
            Ok(_) => {
                let error = Error::AccountDeactivated(DEACTIVATED_MESSAGE.to_string());
                self.reject_login(handle, &error).await;
                return Err(error);
            }
            Err(e) => {
                let error = match e {
                    Error::AccountDeactivated(_) | Error::AuthenticationFailed(_) => e,
                    other => Error::AuthenticationFailed(other.alert().message),
                };
                self.reject_login(handle, &error).await;
                return Err(error);
            }
        };

        let _guard = self.apply_lock.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        write_json(self.store.as_ref(), keys::SESSION_USER, &user).await?;
        self.set_state(SessionState::Authenticated);

        tracing::info!(uid = %principal.uid, super_admin = user.is_super_admin, "signed in");
        self.record(LogEvent::new("login_succeeded").with_subject(&user.phone_number));
        Ok(user)
    }

    /// Re-fetch the authorization record and apply it
    ///
    /// Never fails: transient problems are logged and reported as
    /// [`StatusOutcome::Unavailable`] with the session left as it was.
    pub async fn check_status(&self) -> StatusOutcome {
        let generation = self.generation.load(Ordering::SeqCst);

        match self.identity.current_principal().await {
            Ok(Some(_)) => {}
            Ok(None) => return StatusOutcome::Skipped,
            Err(e) => {
                tracing::warn!(error = %e, "could not read identity state");
                return StatusOutcome::Unavailable(e.to_string());
            }
        }

        let fetched = self
            .retry
            .run("status check", || self.fetch_record())
            .await;

        let _guard = self.apply_lock.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("session changed during status check, discarding result");
            return StatusOutcome::Stale;
        }

        match fetched {
            Ok(user) if user.is_permitted() => {
                if let Err(e) = write_json(self.store.as_ref(), keys::SESSION_USER, &user).await {
                    tracing::warn!(error = %e, "failed to cache refreshed user");
                    return StatusOutcome::Unavailable(e.to_string());
                }
                self.set_state(SessionState::Authenticated);
                StatusOutcome::Refreshed(user)
            }
            Ok(user) => {
                self.force_deactivation(DEACTIVATED_MESSAGE.to_string(), &user.phone_number)
                    .await;
                StatusOutcome::Deactivated
            }
            Err(Error::AccountDeactivated(message)) => {
                let subject = self.current_user().await.ok().flatten().map(|u| u.phone_number);
                self.force_deactivation(message, subject.as_deref().unwrap_or_default())
                    .await;
                StatusOutcome::Deactivated
            }
            Err(e) => {
                tracing::warn!(error = %e, "status check failed, keeping session");
                self.record(LogEvent::new("status_check_failed").with_error(e.to_string()));
                StatusOutcome::Unavailable(e.alert().message)
            }
        }
    }

    /// End the session unconditionally
    pub async fn logout(&self) {
        let _guard = self.apply_lock.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);

        let subject = self.current_user().await.ok().flatten().map(|u| u.phone_number);
        self.clear_session().await;
        self.set_state(SessionState::Unauthenticated);
        let _ = self.notices.send(SessionNotice::SignedOut);

        let mut event = LogEvent::new("logout");
        if let Some(phone) = subject.as_deref() {
            event = event.with_subject(phone);
        }
        self.record(event);
        tracing::info!("signed out");
    }

    /// Change the signed-in user's display name
    pub async fn update_profile_name(&self, name: &str) -> Result<SessionUser> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::validation("Name cannot be empty"));
        }

        let user = self.current_user().await?.ok_or(Error::NotAuthenticated)?;
        let generation = self.generation.load(Ordering::SeqCst);
        let token = self.identity.id_token().await?;
        self.backend.update_profile(&token, name).await?;

        let _guard = self.apply_lock.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return Err(Error::NotAuthenticated);
        }
        let updated = SessionUser {
            name: name.to_string(),
            ..user
        };
        write_json(self.store.as_ref(), keys::SESSION_USER, &updated).await?;
        self.record(LogEvent::new("profile_updated").with_subject(&updated.phone_number));
        Ok(updated)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    async fn fetch_record(&self) -> Result<SessionUser> {
        let token = self.identity.id_token().await?;
        self.backend.verify_token(&token).await
    }

    /// Sign out after an authoritative denial; caller holds the apply lock
    async fn force_deactivation(&self, message: String, phone_number: &str) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.clear_session().await;

        self.set_state(SessionState::Deactivated);
        let _ = self.notices.send(SessionNotice::AccountDeactivated {
            message: message.clone(),
        });
        self.set_state(SessionState::Unauthenticated);

        tracing::warn!("account deactivated, session ended");
        let mut event = LogEvent::new("account_deactivated").with_error(message);
        if !phone_number.is_empty() {
            event = event.with_subject(phone_number);
        }
        self.record(event);
    }

    /// End whatever session existed before the failed login; the provider
    /// principal is gone, so checks already in flight must not write
    async fn reject_login(&self, handle: &VerificationHandle, error: &Error) {
        let _guard = self.apply_lock.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.clear_session().await;
        self.set_state(SessionState::Unauthenticated);
        self.record(
            LogEvent::new("login_rejected")
                .with_subject(handle.phone_number())
                .with_error(error.to_string()),
        );
    }

    async fn clear_session(&self) {
        self.end_provider_session().await;
        if let Err(e) = self.store.remove(keys::SESSION_USER).await {
            tracing::warn!(error = %e, "failed to clear session cache");
        }
    }

    async fn end_provider_session(&self) {
        if let Err(e) = self.identity.sign_out().await {
            tracing::warn!(error = %e, "identity provider sign-out failed");
        }
    }

    fn set_state(&self, next: SessionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
        if changed {
            tracing::debug!(state = next.as_str(), "session state changed");
        }
    }

    fn record(&self, event: LogEvent) {
        if let Some(logger) = &self.logger {
            if let Err(e) = logger.log(event) {
                tracing::debug!(error = %e, "failed to write event log");
            }
        }
    }
}
