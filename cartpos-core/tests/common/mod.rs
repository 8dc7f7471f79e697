//! Trait-level fakes shared by the integration tests
//!
//! The identity provider and backend are scripted in memory; stores are the
//! real adapters wrapped to count writes.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use cartpos_core::adapters::memory_store::MemoryStore;
use cartpos_core::domain::Result;
use cartpos_core::ports::{BackendApi, IdentityProvider, LocalStore, Principal};
use cartpos_core::services::{RetryPolicy, SessionManager};
use cartpos_core::{AdminUser, AdminUserUpdate, Error, SessionUser};

pub const ASHA_PHONE: &str = "+919876543210";
pub const VALID_CODE: &str = "123456";

pub fn asha() -> SessionUser {
    SessionUser::new(ASHA_PHONE, "Asha")
}

// ============================================================================
// Identity provider
// ============================================================================

#[derive(Default)]
pub struct FakeIdentity {
    principal: Mutex<Option<Principal>>,
    pending: Mutex<HashMap<String, String>>,
    pub sends: AtomicUsize,
    pub confirms: AtomicUsize,
    pub sign_outs: AtomicUsize,
}

impl FakeIdentity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start as if a previous run left `phone_number` signed in
    pub fn signed_in(phone_number: &str) -> Self {
        let identity = Self::default();
        *identity.principal.lock().unwrap() = Some(Principal {
            uid: "uid-1".to_string(),
            phone_number: phone_number.to_string(),
        });
        identity
    }

    pub fn is_signed_in(&self) -> bool {
        self.principal.lock().unwrap().is_some()
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn send_verification_code(&self, phone_number: &str) -> Result<String> {
        let n = self.sends.fetch_add(1, Ordering::SeqCst) + 1;
        let id = format!("H{}", n);
        self.pending
            .lock()
            .unwrap()
            .insert(id.clone(), phone_number.to_string());
        Ok(id)
    }

    async fn confirm_code(&self, verification_id: &str, code: &str) -> Result<Principal> {
        self.confirms.fetch_add(1, Ordering::SeqCst);
        let phone_number = self
            .pending
            .lock()
            .unwrap()
            .get(verification_id)
            .cloned()
            .ok_or_else(|| Error::identity("Verification session is invalid. Please request a new code"))?;
        if code != VALID_CODE {
            return Err(Error::identity("The verification code is incorrect"));
        }

        let principal = Principal {
            uid: "uid-1".to_string(),
            phone_number,
        };
        *self.principal.lock().unwrap() = Some(principal.clone());
        Ok(principal)
    }

    async fn current_principal(&self) -> Result<Option<Principal>> {
        Ok(self.principal.lock().unwrap().clone())
    }

    async fn id_token(&self) -> Result<String> {
        match &*self.principal.lock().unwrap() {
            Some(p) => Ok(format!("token-{}", p.uid)),
            None => Err(Error::NotAuthenticated),
        }
    }

    async fn sign_out(&self) -> Result<()> {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
        *self.principal.lock().unwrap() = None;
        Ok(())
    }
}

// ============================================================================
// Backend
// ============================================================================

/// What `verify-token` answers
#[derive(Debug, Clone)]
pub enum Reply {
    User(SessionUser),
    /// HTTP 403
    Deny,
    /// HTTP 503
    Unavailable,
    /// Connection refused
    Offline,
}

pub struct ScriptedBackend {
    queued: Mutex<VecDeque<Reply>>,
    default: Mutex<Reply>,
    pub verify_calls: AtomicUsize,
    pub admin_calls: AtomicUsize,
    pub updates: Mutex<Vec<(String, AdminUserUpdate)>>,
    pub profile_names: Mutex<Vec<String>>,
    users: Vec<AdminUser>,
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl ScriptedBackend {
    pub fn new(default: Reply) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            default: Mutex::new(default),
            verify_calls: AtomicUsize::new(0),
            admin_calls: AtomicUsize::new(0),
            updates: Mutex::new(Vec::new()),
            profile_names: Mutex::new(Vec::new()),
            users: vec![
                AdminUser {
                    phone_number: ASHA_PHONE.to_string(),
                    name: "Asha".to_string(),
                    is_active: true,
                    created_at: None,
                    last_login: None,
                },
                AdminUser {
                    phone_number: "+919811111111".to_string(),
                    name: "Ravi".to_string(),
                    is_active: false,
                    created_at: None,
                    last_login: None,
                },
            ],
            gate: Mutex::new(None),
        }
    }

    /// Replace the standing reply
    pub fn reply_with(&self, reply: Reply) {
        *self.default.lock().unwrap() = reply;
    }

    /// Answer the next call with `reply`, then fall back to the standing one
    pub fn queue(&self, reply: Reply) {
        self.queued.lock().unwrap().push_back(reply);
    }

    /// Hold the next verify call until `release` is notified; `entered` fires
    /// once the call is waiting
    pub fn hold_next(&self) -> (Arc<Notify>, Arc<Notify>) {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some((Arc::clone(&entered), Arc::clone(&release)));
        (entered, release)
    }

    pub fn verify_count(&self) -> usize {
        self.verify_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendApi for ScriptedBackend {
    async fn health(&self) -> Result<()> {
        Ok(())
    }

    async fn verify_token(&self, id_token: &str) -> Result<SessionUser> {
        assert!(id_token.starts_with("token-"), "unexpected token {}", id_token);
        self.verify_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.gate.lock().unwrap().take();
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }

        let reply = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.lock().unwrap().clone());

        match reply {
            Reply::User(user) => Ok(user),
            Reply::Deny => Err(Error::AccountDeactivated(
                "Your account has been deactivated. Please contact support.".to_string(),
            )),
            Reply::Unavailable => Err(Error::Backend {
                status: 503,
                message: "Service Unavailable".to_string(),
            }),
            Reply::Offline => Err(Error::Network("Unable to reach the server".to_string())),
        }
    }

    async fn update_profile(&self, _id_token: &str, name: &str) -> Result<()> {
        self.profile_names.lock().unwrap().push(name.to_string());
        Ok(())
    }

    async fn list_users(&self, _id_token: &str) -> Result<Vec<AdminUser>> {
        self.admin_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.clone())
    }

    async fn search_users(&self, _id_token: &str, query: &str) -> Result<Vec<AdminUser>> {
        self.admin_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .users
            .iter()
            .filter(|u| u.phone_number.contains(query))
            .cloned()
            .collect())
    }

    async fn update_user(
        &self,
        _id_token: &str,
        phone_number: &str,
        update: &AdminUserUpdate,
    ) -> Result<()> {
        self.admin_calls.fetch_add(1, Ordering::SeqCst);
        self.updates
            .lock()
            .unwrap()
            .push((phone_number.to_string(), update.clone()));
        Ok(())
    }
}

// ============================================================================
// Store
// ============================================================================

/// Counts writes per key on top of any store
pub struct RecordingStore {
    inner: Arc<dyn LocalStore>,
    writes: Mutex<HashMap<String, usize>>,
}

impl RecordingStore {
    pub fn new(inner: Arc<dyn LocalStore>) -> Self {
        Self {
            inner,
            writes: Mutex::new(HashMap::new()),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    pub fn writes(&self, key: &str) -> usize {
        self.writes.lock().unwrap().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl LocalStore for RecordingStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        *self.writes.lock().unwrap().entry(key.to_string()).or_default() += 1;
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.inner.remove(key).await
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub identity: Arc<FakeIdentity>,
    pub backend: Arc<ScriptedBackend>,
    pub store: Arc<RecordingStore>,
    pub manager: Arc<SessionManager>,
}

impl Harness {
    pub fn new(reply: Reply) -> Self {
        Self::with_parts(FakeIdentity::new(), reply, RecordingStore::in_memory())
    }

    pub fn with_parts(identity: FakeIdentity, reply: Reply, store: RecordingStore) -> Self {
        let identity = Arc::new(identity);
        let backend = Arc::new(ScriptedBackend::new(reply));
        let store = Arc::new(store);
        let manager = SessionManager::new(identity.clone(), backend.clone(), store.clone())
            .with_retry(RetryPolicy::none());

        Self {
            identity,
            backend,
            store,
            manager: Arc::new(manager),
        }
    }

    /// Replace the manager, e.g. to attach a logger or retry policy
    pub fn rebuild(&mut self, build: impl FnOnce(SessionManager) -> SessionManager) {
        let manager = SessionManager::new(
            self.identity.clone(),
            self.backend.clone(),
            self.store.clone(),
        );
        self.manager = Arc::new(build(manager));
    }

    /// Run the full OTP flow for Asha's number
    pub async fn sign_in(&self) -> Result<SessionUser> {
        let handle = self.manager.request_code("9876543210").await?;
        self.manager.confirm_code(&handle, VALID_CODE).await
    }
}
