//! Firebase phone authentication over the Identity Toolkit REST API
//!
//! Flow:
//! 1. `accounts:sendVerificationCode` sends the SMS and returns `sessionInfo`
//! 2. `accounts:signInWithPhoneNumber` trades `sessionInfo` + code for tokens
//! 3. `securetoken.googleapis.com/v1/token` refreshes the ID token
//!
//! The resulting credential is persisted in the local store so the principal
//! stays signed in across restarts. Both base URLs are configurable, which
//! lets tests and the Firebase Auth emulator stand in for Google's servers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use url::Url;

use crate::domain::{Error, Result};
use crate::ports::{keys, read_json, write_json, IdentityProvider, LocalStore, Principal};

/// Production Identity Toolkit endpoint
pub const IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";

/// Production Secure Token endpoint
pub const SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com";

/// ID tokens this close to expiry are refreshed before use
const REFRESH_MARGIN_SECS: i64 = 300;

/// Firebase connection settings
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub identity_toolkit_url: String,
    pub secure_token_url: String,
    /// Required by production Firebase unless the project uses test numbers
    pub recaptcha_token: Option<String>,
    pub timeout: Duration,
}

impl FirebaseConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            identity_toolkit_url: IDENTITY_TOOLKIT_URL.to_string(),
            secure_token_url: SECURE_TOKEN_URL.to_string(),
            recaptcha_token: None,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Signed-in credential as persisted under `keys::IDENTITY_SESSION`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCredential {
    pub uid: String,
    pub phone_number: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredCredential {
    fn principal(&self) -> Principal {
        Principal {
            uid: self.uid.clone(),
            phone_number: self.phone_number.clone(),
        }
    }

    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now <= chrono::Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

// =============================================================================
// API Models
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeRequest<'a> {
    phone_number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    recaptcha_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeResponse {
    session_info: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SignInRequest<'a> {
    session_info: &'a str,
    code: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
    local_id: String,
    #[serde(default)]
    phone_number: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

fn expiry_from(expires_in: Option<&str>, now: DateTime<Utc>) -> DateTime<Utc> {
    let secs = expires_in.and_then(|s| s.parse::<i64>().ok()).unwrap_or(3600);
    now + chrono::Duration::seconds(secs)
}

/// Turn Firebase error codes into messages fit for the login screen
fn friendly_message(code: &str) -> String {
    // Codes may carry a suffix, e.g. "TOO_MANY_ATTEMPTS_TRY_LATER : Too many..."
    let code = code.split([' ', ':']).next().unwrap_or(code);
    match code {
        "INVALID_CODE" => "The verification code is incorrect".to_string(),
        "SESSION_EXPIRED" | "CODE_EXPIRED" => {
            "The verification code has expired. Please request a new one".to_string()
        }
        "INVALID_SESSION_INFO" | "MISSING_SESSION_INFO" => {
            "Verification session is invalid. Please request a new code".to_string()
        }
        "INVALID_PHONE_NUMBER" | "MISSING_PHONE_NUMBER" => {
            "The phone number is not valid".to_string()
        }
        "TOO_MANY_ATTEMPTS_TRY_LATER" => "Too many attempts. Please try again later".to_string(),
        "QUOTA_EXCEEDED" => "SMS quota exceeded. Please try again later".to_string(),
        "MISSING_RECAPTCHA_TOKEN" | "INVALID_RECAPTCHA_TOKEN" | "CAPTCHA_CHECK_FAILED" => {
            "App verification failed".to_string()
        }
        "TOKEN_EXPIRED" | "USER_DISABLED" | "USER_NOT_FOUND" | "INVALID_REFRESH_TOKEN" => {
            "Your sign-in session has expired. Please sign in again".to_string()
        }
        "" => "Verification failed".to_string(),
        other => other.to_string(),
    }
}

// =============================================================================
// Firebase client
// =============================================================================

/// [`IdentityProvider`] backed by Firebase phone auth
pub struct FirebasePhoneAuth {
    client: Client,
    config: FirebaseConfig,
    store: Arc<dyn LocalStore>,
    // Serializes token refreshes so concurrent callers don't race on the refresh token
    refresh_lock: Mutex<()>,
}

impl FirebasePhoneAuth {
    pub fn new(config: FirebaseConfig, store: Arc<dyn LocalStore>) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("Firebase API key cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            store,
            refresh_lock: Mutex::new(()),
        })
    }

    fn url(&self, base: &str, path: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), path))
            .map_err(|e| Error::Config(format!("Invalid identity provider URL: {}", e)))?;
        url.query_pairs_mut().append_pair("key", &self.config.api_key);
        Ok(url)
    }

    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Network(format!(
                "Verification service timed out after {} seconds",
                self.config.timeout.as_secs()
            ))
        } else if error.is_connect() {
            Error::Network("Unable to reach the verification service".to_string())
        } else {
            Error::Network(format!("Verification request failed: {}", error))
        }
    }

    async fn parse<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        let code = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|e| e.error.message)
            .unwrap_or_default();

        if status.is_server_error() {
            return Err(Error::Backend {
                status: status.as_u16(),
                message: friendly_message(&code),
            });
        }
        Err(Error::identity(friendly_message(&code)))
    }

    async fn load_credential(&self) -> Result<Option<StoredCredential>> {
        read_json(self.store.as_ref(), keys::IDENTITY_SESSION).await
    }

    async fn refresh(&self, credential: &StoredCredential) -> Result<StoredCredential> {
        let url = self.url(&self.config.secure_token_url, "/v1/token")?;
        let response = self
            .client
            .post(url)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", credential.refresh_token.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let refreshed: RefreshResponse = self.parse(response).await?;
        let updated = StoredCredential {
            id_token: refreshed.id_token,
            refresh_token: refreshed.refresh_token,
            expires_at: expiry_from(refreshed.expires_in.as_deref(), Utc::now()),
            ..credential.clone()
        };
        write_json(self.store.as_ref(), keys::IDENTITY_SESSION, &updated).await?;
        tracing::debug!("identity token refreshed");
        Ok(updated)
    }
}

#[async_trait]
impl IdentityProvider for FirebasePhoneAuth {
    async fn send_verification_code(&self, phone_number: &str) -> Result<String> {
        let url = self.url(&self.config.identity_toolkit_url, "/v1/accounts:sendVerificationCode")?;
        let request = SendCodeRequest {
            phone_number,
            recaptcha_token: self.config.recaptcha_token.as_deref(),
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let body: SendCodeResponse = self.parse(response).await?;
        Ok(body.session_info)
    }

    async fn confirm_code(&self, verification_id: &str, code: &str) -> Result<Principal> {
        let url = self.url(&self.config.identity_toolkit_url, "/v1/accounts:signInWithPhoneNumber")?;
        let request = SignInRequest {
            session_info: verification_id,
            code,
        };

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let body: SignInResponse = self.parse(response).await?;
        let credential = StoredCredential {
            uid: body.local_id,
            phone_number: body.phone_number.unwrap_or_default(),
            id_token: body.id_token,
            refresh_token: body.refresh_token,
            expires_at: expiry_from(body.expires_in.as_deref(), Utc::now()),
        };
        write_json(self.store.as_ref(), keys::IDENTITY_SESSION, &credential).await?;

        Ok(credential.principal())
    }

    async fn current_principal(&self) -> Result<Option<Principal>> {
        Ok(self.load_credential().await?.map(|c| c.principal()))
    }

    async fn id_token(&self) -> Result<String> {
        let _guard = self.refresh_lock.lock().await;
        let credential = self
            .load_credential()
            .await?
            .ok_or(Error::NotAuthenticated)?;

        if !credential.needs_refresh(Utc::now()) {
            return Ok(credential.id_token);
        }
        Ok(self.refresh(&credential).await?.id_token)
    }

    async fn sign_out(&self) -> Result<()> {
        let _guard = self.refresh_lock.lock().await;
        self.store.remove(keys::IDENTITY_SESSION).await
    }
}
