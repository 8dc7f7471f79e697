//! Backend API client
//!
//! Talks to the cartpos backend over HTTP. Every call carries the identity
//! provider's bearer token; the backend resolves it to a phone number and
//! answers with application-level user records.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::domain::{AdminUser, AdminUserUpdate, Error, Result, SessionUser};
use crate::ports::BackendApi;

// =============================================================================
// API Response Models
// =============================================================================

#[derive(Debug, Deserialize)]
struct VerifyTokenResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    user: Option<SessionUser>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersResponse {
    users: Vec<AdminUser>,
}

/// Error body, e.g. `{"detail": "Access denied"}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: JsonValue,
}

// =============================================================================
// HTTP Client
// =============================================================================

/// HTTP implementation of [`BackendApi`]
#[derive(Debug, Clone)]
pub struct HttpBackendClient {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpBackendClient {
    /// Create a client for the backend at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| Error::Config(format!("Invalid backend URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Backend URL must be an http(s) URL, got '{}'",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an endpoint URL; segments are percent-encoded individually
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Backend URL '{}' cannot be a base", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Map request errors to readable messages
    fn map_request_error(&self, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::Network(format!(
                "Connection timed out after {} seconds",
                self.timeout.as_secs()
            ))
        } else if error.is_connect() {
            Error::Network("Unable to connect to the server".to_string())
        } else {
            Error::Network(format!("Request failed: {}", error))
        }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;
        check_response_status(response).await
    }

    async fn read_json<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(e))?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Pull the `detail` message out of an error response
async fn error_detail(response: Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(ErrorBody {
            detail: JsonValue::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if !body.trim().is_empty() => body,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string(),
    }
}

/// Convert non-2xx responses into domain errors
async fn check_response_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = error_detail(response).await;
    Err(match status {
        StatusCode::UNAUTHORIZED => Error::AuthenticationFailed(message),
        StatusCode::FORBIDDEN => Error::Forbidden(message),
        StatusCode::NOT_FOUND => Error::NotFound(message),
        _ => Error::Backend {
            status: status.as_u16(),
            message,
        },
    })
}

#[async_trait]
impl BackendApi for HttpBackendClient {
    async fn health(&self) -> Result<()> {
        let url = self.endpoint(&["api", "health"])?;
        self.send(self.client.get(url)).await?;
        Ok(())
    }

    async fn verify_token(&self, id_token: &str) -> Result<SessionUser> {
        let url = self.endpoint(&["api", "auth", "verify-token"])?;
        let response = self
            .send(self.client.post(url).bearer_auth(id_token))
            .await
            .map_err(|e| match e {
                // On this endpoint a 403 means the account itself is disabled
                Error::Forbidden(message) => Error::AccountDeactivated(message),
                other => other,
            })?;

        let body: VerifyTokenResponse = self.read_json(response).await?;
        match body {
            VerifyTokenResponse {
                success: true,
                user: Some(user),
                ..
            } => Ok(user),
            VerifyTokenResponse { message, .. } => Err(Error::AuthenticationFailed(
                message.unwrap_or_else(|| "Verification failed".to_string()),
            )),
        }
    }

    async fn update_profile(&self, id_token: &str, name: &str) -> Result<()> {
        let url = self.endpoint(&["api", "users", "profile"])?;
        self.send(
            self.client
                .put(url)
                .bearer_auth(id_token)
                .json(&serde_json::json!({ "name": name })),
        )
        .await?;
        Ok(())
    }

    async fn list_users(&self, id_token: &str) -> Result<Vec<AdminUser>> {
        let url = self.endpoint(&["api", "admin", "users"])?;
        let response = self.send(self.client.get(url).bearer_auth(id_token)).await?;
        let body: UsersResponse = self.read_json(response).await?;
        Ok(body.users)
    }

    async fn search_users(&self, id_token: &str, query: &str) -> Result<Vec<AdminUser>> {
        let mut url = self.endpoint(&["api", "admin", "users", "search"])?;
        url.query_pairs_mut().append_pair("query", query);
        let response = self.send(self.client.get(url).bearer_auth(id_token)).await?;
        let body: UsersResponse = self.read_json(response).await?;
        Ok(body.users)
    }

    async fn update_user(
        &self,
        id_token: &str,
        phone_number: &str,
        update: &AdminUserUpdate,
    ) -> Result<()> {
        let url = self.endpoint(&["api", "admin", "users", phone_number])?;
        self.send(self.client.put(url).bearer_auth(id_token).json(update))
            .await?;
        Ok(())
    }
}
