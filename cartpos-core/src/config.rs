//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "backend": { "baseUrl": "http://localhost:8001", "timeoutSecs": 30 },
//!   "auth": { "firebaseApiKey": "...", "countryCode": "+91" },
//!   "session": { "pollIntervalSecs": 120, "retry": { "maxAttempts": 3 } }
//! }
//! ```
//! Fields this crate doesn't know about are left untouched on save.

use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::firebase::{IDENTITY_TOOLKIT_URL, SECURE_TOKEN_URL};
use crate::domain::verification::validate_country_code;
use crate::services::{RetryPolicy, DEFAULT_COUNTRY_CODE};

pub const SETTINGS_FILE: &str = "settings.json";

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 120;

/// Environment variables that override the settings file
pub const ENV_BACKEND_URL: &str = "CARTPOS_BACKEND_URL";
pub const ENV_FIREBASE_API_KEY: &str = "CARTPOS_FIREBASE_API_KEY";
pub const ENV_POLL_INTERVAL_SECS: &str = "CARTPOS_POLL_INTERVAL_SECS";

/// Raw settings.json structure; unknown fields are ignored here and kept by
/// [`Config::set`], which edits the JSON document directly
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    backend: BackendSettings,
    #[serde(default)]
    auth: AuthSettings,
    #[serde(default)]
    session: SessionSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendSettings {
    #[serde(default)]
    base_url: Option<String>,
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthSettings {
    #[serde(default)]
    firebase_api_key: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
    #[serde(default)]
    identity_toolkit_url: Option<String>,
    #[serde(default)]
    secure_token_url: Option<String>,
    #[serde(default)]
    recaptcha_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionSettings {
    #[serde(default)]
    poll_interval_secs: Option<u64>,
    #[serde(default)]
    retry: Option<RetrySettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrySettings {
    #[serde(default)]
    max_attempts: Option<u32>,
    #[serde(default)]
    initial_delay_ms: Option<u64>,
    #[serde(default)]
    max_delay_ms: Option<u64>,
}

/// Keys accepted by [`Config::set`]
pub const SETTABLE_KEYS: &[&str] = &[
    "backend.baseUrl",
    "backend.timeoutSecs",
    "auth.firebaseApiKey",
    "auth.countryCode",
    "auth.identityToolkitUrl",
    "auth.secureTokenUrl",
    "auth.recaptchaToken",
    "session.pollIntervalSecs",
    "session.retry.maxAttempts",
    "session.retry.initialDelayMs",
    "session.retry.maxDelayMs",
];

const NUMERIC_KEYS: &[&str] = &[
    "backend.timeoutSecs",
    "session.pollIntervalSecs",
    "session.retry.maxAttempts",
    "session.retry.initialDelayMs",
    "session.retry.maxDelayMs",
];

/// Resolved configuration (file + environment + defaults)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub backend_url: String,
    #[serde(with = "secs")]
    pub http_timeout: Duration,
    #[serde(skip_serializing)]
    pub firebase_api_key: Option<String>,
    pub country_code: String,
    pub identity_toolkit_url: String,
    pub secure_token_url: String,
    #[serde(skip_serializing)]
    pub recaptcha_token: Option<String>,
    #[serde(with = "secs")]
    pub poll_interval: Duration,
    pub retry: RetryPolicy,
}

mod secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            firebase_api_key: None,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
            identity_toolkit_url: IDENTITY_TOOLKIT_URL.to_string(),
            secure_token_url: SECURE_TOKEN_URL.to_string(),
            recaptcha_token: None,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow!("Invalid {}: {}", settings_path.display(), e))
}

impl Config {
    /// Load config from the data directory, then apply environment overrides
    pub fn load(data_dir: &Path) -> Result<Self> {
        let mut config = Self::from_settings(&read_settings(data_dir)?);
        config.apply_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_settings(raw: &SettingsFile) -> Self {
        let defaults = Self::default();
        let retry = raw.session.retry.clone().unwrap_or_default();

        Self {
            backend_url: raw.backend.base_url.clone().unwrap_or(defaults.backend_url),
            http_timeout: raw
                .backend
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            firebase_api_key: raw.auth.firebase_api_key.clone(),
            country_code: raw.auth.country_code.clone().unwrap_or(defaults.country_code),
            identity_toolkit_url: raw
                .auth
                .identity_toolkit_url
                .clone()
                .unwrap_or(defaults.identity_toolkit_url),
            secure_token_url: raw
                .auth
                .secure_token_url
                .clone()
                .unwrap_or(defaults.secure_token_url),
            recaptcha_token: raw.auth.recaptcha_token.clone(),
            poll_interval: raw
                .session
                .poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll_interval),
            retry: RetryPolicy {
                max_attempts: retry.max_attempts.unwrap_or(defaults.retry.max_attempts),
                initial_delay_ms: retry.initial_delay_ms.unwrap_or(defaults.retry.initial_delay_ms),
                max_delay_ms: retry.max_delay_ms.unwrap_or(defaults.retry.max_delay_ms),
            },
        }
    }

    /// Apply `CARTPOS_*` overrides; `lookup` reads an environment variable
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_BACKEND_URL).filter(|v| !v.is_empty()) {
            self.backend_url = url;
        }
        if let Some(key) = lookup(ENV_FIREBASE_API_KEY).filter(|v| !v.is_empty()) {
            self.firebase_api_key = Some(key);
        }
        if let Some(secs) = lookup(ENV_POLL_INTERVAL_SECS).filter(|v| !v.is_empty()) {
            let secs: u64 = secs
                .trim()
                .parse()
                .map_err(|_| anyhow!("{} must be a number of seconds, got '{}'", ENV_POLL_INTERVAL_SECS, secs))?;
            self.poll_interval = Duration::from_secs(secs);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        validate_country_code(&self.country_code)?;
        if self.poll_interval.is_zero() {
            bail!("session.pollIntervalSecs must be greater than zero");
        }
        if self.http_timeout.is_zero() {
            bail!("backend.timeoutSecs must be greater than zero");
        }
        Ok(())
    }

    /// Set one dotted key in settings.json, preserving everything else
    pub fn set(data_dir: &Path, key: &str, value: &str) -> Result<()> {
        if !SETTABLE_KEYS.contains(&key) {
            bail!(
                "Unknown setting '{}'. Known settings: {}",
                key,
                SETTABLE_KEYS.join(", ")
            );
        }

        let new_value = if NUMERIC_KEYS.contains(&key) {
            let n: u64 = value
                .trim()
                .parse()
                .map_err(|_| anyhow!("'{}' expects a whole number, got '{}'", key, value))?;
            serde_json::Value::from(n)
        } else {
            serde_json::Value::from(value.to_string())
        };

        let settings_path = data_dir.join(SETTINGS_FILE);
        let mut root = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str::<serde_json::Value>(&content)?
        } else {
            serde_json::json!({})
        };
        if !root.is_object() {
            bail!("{} must contain a JSON object", settings_path.display());
        }

        let mut node = &mut root;
        let parts: Vec<&str> = key.split('.').collect();
        let (last, parents) = parts
            .split_last()
            .ok_or_else(|| anyhow!("Empty setting key"))?;
        for part in parents {
            if !node.get(*part).is_some_and(|v| v.is_object()) {
                node[*part] = serde_json::json!({});
            }
            node = &mut node[*part];
        }
        node[*last] = new_value;

        // Reject writes that would leave an unloadable file behind
        let parsed: SettingsFile = serde_json::from_value(root.clone())?;
        Self::from_settings(&parsed).validate()?;

        std::fs::create_dir_all(data_dir)?;
        std::fs::write(&settings_path, serde_json::to_string_pretty(&root)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_without_file() {
        let dir = tempdir().unwrap();
        let config = Config::from_settings(&read_settings(dir.path()).unwrap());
        assert_eq!(config, Config::default());
        assert_eq!(config.backend_url, "http://localhost:8001");
        assert_eq!(config.country_code, "+91");
        assert_eq!(config.poll_interval, Duration::from_secs(120));
    }

    #[test]
    fn test_load_reads_nested_settings() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{
                "backend": { "baseUrl": "https://cart.example.com", "timeoutSecs": 10 },
                "auth": { "firebaseApiKey": "key", "countryCode": "+1" },
                "session": { "pollIntervalSecs": 60, "retry": { "maxAttempts": 5 } }
            }"#,
        )
        .unwrap();

        let config = Config::from_settings(&read_settings(dir.path()).unwrap());
        assert_eq!(config.backend_url, "https://cart.example.com");
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert_eq!(config.firebase_api_key.as_deref(), Some("key"));
        assert_eq!(config.country_code, "+1");
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay_ms, 500);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(|name| match name {
                ENV_BACKEND_URL => Some("http://10.0.2.2:8001".to_string()),
                ENV_POLL_INTERVAL_SECS => Some("30".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.backend_url, "http://10.0.2.2:8001");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert!(config.firebase_api_key.is_none());

        let bad = config.apply_overrides(|name| {
            (name == ENV_POLL_INTERVAL_SECS).then(|| "soon".to_string())
        });
        assert!(bad.is_err());
    }

    #[test]
    fn test_set_preserves_unknown_fields() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "theme": "dark", "backend": { "baseUrl": "http://old", "proxy": "none" } }"#,
        )
        .unwrap();

        Config::set(dir.path(), "backend.baseUrl", "http://new").unwrap();
        Config::set(dir.path(), "session.retry.maxAttempts", "4").unwrap();

        let content = std::fs::read_to_string(dir.path().join(SETTINGS_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["theme"], "dark");
        assert_eq!(value["backend"]["proxy"], "none");
        assert_eq!(value["backend"]["baseUrl"], "http://new");
        assert_eq!(value["session"]["retry"]["maxAttempts"], 4);
    }

    #[test]
    fn test_load_ignores_unknown_fields() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join(SETTINGS_FILE),
            r#"{ "theme": "dark", "auth": { "countryCode": "+44", "legacy": true } }"#,
        )
        .unwrap();

        let config = Config::from_settings(&read_settings(dir.path()).unwrap());
        assert_eq!(config.country_code, "+44");
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let dir = tempdir().unwrap();
        assert!(Config::set(dir.path(), "backend.colour", "blue").is_err());
        assert!(Config::set(dir.path(), "session.pollIntervalSecs", "often").is_err());
        assert!(Config::set(dir.path(), "auth.countryCode", "91").is_err());
        assert!(!dir.path().join(SETTINGS_FILE).exists());
    }
}
