//! Local store port - key-value persistence on the device

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::Result;

/// Fixed keys under which records are stored
pub mod keys {
    /// Serialized `SessionUser` of the signed-in user
    pub const SESSION_USER: &str = "user";
    /// Identity provider credential that keeps the principal signed in across restarts
    pub const IDENTITY_SESSION: &str = "identitySession";
}

/// String key-value store
///
/// A single `set` or `remove` is atomic; nothing stronger is promised.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read a value, `None` if the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; deleting an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Read and deserialize a JSON record
pub async fn read_json<T: DeserializeOwned>(store: &dyn LocalStore, key: &str) -> Result<Option<T>> {
    match store.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize and write a JSON record
pub async fn write_json<T: Serialize + ?Sized>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw).await
}
