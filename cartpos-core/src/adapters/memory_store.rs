//! In-memory local store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::Result;
use crate::ports::LocalStore;

/// Volatile store; everything is lost when it is dropped
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SessionUser;
    use crate::ports::{keys, read_json, write_json};

    #[tokio::test]
    async fn test_json_helpers() {
        let store = MemoryStore::new();
        let user = SessionUser::new("+919876543210", "Asha");

        write_json(&store, keys::SESSION_USER, &user).await.unwrap();
        let loaded: Option<SessionUser> = read_json(&store, keys::SESSION_USER).await.unwrap();
        assert_eq!(loaded, Some(user));

        store.remove(keys::SESSION_USER).await.unwrap();
        let loaded: Option<SessionUser> = read_json(&store, keys::SESSION_USER).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_an_error() {
        let store = MemoryStore::new();
        store.set(keys::SESSION_USER, "not json").await.unwrap();
        let loaded: Result<Option<SessionUser>> = read_json(&store, keys::SESSION_USER).await;
        assert!(loaded.is_err());
    }
}
