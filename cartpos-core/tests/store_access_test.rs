//! Local store access patterns on a real DuckDB file
//!
//! Run with: cargo test --test store_access_test -- --nocapture

use std::sync::Arc;

use tempfile::TempDir;

use cartpos_core::adapters::duckdb_store::DuckDbStore;
use cartpos_core::ports::{keys, read_json, write_json, LocalStore};
use cartpos_core::SessionUser;

/// Many tasks sharing one store never see a torn record
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_writers_on_shared_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(DuckDbStore::open(&temp_dir.path().join("cartpos.duckdb")).unwrap());

    let mut handles = Vec::new();
    for i in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            for j in 0..10 {
                let user = SessionUser::new(format!("+9198765432{}{}", i, j % 10), format!("Writer {}", i));
                write_json(store.as_ref(), keys::SESSION_USER, &user).await.unwrap();
                let read: Option<SessionUser> =
                    read_json(store.as_ref(), keys::SESSION_USER).await.unwrap();
                assert!(read.is_some());
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let last: SessionUser = read_json(store.as_ref(), keys::SESSION_USER)
        .await
        .unwrap()
        .unwrap();
    assert!(last.name.starts_with("Writer "));
    assert_eq!(last.phone_number.len(), 13);
}

/// Open, write, close in a tight loop, as successive CLI invocations do
#[tokio::test]
async fn test_rapid_open_write_close_cycle() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("cartpos.duckdb");

    for i in 0..20 {
        let store = DuckDbStore::open(&db_path).unwrap();
        store.set("counter", &i.to_string()).await.unwrap();
    }

    let store = DuckDbStore::open(&db_path).unwrap();
    assert_eq!(store.get("counter").await.unwrap().as_deref(), Some("19"));
}

/// Keys are independent: clearing the session leaves the identity credential
#[tokio::test]
async fn test_keys_are_independent() {
    let temp_dir = TempDir::new().unwrap();
    let store = DuckDbStore::open(&temp_dir.path().join("cartpos.duckdb")).unwrap();

    store.set(keys::IDENTITY_SESSION, "{}").await.unwrap();
    write_json(&store, keys::SESSION_USER, &SessionUser::new("+919876543210", "Asha"))
        .await
        .unwrap();

    store.remove(keys::SESSION_USER).await.unwrap();

    assert!(store.get(keys::SESSION_USER).await.unwrap().is_none());
    assert_eq!(store.get(keys::IDENTITY_SESSION).await.unwrap().as_deref(), Some("{}"));
}
