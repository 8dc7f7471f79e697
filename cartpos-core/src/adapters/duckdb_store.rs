//! DuckDB-backed local store

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use duckdb::{params, Connection};

use crate::domain::{Error, Result};
use crate::migrations::STORE_MIGRATIONS;
use crate::ports::LocalStore;
use crate::services::MigrationService;

/// Maximum number of retries when database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry: 50, 100, 200, 400ms)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue that should be retried
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
        || lower.contains("could not set lock on file")
}

fn storage_err(e: impl std::fmt::Display) -> Error {
    Error::storage(e.to_string())
}

fn lock_connection(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| Error::storage(format!("Lock poisoned: {}", e)))
}

/// Key-value store in a single DuckDB table
///
/// The CLI and the poller may open the same file from different processes,
/// so opening retries with exponential backoff on lock contention. Opening
/// blocks the calling thread; reads and writes run on tokio's blocking pool.
pub struct DuckDbStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl DuckDbStore {
    /// Open (or create) the store at `db_path` and apply pending migrations
    pub fn open(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    let store = Self {
                        conn: Arc::new(Mutex::new(conn)),
                        db_path: Some(db_path.to_path_buf()),
                    };
                    store.ensure_schema()?;
                    return Ok(store);
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        tracing::warn!(
                            delay_ms = delay.as_millis() as u64,
                            attempt = attempt + 1,
                            max = MAX_RETRIES,
                            error = %err_msg,
                            "local store busy, retrying"
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(storage_err(e));
                }
            }
        }

        Err(last_error.map(storage_err).unwrap_or_else(|| {
            Error::storage(format!("Failed to open local store after {} retries", MAX_RETRIES))
        }))
    }

    /// In-memory store, mostly for tests and throwaway sessions
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(storage_err)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        };
        store.ensure_schema()?;
        Ok(store)
    }

    fn try_open_connection(db_path: &Path) -> duckdb::Result<Connection> {
        // Extension autoloading stays off, nothing here needs extensions
        let config = duckdb::Config::default().enable_autoload_extension(false)?;
        Connection::open_with_flags(db_path, config)
    }

    fn ensure_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        MigrationService::new(&conn, STORE_MIGRATIONS)
            .run_pending()
            .map_err(storage_err)?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        lock_connection(&self.conn)
    }

    /// Run a statement on the blocking pool so DuckDB I/O never stalls the runtime
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> duckdb::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let conn = lock_connection(&conn)?;
            f(&conn).map_err(storage_err)
        })
        .await
        .map_err(|e| Error::storage(format!("Local store task failed: {}", e)))?
    }

    /// Path of the database file, `None` for in-memory stores
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }
}

#[async_trait]
impl LocalStore for DuckDbStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            let mut stmt = conn.prepare("SELECT store_value FROM kv_store WHERE store_key = ?")?;
            let mut rows = stmt.query_map([key.as_str()], |row| row.get::<_, String>(0))?;
            rows.next().transpose()
        })
        .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let (key, value) = (key.to_string(), value.to_string());
        self.with_connection(move |conn| {
            conn.execute(
                "INSERT INTO kv_store (store_key, store_value, updated_at)
                 VALUES (?, ?, CURRENT_TIMESTAMP)
                 ON CONFLICT (store_key) DO UPDATE
                 SET store_value = excluded.store_value, updated_at = excluded.updated_at",
                params![key, value],
            )
            .map(|_| ())
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.with_connection(move |conn| {
            conn.execute("DELETE FROM kv_store WHERE store_key = ?", [key.as_str()])
                .map(|_| ())
        })
        .await
    }
}
