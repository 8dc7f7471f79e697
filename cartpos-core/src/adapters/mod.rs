//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - Firebase phone auth (REST) for IdentityProvider
//! - reqwest HTTP client for BackendApi
//! - DuckDB and in-memory maps for LocalStore

pub mod backend_http;
pub mod duckdb_store;
pub mod firebase;
pub mod memory_store;

#[cfg(test)]
pub mod mock_server;
