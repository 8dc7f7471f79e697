//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The session core
//! depends only on these traits, not on concrete implementations.

mod backend;
mod identity_provider;
pub mod local_store;

pub use backend::BackendApi;
pub use identity_provider::{IdentityProvider, Principal};
pub use local_store::{keys, read_json, write_json, LocalStore};
