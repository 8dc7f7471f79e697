//! Session user domain model

use serde::{Deserialize, Serialize};

fn default_active() -> bool {
    true
}

/// The authenticated identity cached in the local store
///
/// Serialized with the same camelCase field names the backend returns, so the
/// stored record is byte-for-byte the user object from `verify-token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub phone_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub is_super_admin: bool,
}

impl SessionUser {
    pub fn new(phone_number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
            name: name.into(),
            is_active: true,
            is_super_admin: false,
        }
    }

    /// Super-admins are exempt from the active-flag check
    pub fn is_permitted(&self) -> bool {
        self.is_active || self.is_super_admin
    }

    /// Name for display, falling back to the phone number
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.phone_number
        } else {
            &self.name
        }
    }
}
