//! Admin user record - the backend's view of a registered phone number

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

fn default_active() -> bool {
    true
}

/// A registered user as listed by the admin endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub phone_number: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login: Option<NaiveDateTime>,
}

/// Body of `PUT /api/admin/users/{phoneNumber}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserUpdate {
    pub name: String,
    pub is_active: bool,
}

impl AdminUserUpdate {
    pub fn new(name: impl Into<String>, is_active: bool) -> Self {
        Self {
            name: name.into(),
            is_active,
        }
    }
}

impl From<&AdminUser> for AdminUserUpdate {
    fn from(user: &AdminUser) -> Self {
        Self {
            name: user.name.clone(),
            is_active: user.is_active,
        }
    }
}
