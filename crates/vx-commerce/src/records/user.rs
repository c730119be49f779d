//! User profiles

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vx_binding::Record;
use vx_gateway::DocumentId;

/// Access role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Shopper
    #[default]
    Customer,
    /// Store administrator
    Admin,
}

/// A registered user; the id is the principal's uid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Principal uid
    pub id: DocumentId,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Contact phone
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Access role
    #[serde(default)]
    pub role: Role,
    /// Registration time
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// Check for the admin role
    #[inline]
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl Record for UserProfile {
    const COLLECTION: &'static str = "users";

    fn id(&self) -> &DocumentId {
        &self.id
    }
}
