//! Authenticated user profile.

use serde::{Deserialize, Serialize};

/// The current user, replaced wholesale on every successful auth call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}
