//! User profiles and the authenticated principal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub uid: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl Principal {
    pub fn new(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            email: None,
        }
    }
}

/// Profile document, `users/{uid}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub approved: bool,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    pub fn new(display_name: &str) -> Self {
        Self {
            display_name: display_name.to_string(),
            approved: false,
            is_admin: false,
            created_at: None,
        }
    }
}

/// A profile together with the id of the user owning it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRef {
    pub id: String,
    #[serde(flatten)]
    pub profile: UserProfile,
}
