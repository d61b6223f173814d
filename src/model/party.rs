//! The party status singleton, `partyStatus/current`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Shared party state; every field is optional in the stored document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyStatus {
    #[serde(default)]
    pub pause_end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub current_game_id: Option<String>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
