//! Game records and the synchronizer-owned mirror entry

use super::user::ProfileRef;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Persisted fields of a game document (`games/{id}`).
///
/// Every field decodes leniently: a null or mistyped value becomes the
/// field's default, so any stored document yields a record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    #[serde(default, deserialize_with = "lenient")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_count")]
    pub max_players: u32,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub platforms: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_by: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<DateTime<Utc>>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Numbers, or numeric strings such as `"4"`
fn lenient_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let count: u32 = match Value::deserialize(deserializer)? {
        Value::String(text) => text.trim().parse().unwrap_or_default(),
        value => serde_json::from_value(value).unwrap_or_default(),
    };
    Ok(count)
}

/// Keeps the string entries of a list
fn lenient_strings<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let strings: Vec<String> = match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(text) => Some(text),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    Ok(strings)
}

/// Input for adding a game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGame {
    pub title: String,
    pub max_players: u32,
    #[serde(default)]
    pub platforms: Vec<String>,
}

impl NewGame {
    pub fn new(title: &str, max_players: u32, platforms: &[&str]) -> Self {
        Self {
            title: title.to_string(),
            max_players,
            platforms: platforms.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Vote marker, `games/{id}/votes/{userId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteMarker {
    pub user_id: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Installed marker, `games/{id}/installedBy/{userId}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstalledMarker {
    pub user_id: String,
    #[serde(default)]
    pub installed_at: Option<DateTime<Utc>>,
}

/// A game as held in the local mirror.
///
/// The derived fields are owned by the synchronizer and recomputed from the
/// latest child snapshot on every notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub title: String,
    pub max_players: u32,
    pub platforms: Vec<String>,
    pub created_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,

    pub votes_count: usize,
    /// Voter ids in store order
    pub voter_ids: Vec<String>,
    pub voter_profiles: Vec<ProfileRef>,
    /// Installer ids in store order
    pub installer_ids: Vec<String>,
    pub installer_profiles: Vec<ProfileRef>,
}

impl Game {
    /// New mirror entry with zeroed derived fields
    pub fn from_record(id: &str, record: GameRecord) -> Self {
        Self {
            id: id.to_string(),
            title: record.title,
            max_players: record.max_players,
            platforms: record.platforms,
            created_by: record.created_by,
            created_at: record.created_at,
            votes_count: 0,
            voter_ids: Vec::new(),
            voter_profiles: Vec::new(),
            installer_ids: Vec::new(),
            installer_profiles: Vec::new(),
        }
    }

    /// Refresh the persisted fields, keeping the derived ones
    pub fn apply_record(&mut self, record: GameRecord) {
        self.title = record.title;
        self.max_players = record.max_players;
        self.platforms = record.platforms;
        self.created_by = record.created_by;
        self.created_at = record.created_at;
    }

    pub fn has_vote_from(&self, user_id: &str) -> bool {
        self.voter_ids.iter().any(|id| id == user_id)
    }

    pub fn is_installed_by(&self, user_id: &str) -> bool {
        self.installer_ids.iter().any(|id| id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_decodes_with_missing_optional_fields() {
        let record: GameRecord = serde_json::from_value(json!({
            "title": "Factorio",
            "maxPlayers": 8,
        }))
        .unwrap();

        assert_eq!(record.title, "Factorio");
        assert_eq!(record.max_players, 8);
        assert!(record.platforms.is_empty());
        assert!(record.created_at.is_none());
    }

    #[test]
    fn test_record_tolerates_null_and_mistyped_fields() {
        let record: GameRecord = serde_json::from_value(json!({
            "title": null,
            "maxPlayers": "4",
            "platforms": ["pc", 3, "switch"],
            "createdBy": 17,
            "createdAt": "yesterday",
        }))
        .unwrap();

        assert_eq!(record.title, "");
        assert_eq!(record.max_players, 4);
        assert_eq!(record.platforms, vec!["pc", "switch"]);
        assert!(record.created_by.is_none());
        assert!(record.created_at.is_none());

        let record: GameRecord =
            serde_json::from_value(json!({"title": ["x"], "maxPlayers": -2, "platforms": "pc"}))
                .unwrap();
        assert_eq!(record, GameRecord::default());
    }

    #[test]
    fn test_apply_record_keeps_derived_fields() {
        let record: GameRecord =
            serde_json::from_value(json!({"title": "Worms", "maxPlayers": 4})).unwrap();
        let mut game = Game::from_record("g1", record.clone());
        game.votes_count = 2;
        game.voter_ids = vec!["u1".to_string(), "u2".to_string()];

        let renamed = GameRecord {
            title: "Worms Armageddon".to_string(),
            ..record
        };
        game.apply_record(renamed);

        assert_eq!(game.title, "Worms Armageddon");
        assert_eq!(game.votes_count, 2);
        assert!(game.has_vote_from("u2"));
        assert!(!game.is_installed_by("u2"));
    }
}
