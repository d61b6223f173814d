//! Configuration for partysync
//!
//! Collection names, synchronizer behaviour and logging are loaded from a TOML
//! file and may be overridden by `PARTYSYNC_*` environment variables.
//!
//! ```toml
//! [collections]
//! games = "games"
//! votes = "votes"
//! installed_by = "installedBy"
//!
//! [sync]
//! order_field = "title"
//! profile_lookup = "directory"
//!
//! [logging.general]
//! default_level = "DEBUG"
//! ```

use crate::constants::*;
use crate::error::{SyncError, SyncResult};
use crate::logging::LogConfig;
use crate::store::{CollectionPath, DocumentPath};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub collections: CollectionNames,
    pub sync: SyncSettings,
    pub logging: LogConfig,
}

/// Names of the collections and documents in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionNames {
    pub games: String,
    pub votes: String,
    pub installed_by: String,
    pub users: String,
    pub party_status: String,
    pub party_status_doc: String,
}

impl Default for CollectionNames {
    fn default() -> Self {
        Self {
            games: DEFAULT_GAMES_COLLECTION.to_string(),
            votes: DEFAULT_VOTES_COLLECTION.to_string(),
            installed_by: DEFAULT_INSTALLED_BY_COLLECTION.to_string(),
            users: DEFAULT_USERS_COLLECTION.to_string(),
            party_status: DEFAULT_PARTY_STATUS_COLLECTION.to_string(),
            party_status_doc: DEFAULT_PARTY_STATUS_DOCUMENT.to_string(),
        }
    }
}

/// How voter and installer profiles are looked up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileLookupMode {
    /// Read the whole users collection on every lookup
    Scan,
    /// Serve lookups from a live user directory
    Directory,
}

/// Synchronizer behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Field the games collection is ordered by, ascending
    pub order_field: String,
    /// Field the user directory is ordered by, descending
    pub users_order_field: String,
    pub profile_lookup: ProfileLookupMode,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            order_field: DEFAULT_GAMES_ORDER_FIELD.to_string(),
            users_order_field: DEFAULT_USERS_ORDER_FIELD.to_string(),
            profile_lookup: ProfileLookupMode::Scan,
        }
    }
}

impl SyncConfig {
    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> SyncResult<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SyncError::Config(format!(
                "Failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        let mut config: SyncConfig = toml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("Failed to parse config: {}", e)))?;

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> SyncResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    pub fn apply_env_overrides(&mut self) {
        let names = &mut self.collections;
        for (var, slot) in [
            ("PARTYSYNC_COLLECTION_GAMES", &mut names.games),
            ("PARTYSYNC_COLLECTION_VOTES", &mut names.votes),
            ("PARTYSYNC_COLLECTION_INSTALLED_BY", &mut names.installed_by),
            ("PARTYSYNC_COLLECTION_USERS", &mut names.users),
            ("PARTYSYNC_COLLECTION_PARTY_STATUS", &mut names.party_status),
            ("PARTYSYNC_COLLECTION_PARTY_STATUS_DOC", &mut names.party_status_doc),
        ] {
            if let Ok(value) = std::env::var(var) {
                *slot = value;
            }
        }

        if let Ok(field) = std::env::var("PARTYSYNC_ORDER_FIELD") {
            self.sync.order_field = field;
        }
        if let Ok(mode) = std::env::var("PARTYSYNC_PROFILE_LOOKUP") {
            match mode.to_lowercase().as_str() {
                "scan" => self.sync.profile_lookup = ProfileLookupMode::Scan,
                "directory" => self.sync.profile_lookup = ProfileLookupMode::Directory,
                other => log::warn!("Ignoring unknown PARTYSYNC_PROFILE_LOOKUP '{}'", other),
            }
        }

        self.logging.apply_env_overrides();
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> SyncResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SyncError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::Config(format!("Failed to create directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| SyncError::Config(format!("Failed to write config: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> SyncResult<()> {
        let names = &self.collections;
        for (key, value) in [
            ("games", &names.games),
            ("votes", &names.votes),
            ("installed_by", &names.installed_by),
            ("users", &names.users),
            ("party_status", &names.party_status),
            ("party_status_doc", &names.party_status_doc),
        ] {
            if value.is_empty() || value.contains('/') {
                return Err(SyncError::Config(format!(
                    "collections.{} must be a single non-empty path segment, got '{}'",
                    key, value
                )));
            }
        }

        if self.sync.order_field.is_empty() || self.sync.users_order_field.is_empty() {
            return Err(SyncError::Config("order fields must not be empty".to_string()));
        }

        self.logging
            .validate()
            .map_err(|e| SyncError::Config(e.to_string()))
    }

    pub fn games_path(&self) -> CollectionPath {
        CollectionPath::root(&self.collections.games)
    }

    pub fn users_path(&self) -> CollectionPath {
        CollectionPath::root(&self.collections.users)
    }

    /// The party status singleton document
    pub fn party_status_path(&self) -> SyncResult<DocumentPath> {
        CollectionPath::root(&self.collections.party_status)
            .doc(&self.collections.party_status_doc)
            .map_err(|e| SyncError::Config(e.to_string()))
    }
}
