//! # Mutation API
//!
//! Writes on games and their markers. Every operation checks the session
//! before touching the store. Changes reach the mirrors only through the
//! store's notifications; nothing is applied locally.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::model::NewGame;
use crate::session::SessionContext;
use crate::store::{CollectionPath, DocumentData, DocumentPath, DocumentStore, StoreResult};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
enum Marker {
    Vote,
    Installed,
}

impl Marker {
    fn bulk_operation(self) -> &'static str {
        match self {
            Marker::Vote => "remove_all_votes_from_user",
            Marker::Installed => "remove_all_installed_from_user",
        }
    }
}

pub struct GameMutations {
    store: Arc<dyn DocumentStore>,
    session: SessionContext,
    games: CollectionPath,
    votes: String,
    installed_by: String,
}

impl GameMutations {
    pub fn new(store: Arc<dyn DocumentStore>, session: SessionContext, config: &SyncConfig) -> Self {
        Self {
            store,
            session,
            games: config.games_path(),
            votes: config.collections.votes.clone(),
            installed_by: config.collections.installed_by.clone(),
        }
    }

    fn marker_path(&self, game_id: &str, user_id: &str, marker: Marker) -> StoreResult<DocumentPath> {
        let sub = match marker {
            Marker::Vote => &self.votes,
            Marker::Installed => &self.installed_by,
        };
        self.games.doc(game_id)?.collection(sub).doc(user_id)
    }

    /// Create a game owned by the signed-in user; returns its id
    pub async fn add_game(&self, game: NewGame) -> SyncResult<String> {
        let principal = self.session.require_principal()?;

        if game.title.trim().is_empty() {
            return Err(SyncError::Validation("title must not be empty".to_string()));
        }
        if game.max_players == 0 {
            return Err(SyncError::Validation(
                "max_players must be at least 1".to_string(),
            ));
        }

        let id = Uuid::new_v4().to_string();
        let path = self.games.doc(&id)?;
        let data = DocumentData::from_serializable(&game)?
            .with("createdBy", principal.uid.as_str())
            .with_server_timestamp("createdAt");
        self.store.write_document(&path, data, false).await?;

        crate::log_mutation_info!("'{}' added game '{}' ({})", principal.uid, game.title, id);
        Ok(id)
    }

    /// Delete a game document. Its markers are left to the store.
    pub async fn delete_game(&self, game_id: &str) -> SyncResult<()> {
        let admin = self.session.require_admin()?;
        let path = self.games.doc(game_id)?;
        self.store.delete_document(&path).await?;
        crate::log_mutation_info!("'{}' deleted game '{}'", admin.uid, game_id);
        Ok(())
    }

    pub async fn vote_for_game(&self, game_id: &str) -> SyncResult<()> {
        let principal = self.session.require_principal()?;
        let path = self.marker_path(game_id, &principal.uid, Marker::Vote)?;
        let data = DocumentData::new()
            .with("userId", principal.uid.as_str())
            .with_server_timestamp("createdAt");
        self.store.write_document(&path, data, false).await?;
        crate::log_mutation_debug!("'{}' voted for '{}'", principal.uid, game_id);
        Ok(())
    }

    pub async fn remove_vote_for_game(&self, game_id: &str) -> SyncResult<()> {
        let principal = self.session.require_principal()?;
        let path = self.marker_path(game_id, &principal.uid, Marker::Vote)?;
        self.store.delete_document(&path).await?;
        crate::log_mutation_debug!("'{}' removed vote for '{}'", principal.uid, game_id);
        Ok(())
    }

    pub async fn mark_installed(&self, game_id: &str) -> SyncResult<()> {
        let principal = self.session.require_principal()?;
        let path = self.marker_path(game_id, &principal.uid, Marker::Installed)?;
        let data = DocumentData::new()
            .with("userId", principal.uid.as_str())
            .with_server_timestamp("installedAt");
        self.store.write_document(&path, data, false).await?;
        crate::log_mutation_debug!("'{}' installed '{}'", principal.uid, game_id);
        Ok(())
    }

    /// Remove the installed marker of the signed-in user.
    ///
    /// The vote is deleted first; a user cannot keep voting for a game they
    /// no longer have installed. No rollback if the second delete fails.
    pub async fn unmark_installed(&self, game_id: &str) -> SyncResult<()> {
        let principal = self.session.require_principal()?;
        let vote = self.marker_path(game_id, &principal.uid, Marker::Vote)?;
        let installed = self.marker_path(game_id, &principal.uid, Marker::Installed)?;

        self.store.delete_document(&vote).await?;
        if let Err(source) = self.store.delete_document(&installed).await {
            crate::log_mutation_warn!(
                "Vote of '{}' on '{}' removed but installed marker remains: {}",
                principal.uid,
                game_id,
                source
            );
            return Err(SyncError::PartialUnmark {
                game_id: game_id.to_string(),
                source,
            });
        }

        crate::log_mutation_debug!("'{}' uninstalled '{}'", principal.uid, game_id);
        Ok(())
    }

    /// Delete every vote of `user_id`
    pub async fn remove_all_votes_from_user(&self, user_id: &str) -> SyncResult<Vec<String>> {
        self.remove_all(user_id, Marker::Vote).await
    }

    /// Delete every installed marker of `user_id`
    pub async fn remove_all_installed_from_user(&self, user_id: &str) -> SyncResult<Vec<String>> {
        self.remove_all(user_id, Marker::Installed).await
    }

    /// Delete the marker of `user_id` under every game, in collection order.
    ///
    /// Returns the ids of the games processed. Stops at the first failure;
    /// deletions already made stay.
    async fn remove_all(&self, user_id: &str, marker: Marker) -> SyncResult<Vec<String>> {
        let admin = self.session.require_admin()?;
        let games = self.store.read_collection_once(&self.games).await?;

        let mut completed = Vec::with_capacity(games.len());
        for game_id in games.ids() {
            let result = match self.marker_path(&game_id, user_id, marker) {
                Ok(path) => self.store.delete_document(&path).await,
                Err(e) => Err(e),
            };
            if let Err(source) = result {
                crate::log_mutation_warn!(
                    "{} for '{}' stopped at game '{}': {}",
                    marker.bulk_operation(),
                    user_id,
                    game_id,
                    source
                );
                return Err(SyncError::BulkRemoval {
                    operation: marker.bulk_operation().to_string(),
                    user_id: user_id.to_string(),
                    completed,
                    failed_game_id: game_id,
                    source,
                });
            }
            completed.push(game_id);
        }

        crate::log_mutation_info!(
            "'{}' ran {} for '{}' over {} games",
            admin.uid,
            marker.bulk_operation(),
            user_id,
            completed.len()
        );
        Ok(completed)
    }
}
