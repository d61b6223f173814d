//! Common test utilities and fixtures for partysync integration tests
//!
//! Provides an in-memory store with a session and default configuration,
//! seeding helpers for games, markers and users, and helpers that wait for
//! asynchronous mirrors to settle.

#![allow(dead_code)]

use partysync::store::{CollectionPath, DocumentData, DocumentPath};
use partysync::{
    DocumentStore, GameMutations, GameSynchronizer, InMemoryDocumentStore, Principal,
    SessionContext, SyncConfig, UserProfile,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// How long a test waits for a mirror to reach the expected state
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Common test fixture shared by the integration tests
pub struct PartyFixture {
    pub store: InMemoryDocumentStore,
    pub session: SessionContext,
    pub config: SyncConfig,
}

impl PartyFixture {
    pub fn new() -> Self {
        Self {
            store: InMemoryDocumentStore::new(),
            session: SessionContext::new(),
            config: SyncConfig::default(),
        }
    }

    pub fn store(&self) -> Arc<dyn DocumentStore> {
        Arc::new(self.store.clone())
    }

    pub fn games(&self) -> CollectionPath {
        self.config.games_path()
    }

    pub fn users(&self) -> CollectionPath {
        self.config.users_path()
    }

    pub fn game_path(&self, game_id: &str) -> DocumentPath {
        self.games().doc(game_id).unwrap()
    }

    pub fn vote_path(&self, game_id: &str, user_id: &str) -> DocumentPath {
        self.game_path(game_id)
            .collection(&self.config.collections.votes)
            .doc(user_id)
            .unwrap()
    }

    pub fn installed_path(&self, game_id: &str, user_id: &str) -> DocumentPath {
        self.game_path(game_id)
            .collection(&self.config.collections.installed_by)
            .doc(user_id)
            .unwrap()
    }

    /// Sign in with a profile carrying the given admin flag
    pub fn sign_in(&self, uid: &str, is_admin: bool) {
        self.session.sign_in(Principal::new(uid));
        self.session.set_profile(Some(UserProfile {
            is_admin,
            ..UserProfile::new(uid)
        }));
    }

    /// Synchronizer reading profiles with a collection scan
    pub fn synchronizer(&self) -> GameSynchronizer {
        GameSynchronizer::from_config(
            self.store(),
            Arc::new(self.session.clone()),
            &self.config,
            None,
        )
        .unwrap()
    }

    pub fn mutations(&self) -> GameMutations {
        GameMutations::new(self.store(), self.session.clone(), &self.config)
    }

    pub async fn seed_game(&self, game_id: &str, title: &str) {
        let data = DocumentData::new()
            .with("title", title)
            .with("maxPlayers", 4)
            .with("platforms", vec!["pc"]);
        self.store
            .write_document(&self.game_path(game_id), data, false)
            .await
            .unwrap();
    }

    pub async fn seed_user(&self, uid: &str, display_name: &str) {
        let data = DocumentData::new()
            .with("displayName", display_name)
            .with("approved", true);
        self.store
            .write_document(&self.users().doc(uid).unwrap(), data, false)
            .await
            .unwrap();
    }

    pub async fn seed_vote(&self, game_id: &str, user_id: &str) {
        let data = DocumentData::new()
            .with("userId", user_id)
            .with_server_timestamp("createdAt");
        self.store
            .write_document(&self.vote_path(game_id, user_id), data, false)
            .await
            .unwrap();
    }

    pub async fn seed_installed(&self, game_id: &str, user_id: &str) {
        let data = DocumentData::new()
            .with("userId", user_id)
            .with_server_timestamp("installedAt");
        self.store
            .write_document(&self.installed_path(game_id, user_id), data, false)
            .await
            .unwrap();
    }

    pub async fn remove(&self, path: &DocumentPath) {
        self.store.delete_document(path).await.unwrap();
    }
}

impl Default for PartyFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait until the watched value satisfies `condition` and return it
pub async fn wait_for<T, F>(receiver: &mut watch::Receiver<T>, condition: F) -> T
where
    T: Clone,
    F: Fn(&T) -> bool,
{
    let settle = async {
        loop {
            {
                let value = receiver.borrow_and_update().clone();
                if condition(&value) {
                    return value;
                }
            }
            receiver.changed().await.expect("publisher dropped");
        }
    };
    tokio::time::timeout(SETTLE_TIMEOUT, settle)
        .await
        .expect("watched value never reached the expected state")
}

/// Poll `condition` until it holds; false on timeout
pub async fn wait_until<F: FnMut() -> bool>(mut condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + SETTLE_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Let queued notifications drain
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}
