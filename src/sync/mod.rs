//! # Live Collection Synchronizer
//!
//! Mirrors the games collection together with the votes and installed-by
//! sub-collections of every game. One subscription is held on the games
//! collection; for each mirrored game the synchronizer holds exactly one
//! subscription per sub-collection, opened when the game first appears and
//! released when it leaves the collection.
//!
//! The derived fields of every [`Game`](crate::model::Game) are recomputed
//! from the latest child snapshot. Counts and ids are published at once,
//! profiles follow when their lookup completes. Failures are never retried;
//! they are logged and published on [`GameSynchronizer::errors`].

pub mod mirror;
pub mod profiles;
mod reactor;
pub mod tree;

pub use mirror::{membership, GameMirror};
pub use profiles::{decode_users, resolve_profiles, ProfileLookup, UserScan};
pub use tree::{ChildKey, ChildKind, SubscriptionTree};

use crate::config::{ProfileLookupMode, SyncConfig};
use crate::error::{SyncError, SyncResult};
use crate::session::IdentityProvider;
use crate::store::{DocumentStore, QueryOrder, SubscriptionHandle};
use crate::users::UserDirectory;
use reactor::{ChildPaths, Reactor, ReactorEvent};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

const ERROR_CHANNEL_CAPACITY: usize = 64;

struct RunningReactor {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Owner of the games mirror and of every subscription feeding it
pub struct GameSynchronizer {
    store: Arc<dyn DocumentStore>,
    identity: Arc<dyn IdentityProvider>,
    lookup: Arc<dyn ProfileLookup>,
    paths: ChildPaths,
    order: QueryOrder,
    mirror_tx: Arc<watch::Sender<Arc<GameMirror>>>,
    errors_tx: broadcast::Sender<SyncError>,
    running: Option<RunningReactor>,
}

impl GameSynchronizer {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        lookup: Arc<dyn ProfileLookup>,
        config: &SyncConfig,
    ) -> Self {
        let (mirror_tx, _) = watch::channel(Arc::new(GameMirror::default()));
        let (errors_tx, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);

        Self {
            store,
            identity,
            lookup,
            paths: ChildPaths {
                games: config.games_path(),
                votes: config.collections.votes.clone(),
                installed_by: config.collections.installed_by.clone(),
            },
            order: QueryOrder::asc(&config.sync.order_field),
            mirror_tx: Arc::new(mirror_tx),
            errors_tx,
            running: None,
        }
    }

    /// Build a synchronizer with the profile lookup selected by the config.
    ///
    /// `directory` is required when the config asks for directory lookups.
    pub fn from_config(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        config: &SyncConfig,
        directory: Option<Arc<UserDirectory>>,
    ) -> SyncResult<Self> {
        config.validate()?;
        let lookup: Arc<dyn ProfileLookup> = match (config.sync.profile_lookup, directory) {
            (ProfileLookupMode::Scan, _) => {
                Arc::new(UserScan::new(store.clone(), config.users_path()))
            }
            (ProfileLookupMode::Directory, Some(directory)) => directory,
            (ProfileLookupMode::Directory, None) => {
                return Err(SyncError::Config(
                    "profile_lookup = \"directory\" requires a user directory".to_string(),
                ))
            }
        };
        Ok(Self::new(store, identity, lookup, config))
    }

    /// Start mirroring.
    ///
    /// A running synchronizer is fully unsubscribed first. An error
    /// establishing the games subscription is returned; child failures are
    /// reported on [`errors`](Self::errors).
    pub async fn subscribe(&mut self) -> SyncResult<()> {
        self.unsubscribe().await;

        let stream = self
            .store
            .subscribe_collection(&self.paths.games, Some(&self.order))
            .await?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let parent_tx = events_tx.clone();
        let parent = SubscriptionHandle::spawn(self.paths.games.to_string(), stream, move |result| {
            parent_tx.send(ReactorEvent::Games(result)).is_ok()
        });

        let reactor = Reactor {
            store: self.store.clone(),
            lookup: self.lookup.clone(),
            paths: self.paths.clone(),
            principal: Some(self.identity.principal()),
            events_tx,
            mirror_tx: self.mirror_tx.clone(),
            errors_tx: self.errors_tx.clone(),
            games: Vec::new(),
            tree: SubscriptionTree::new(),
        };

        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(reactor.run(events_rx, parent, shutdown_rx));
        self.running = Some(RunningReactor { shutdown, task });

        crate::log_sync_info!(
            "Subscribed to '{}' ordered by '{}'",
            self.paths.games,
            self.order.field
        );
        Ok(())
    }

    /// Stop mirroring and release every subscription.
    ///
    /// Returns once the reactor has terminated; the mirror keeps its last
    /// published state and receives no further updates.
    pub async fn unsubscribe(&mut self) {
        let Some(running) = self.running.take() else {
            return;
        };
        let _ = running.shutdown.send(());
        if let Err(e) = running.task.await {
            crate::log_sync_error!("Synchronizer task ended abnormally: {}", e);
        }
    }

    /// Whether the reactor is running; false after a games stream failure
    pub fn is_subscribed(&self) -> bool {
        self.running
            .as_ref()
            .map(|running| !running.task.is_finished())
            .unwrap_or(false)
    }

    pub fn mirror(&self) -> watch::Receiver<Arc<GameMirror>> {
        self.mirror_tx.subscribe()
    }

    /// The latest published mirror
    pub fn snapshot(&self) -> Arc<GameMirror> {
        self.mirror_tx.borrow().clone()
    }

    /// Failures of subscriptions and profile lookups
    pub fn errors(&self) -> broadcast::Receiver<SyncError> {
        self.errors_tx.subscribe()
    }
}

impl Drop for GameSynchronizer {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.task.abort();
        }
    }
}
