//! The synchronizer's event loop
//!
//! All store notifications, profile lookup results, principal changes and
//! directory invalidations are funnelled into one task and applied in
//! arrival order. The reactor is the only writer of the mirror.

use super::mirror::{membership, GameMirror};
use super::profiles::ProfileLookup;
use super::tree::{ChildKey, ChildKind, SubscriptionTree};
use crate::error::{SyncError, SyncResult};
use crate::model::{Game, GameRecord, Principal, ProfileRef};
use crate::store::{
    CollectionPath, CollectionSnapshot, DocumentStore, StoreResult, SubscriptionHandle,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

pub(crate) enum ReactorEvent {
    Games(StoreResult<CollectionSnapshot>),
    Child {
        key: ChildKey,
        generation: u64,
        result: StoreResult<CollectionSnapshot>,
    },
    Profiles {
        key: ChildKey,
        generation: u64,
        seq: u64,
        result: SyncResult<Vec<ProfileRef>>,
    },
}

/// Where the child collections of a game live
#[derive(Debug, Clone)]
pub(crate) struct ChildPaths {
    pub games: CollectionPath,
    pub votes: String,
    pub installed_by: String,
}

impl ChildPaths {
    fn collection(&self, key: &ChildKey) -> StoreResult<CollectionPath> {
        let game = self.games.doc(&key.game_id)?;
        Ok(match key.kind {
            ChildKind::Votes => game.collection(&self.votes),
            ChildKind::InstalledBy => game.collection(&self.installed_by),
        })
    }
}

pub(crate) struct Reactor {
    pub store: Arc<dyn DocumentStore>,
    pub lookup: Arc<dyn ProfileLookup>,
    pub paths: ChildPaths,
    pub principal: Option<watch::Receiver<Option<Principal>>>,
    pub events_tx: mpsc::UnboundedSender<ReactorEvent>,
    pub mirror_tx: Arc<watch::Sender<Arc<GameMirror>>>,
    pub errors_tx: broadcast::Sender<SyncError>,
    pub games: Vec<Game>,
    pub tree: SubscriptionTree,
}

impl Reactor {
    pub async fn run(
        mut self,
        mut events_rx: mpsc::UnboundedReceiver<ReactorEvent>,
        parent: SubscriptionHandle,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut invalidations = self.lookup.invalidations();

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                event = events_rx.recv() => match event {
                    Some(event) => {
                        if !self.handle(event).await {
                            break;
                        }
                    }
                    None => break,
                },
                changed = changed(&mut self.principal) => {
                    if !changed {
                        crate::log_sync_warn!("Identity provider closed, treating session as signed out");
                        self.principal = None;
                    }
                    self.publish();
                }
                changed = changed(&mut invalidations) => {
                    if changed {
                        self.refresh_profiles();
                    } else {
                        invalidations = None;
                    }
                }
            }
        }

        parent.release();
        let released = self.tree.len();
        self.tree.release_all();
        crate::log_sync_info!("Synchronizer stopped, released {} child subscriptions", released);
    }

    /// Apply one event; `false` stops the reactor
    async fn handle(&mut self, event: ReactorEvent) -> bool {
        match event {
            ReactorEvent::Games(Ok(snapshot)) => {
                self.apply_games(snapshot).await;
                true
            }
            ReactorEvent::Games(Err(e)) => {
                crate::log_sync_error!("Games subscription failed: {}", e);
                self.report(SyncError::Store(e));
                false
            }
            ReactorEvent::Child {
                key,
                generation,
                result,
            } => {
                if !self.tree.is_current(&key, generation) {
                    crate::log_sync_debug!("Discarding stale {} notification", key);
                    return true;
                }
                match result {
                    Ok(snapshot) => self.apply_child(key, snapshot),
                    Err(e) => {
                        crate::log_sync_warn!("Subscription {} failed: {}", key, e);
                        self.tree.release(&key);
                        self.report(SyncError::Store(e));
                    }
                }
                true
            }
            ReactorEvent::Profiles {
                key,
                generation,
                seq,
                result,
            } => {
                if !self.tree.is_latest_lookup(&key, generation, seq) {
                    crate::log_sync_debug!("Discarding superseded profile lookup for {}", key);
                    return true;
                }
                match result {
                    Ok(profiles) => self.apply_profiles(&key, profiles),
                    Err(e) => {
                        crate::log_sync_warn!("Profile lookup for {} failed: {}", key, e);
                        self.report(e);
                    }
                }
                true
            }
        }
    }

    async fn apply_games(&mut self, snapshot: CollectionSnapshot) {
        let mut previous: HashMap<String, Game> = self
            .games
            .drain(..)
            .map(|game| (game.id.clone(), game))
            .collect();

        let mut games = Vec::with_capacity(snapshot.len());
        let mut added = Vec::new();
        for doc in &snapshot.docs {
            let record: GameRecord = doc.decode().unwrap_or_else(|e| {
                crate::log_sync_warn!("Game '{}' mirrored with default fields: {}", doc.id, e);
                GameRecord::default()
            });
            match previous.remove(&doc.id) {
                Some(mut game) => {
                    game.apply_record(record);
                    games.push(game);
                }
                None => {
                    added.push(doc.id.clone());
                    games.push(Game::from_record(&doc.id, record));
                }
            }
        }

        for vanished in previous.keys() {
            crate::log_sync_debug!("Game '{}' left the collection", vanished);
            self.tree.release_game(vanished);
        }
        self.games = games;

        for game_id in &added {
            for kind in ChildKind::ALL {
                self.open_child(ChildKey::new(game_id, kind)).await;
            }
        }

        crate::log_sync_debug!(
            "Games snapshot applied: {} games, {} new, {} removed",
            self.games.len(),
            added.len(),
            previous.len()
        );
        self.publish();
    }

    async fn open_child(&mut self, key: ChildKey) {
        if self.tree.release(&key) {
            crate::log_sync_debug!("Released stale subscription {}", key);
        }

        let path = match self.paths.collection(&key) {
            Ok(path) => path,
            Err(e) => {
                crate::log_sync_warn!("Cannot subscribe to {}: {}", key, e);
                self.report(SyncError::Store(e));
                return;
            }
        };

        let stream = match self.store.subscribe_collection(&path, None).await {
            Ok(stream) => stream,
            Err(e) => {
                crate::log_sync_warn!("Subscription to '{}' could not be established: {}", path, e);
                self.report(SyncError::Store(e));
                return;
            }
        };

        let generation = self.tree.next_generation();
        let events_tx = self.events_tx.clone();
        let forwarded_key = key.clone();
        let handle = SubscriptionHandle::spawn(path.to_string(), stream, move |result| {
            events_tx
                .send(ReactorEvent::Child {
                    key: forwarded_key.clone(),
                    generation,
                    result,
                })
                .is_ok()
        });
        self.tree.insert(key, generation, handle);
    }

    fn apply_child(&mut self, key: ChildKey, snapshot: CollectionSnapshot) {
        let ids = snapshot.ids();
        let Some(game) = self.games.iter_mut().find(|game| game.id == key.game_id) else {
            return;
        };

        match key.kind {
            ChildKind::Votes => {
                game.votes_count = ids.len();
                game.voter_ids = ids.clone();
                if ids.is_empty() {
                    game.voter_profiles.clear();
                }
            }
            ChildKind::InstalledBy => {
                game.installer_ids = ids.clone();
                if ids.is_empty() {
                    game.installer_profiles.clear();
                }
            }
        }

        if ids.is_empty() {
            // Supersede any lookup still in flight
            self.tree.begin_lookup(&key);
        } else {
            self.spawn_lookup(key, ids);
        }
        self.publish();
    }

    fn apply_profiles(&mut self, key: &ChildKey, profiles: Vec<ProfileRef>) {
        let Some(game) = self.games.iter_mut().find(|game| game.id == key.game_id) else {
            return;
        };
        match key.kind {
            ChildKind::Votes => game.voter_profiles = profiles,
            ChildKind::InstalledBy => game.installer_profiles = profiles,
        }
        self.publish();
    }

    fn spawn_lookup(&mut self, key: ChildKey, ids: Vec<String>) {
        let Some((generation, seq)) = self.tree.begin_lookup(&key) else {
            return;
        };
        let lookup = self.lookup.clone();
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = lookup.lookup(&ids).await;
            let _ = events_tx.send(ReactorEvent::Profiles {
                key,
                generation,
                seq,
                result,
            });
        });
    }

    /// Re-resolve every non-empty profile list
    fn refresh_profiles(&mut self) {
        let mut pending = Vec::new();
        for game in &self.games {
            for kind in ChildKind::ALL {
                let ids = match kind {
                    ChildKind::Votes => &game.voter_ids,
                    ChildKind::InstalledBy => &game.installer_ids,
                };
                if !ids.is_empty() {
                    pending.push((ChildKey::new(&game.id, kind), ids.clone()));
                }
            }
        }
        crate::log_sync_debug!("Profiles invalidated, refreshing {} lists", pending.len());
        for (key, ids) in pending {
            self.spawn_lookup(key, ids);
        }
    }

    fn report(&self, error: SyncError) {
        // No receivers is fine
        let _ = self.errors_tx.send(error);
    }

    fn publish(&self) {
        let principal = self
            .principal
            .as_ref()
            .and_then(|receiver| receiver.borrow().as_ref().map(|p| p.uid.clone()));
        let mirror = GameMirror {
            installed_game_ids: membership(&self.games, principal.as_deref()),
            games: self.games.clone(),
        };
        self.mirror_tx.send_replace(Arc::new(mirror));
    }
}

/// Wait for the next change; pends forever without a receiver
async fn changed<T>(receiver: &mut Option<watch::Receiver<T>>) -> bool {
    match receiver {
        Some(receiver) => receiver.changed().await.is_ok(),
        None => futures::future::pending().await,
    }
}
