use super::write_status;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::model::{GameRecord, PartyStatus};
use crate::session::SessionContext;
use crate::store::{
    CollectionPath, DocumentData, DocumentPath, DocumentSnapshot, DocumentStore,
    StoreResult, SubscriptionHandle,
};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{broadcast, watch};

/// Display title of the current game
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GameTitle {
    /// No game selected
    #[default]
    None,
    /// The selected game does not exist
    Unknown,
    Known(String),
}

impl fmt::Display for GameTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameTitle::None => write!(f, "(none)"),
            GameTitle::Unknown => write!(f, "(unknown)"),
            GameTitle::Known(title) => write!(f, "{}", title),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CurrentGame {
    pub game_id: Option<String>,
    pub title: GameTitle,
}

/// Resolves titles and publishes only the newest resolution
struct TitleResolver {
    store: Arc<dyn DocumentStore>,
    games: CollectionPath,
    latest: Mutex<u64>,
    current_tx: watch::Sender<CurrentGame>,
    errors_tx: broadcast::Sender<SyncError>,
}

impl TitleResolver {
    fn begin(&self) -> u64 {
        let mut latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        *latest += 1;
        *latest
    }

    fn publish(&self, seq: u64, current: CurrentGame) {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if *latest == seq {
            crate::log_status_debug!("Current game: {:?} ({})", current.game_id, current.title);
            self.current_tx.send_replace(current);
        } else {
            crate::log_status_debug!("Discarding superseded title for {:?}", current.game_id);
        }
    }

    /// Report a failed resolution; the published state is left as it was
    fn fail(&self, seq: u64, game_id: &str, error: SyncError) {
        let latest = self.latest.lock().unwrap_or_else(PoisonError::into_inner);
        if *latest == seq {
            crate::log_status_warn!("Cannot resolve title of '{}': {}", game_id, error);
            self.report(error);
        }
    }

    fn report(&self, error: SyncError) {
        // No receivers is fine
        let _ = self.errors_tx.send(error);
    }

    fn on_status(self: &Arc<Self>, snapshot: DocumentSnapshot) {
        let game_id = match snapshot.decode::<PartyStatus>() {
            Ok(status) => status
                .and_then(|status| status.current_game_id)
                .filter(|game_id| !game_id.is_empty()),
            Err(e) => {
                crate::log_status_warn!("Ignoring party status: {}", e);
                self.report(SyncError::Store(e));
                return;
            }
        };

        let seq = self.begin();
        match game_id {
            None => self.publish(seq, CurrentGame::default()),
            Some(game_id) => {
                let resolver = self.clone();
                tokio::spawn(async move {
                    match resolver.title_of(&game_id).await {
                        Ok(title) => resolver.publish(
                            seq,
                            CurrentGame {
                                game_id: Some(game_id),
                                title,
                            },
                        ),
                        Err(e) => resolver.fail(seq, &game_id, SyncError::Store(e)),
                    }
                });
            }
        }
    }

    /// `Unknown` only when the game document is absent
    async fn title_of(&self, game_id: &str) -> StoreResult<GameTitle> {
        let path = self.games.doc(game_id)?;
        let record: Option<GameRecord> = self.store.read_document_once(&path).await?.decode()?;
        Ok(match record {
            Some(record) => GameTitle::Known(record.title),
            None => GameTitle::Unknown,
        })
    }
}

pub struct StatusMirror {
    store: Arc<dyn DocumentStore>,
    session: SessionContext,
    path: DocumentPath,
    resolver: Arc<TitleResolver>,
    handle: Option<SubscriptionHandle>,
}

impl StatusMirror {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        session: SessionContext,
        config: &SyncConfig,
    ) -> SyncResult<Self> {
        let (current_tx, _) = watch::channel(CurrentGame::default());
        let (errors_tx, _) = broadcast::channel(super::ERROR_CHANNEL_CAPACITY);
        let resolver = Arc::new(TitleResolver {
            store: store.clone(),
            games: config.games_path(),
            latest: Mutex::new(0),
            current_tx,
            errors_tx,
        });

        Ok(Self {
            store,
            session,
            path: config.party_status_path()?,
            resolver,
            handle: None,
        })
    }

    pub async fn subscribe(&mut self) -> SyncResult<()> {
        self.unsubscribe();

        let stream = self.store.subscribe_document(&self.path).await?;
        let resolver = self.resolver.clone();
        self.handle = Some(SubscriptionHandle::spawn(
            self.path.to_string(),
            stream,
            move |result| {
                match result {
                    Ok(snapshot) => resolver.on_status(snapshot),
                    Err(e) => {
                        crate::log_status_error!("Status subscription failed: {}", e);
                        resolver.report(SyncError::Store(e));
                    }
                }
                true
            },
        ));
        Ok(())
    }

    /// Release the subscription and drop any title still being resolved
    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.release();
            self.resolver.begin();
        }
    }

    /// Whether the subscription is still delivering
    pub fn is_subscribed(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_active()).unwrap_or(false)
    }

    /// Subscription failures and failed title reads
    pub fn errors(&self) -> broadcast::Receiver<SyncError> {
        self.resolver.errors_tx.subscribe()
    }

    pub fn current(&self) -> CurrentGame {
        self.resolver.current_tx.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<CurrentGame> {
        self.resolver.current_tx.subscribe()
    }

    /// Select the game being played, or clear the selection
    pub async fn set_current_game(&self, game_id: Option<&str>) -> SyncResult<()> {
        let data = DocumentData::new().with("currentGameId", game_id);
        write_status(&*self.store, &self.session, &self.path, data).await
    }
}

impl Drop for StatusMirror {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_placeholders() {
        assert_eq!(GameTitle::None.to_string(), "(none)");
        assert_eq!(GameTitle::Unknown.to_string(), "(unknown)");
        assert_eq!(GameTitle::Known("Doom".to_string()).to_string(), "Doom");
        assert_eq!(CurrentGame::default().title, GameTitle::None);
    }
}
