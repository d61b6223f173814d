use super::write_status;
use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::model::PartyStatus;
use crate::session::SessionContext;
use crate::store::{timestamp_value, DocumentData, DocumentPath, DocumentStore, SubscriptionHandle};
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};

/// Whether the party is on a break
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PauseState {
    pub pause_end: Option<DateTime<Utc>>,
    /// Set whenever a pause end is recorded, even one in the past
    pub is_paused: bool,
}

impl PauseState {
    pub fn from_status(status: Option<&PartyStatus>) -> Self {
        let pause_end = status.and_then(|status| status.pause_end);
        Self {
            pause_end,
            is_paused: pause_end.is_some(),
        }
    }

    /// Time left until the pause ends, zero once it has passed
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.pause_end
            .map(|end| std::cmp::max(end - now, Duration::zero()))
    }
}

pub struct PauseMirror {
    store: Arc<dyn DocumentStore>,
    session: SessionContext,
    path: DocumentPath,
    state_tx: Arc<watch::Sender<PauseState>>,
    errors_tx: broadcast::Sender<SyncError>,
    handle: Option<SubscriptionHandle>,
}

impl PauseMirror {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        session: SessionContext,
        config: &SyncConfig,
    ) -> SyncResult<Self> {
        let (state_tx, _) = watch::channel(PauseState::default());
        let (errors_tx, _) = broadcast::channel(super::ERROR_CHANNEL_CAPACITY);
        Ok(Self {
            store,
            session,
            path: config.party_status_path()?,
            state_tx: Arc::new(state_tx),
            errors_tx,
            handle: None,
        })
    }

    pub async fn subscribe(&mut self) -> SyncResult<()> {
        self.unsubscribe();

        let stream = self.store.subscribe_document(&self.path).await?;
        let state_tx = self.state_tx.clone();
        let errors_tx = self.errors_tx.clone();
        self.handle = Some(SubscriptionHandle::spawn(
            self.path.to_string(),
            stream,
            move |result| {
                match result.map(|snapshot| snapshot.decode::<PartyStatus>()) {
                    Ok(Ok(status)) => {
                        let state = PauseState::from_status(status.as_ref());
                        crate::log_status_debug!("Pause state: {:?}", state);
                        state_tx.send_replace(state);
                    }
                    Ok(Err(e)) => {
                        crate::log_status_warn!("Ignoring party status: {}", e);
                        let _ = errors_tx.send(SyncError::Store(e));
                    }
                    Err(e) => {
                        crate::log_status_error!("Pause subscription failed: {}", e);
                        let _ = errors_tx.send(SyncError::Store(e));
                    }
                }
                true
            },
        ));
        Ok(())
    }

    pub fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.release();
        }
    }

    /// Whether the subscription is still delivering; false after a stream
    /// failure, with the last state kept
    pub fn is_subscribed(&self) -> bool {
        self.handle.as_ref().map(|h| h.is_active()).unwrap_or(false)
    }

    /// Subscription and decode failures
    pub fn errors(&self) -> broadcast::Receiver<SyncError> {
        self.errors_tx.subscribe()
    }

    pub fn state(&self) -> PauseState {
        *self.state_tx.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<PauseState> {
        self.state_tx.subscribe()
    }

    /// Pause the party until `end`
    pub async fn set_pause_end(&self, end: DateTime<Utc>) -> SyncResult<()> {
        let data = DocumentData::new().with("pauseEnd", timestamp_value(end));
        write_status(&*self.store, &self.session, &self.path, data).await
    }

    pub async fn clear_pause(&self) -> SyncResult<()> {
        let data = DocumentData::new().with("pauseEnd", Value::Null);
        write_status(&*self.store, &self.session, &self.path, data).await
    }
}
