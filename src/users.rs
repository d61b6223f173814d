//! # User Directory
//!
//! Live mirror of the users collection, newest first, with the admin
//! toggles of the user management screen. The directory doubles as a
//! profile cache for the synchronizer: lookups are served from the mirror
//! once it has loaded, and every users snapshot invalidates the profiles
//! resolved so far.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::model::{ProfileRef, UserProfile};
use crate::session::SessionContext;
use crate::store::{
    CollectionPath, DocumentData, DocumentStore, QueryOrder, SubscriptionHandle,
};
use crate::sync::{decode_users, resolve_profiles, ProfileLookup, UserScan};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{broadcast, watch};

const ERROR_CHANNEL_CAPACITY: usize = 16;

/// Users in directory order; `None` until the first snapshot arrived
pub type UserList = Option<Arc<Vec<ProfileRef>>>;

pub struct UserDirectory {
    store: Arc<dyn DocumentStore>,
    session: SessionContext,
    path: CollectionPath,
    order: QueryOrder,
    fallback: UserScan,
    users_tx: Arc<watch::Sender<UserList>>,
    revision_tx: Arc<watch::Sender<u64>>,
    errors_tx: broadcast::Sender<SyncError>,
    handle: Mutex<Option<SubscriptionHandle>>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn DocumentStore>, session: SessionContext, config: &SyncConfig) -> Self {
        let (users_tx, _) = watch::channel(None);
        let (revision_tx, _) = watch::channel(0);
        let (errors_tx, _) = broadcast::channel(ERROR_CHANNEL_CAPACITY);
        let path = config.users_path();

        Self {
            fallback: UserScan::new(store.clone(), path.clone()),
            store,
            session,
            path,
            order: QueryOrder::desc(&config.sync.users_order_field),
            users_tx: Arc::new(users_tx),
            revision_tx: Arc::new(revision_tx),
            errors_tx,
            handle: Mutex::new(None),
        }
    }

    fn handle(&self) -> MutexGuard<'_, Option<SubscriptionHandle>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start mirroring the users collection, replacing any previous
    /// subscription
    pub async fn subscribe(&self) -> SyncResult<()> {
        if let Some(previous) = self.handle().take() {
            previous.release();
        }

        let stream = self
            .store
            .subscribe_collection(&self.path, Some(&self.order))
            .await?;

        let users_tx = self.users_tx.clone();
        let revision_tx = self.revision_tx.clone();
        let errors_tx = self.errors_tx.clone();
        let handle = SubscriptionHandle::spawn(self.path.to_string(), stream, move |result| {
            match result {
                Ok(snapshot) => {
                    let users = decode_users(&snapshot);
                    crate::log_users_debug!("User directory holds {} users", users.len());
                    users_tx.send_replace(Some(Arc::new(users)));
                    revision_tx.send_modify(|revision| *revision += 1);
                }
                Err(e) => {
                    crate::log_users_error!("User directory subscription failed: {}", e);
                    let _ = errors_tx.send(SyncError::Store(e));
                }
            }
            true
        });

        if let Some(previous) = self.handle().replace(handle) {
            previous.release();
        }
        crate::log_users_info!("Subscribed to user directory '{}'", self.path);
        Ok(())
    }

    /// Stop mirroring; lookups fall back to scanning the collection
    pub fn unsubscribe(&self) {
        if let Some(handle) = self.handle().take() {
            handle.release();
        }
        self.users_tx.send_replace(None);
    }

    pub fn is_subscribed(&self) -> bool {
        self.handle().as_ref().map(|h| h.is_active()).unwrap_or(false)
    }

    /// Subscription failures; the last listed users are kept
    pub fn errors(&self) -> broadcast::Receiver<SyncError> {
        self.errors_tx.subscribe()
    }

    pub fn users(&self) -> watch::Receiver<UserList> {
        self.users_tx.subscribe()
    }

    pub fn snapshot(&self) -> UserList {
        self.users_tx.borrow().clone()
    }

    /// Flip the approval flag of a user; returns the new value
    pub async fn toggle_approved(&self, user_id: &str) -> SyncResult<bool> {
        self.toggle(user_id, "approved", |profile| profile.approved)
            .await
    }

    /// Flip the admin flag of a user; returns the new value
    pub async fn toggle_admin(&self, user_id: &str) -> SyncResult<bool> {
        self.toggle(user_id, "isAdmin", |profile| profile.is_admin)
            .await
    }

    async fn toggle(
        &self,
        user_id: &str,
        field: &str,
        current: fn(&UserProfile) -> bool,
    ) -> SyncResult<bool> {
        let admin = self.session.require_admin()?;
        let path = self.path.doc(user_id)?;

        let snapshot = self.store.read_document_once(&path).await?;
        let profile: UserProfile = snapshot
            .decode()?
            .ok_or_else(|| SyncError::not_found("user", user_id))?;

        let value = !current(&profile);
        self.store
            .write_document(&path, DocumentData::new().with(field, value), true)
            .await?;

        crate::log_users_info!(
            "'{}' set {} = {} for user '{}'",
            admin.uid,
            field,
            value,
            user_id
        );
        Ok(value)
    }
}

#[async_trait]
impl ProfileLookup for UserDirectory {
    async fn lookup(&self, ids: &[String]) -> SyncResult<Vec<ProfileRef>> {
        match self.snapshot() {
            Some(users) => Ok(resolve_profiles(ids, &users)),
            None => self.fallback.lookup(ids).await,
        }
    }

    fn invalidations(&self) -> Option<watch::Receiver<u64>> {
        Some(self.revision_tx.subscribe())
    }
}
