//! # Session Context
//!
//! The identity of the signed-in user, shared explicitly with every
//! component instead of living in a global. Credentials are handled
//! elsewhere; this module only holds the resulting principal and profile and
//! pushes their changes on `watch` channels.

use crate::error::{AuthorizationError, SyncResult};
use crate::model::{Principal, UserProfile};
use crate::store::{CollectionPath, DocumentStore, DocumentSnapshot, SnapshotStream, StoreResult};
use futures::StreamExt;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};

/// Source of the current principal and profile
pub trait IdentityProvider: Send + Sync {
    /// Receiver of the signed-in principal, `None` when signed out
    fn principal(&self) -> watch::Receiver<Option<Principal>>;

    /// Receiver of the signed-in user's profile
    fn profile(&self) -> watch::Receiver<Option<UserProfile>>;
}

struct SessionInner {
    principal: watch::Sender<Option<Principal>>,
    profile: watch::Sender<Option<UserProfile>>,
    follower: Mutex<Option<AbortHandle>>,
}

/// Shared session state; clones observe the same session
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<SessionInner>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    /// Start a signed-out session
    pub fn new() -> Self {
        let (principal, _) = watch::channel(None);
        let (profile, _) = watch::channel(None);
        Self {
            inner: Arc::new(SessionInner {
                principal,
                profile,
                follower: Mutex::new(None),
            }),
        }
    }

    pub fn sign_in(&self, principal: Principal) {
        crate::log_session_info!("Signed in as '{}'", principal.uid);
        self.inner.principal.send_replace(Some(principal));
    }

    pub fn set_profile(&self, profile: Option<UserProfile>) {
        self.inner.profile.send_replace(profile);
    }

    /// Clear the principal and the profile
    pub fn sign_out(&self) {
        if let Some(previous) = self.inner.principal.send_replace(None) {
            crate::log_session_info!("Signed out '{}'", previous.uid);
        }
        self.inner.profile.send_replace(None);
    }

    pub fn current_user(&self) -> Option<Principal> {
        self.inner.principal.borrow().clone()
    }

    pub fn current_profile(&self) -> Option<UserProfile> {
        self.inner.profile.borrow().clone()
    }

    /// The signed-in principal, or `NotSignedIn`
    pub fn require_principal(&self) -> SyncResult<Principal> {
        self.current_user()
            .ok_or_else(|| AuthorizationError::NotSignedIn.into())
    }

    /// The signed-in principal if its profile carries the admin flag
    pub fn require_admin(&self) -> SyncResult<Principal> {
        let principal = self.require_principal()?;
        match self.current_profile() {
            Some(profile) if profile.is_admin => Ok(principal),
            _ => Err(AuthorizationError::NotAdmin.into()),
        }
    }

    /// Keep the profile in sync with `users/{uid}` of the current principal.
    ///
    /// Replaces any previous follower. The profile becomes `None` while
    /// signed out or when the profile document does not exist.
    pub fn follow_profile(
        &self,
        store: Arc<dyn DocumentStore>,
        users: CollectionPath,
    ) -> ProfileFollower {
        let task = tokio::spawn(follow(self.inner.clone(), store, users));

        let mut slot = self
            .inner
            .follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.replace(task.abort_handle()) {
            previous.abort();
        }

        ProfileFollower { task }
    }

    /// Tear the session down: stop following the profile and sign out
    pub fn end(&self) {
        let follower = self
            .inner
            .follower
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(follower) = follower {
            follower.abort();
        }
        self.sign_out();
        crate::log_session_debug!("Session ended");
    }
}

impl IdentityProvider for SessionContext {
    fn principal(&self) -> watch::Receiver<Option<Principal>> {
        self.inner.principal.subscribe()
    }

    fn profile(&self) -> watch::Receiver<Option<UserProfile>> {
        self.inner.profile.subscribe()
    }
}

/// Running profile follower; stopped on drop
pub struct ProfileFollower {
    task: JoinHandle<()>,
}

impl ProfileFollower {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for ProfileFollower {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn follow(inner: Arc<SessionInner>, store: Arc<dyn DocumentStore>, users: CollectionPath) {
    let mut principal_rx = inner.principal.subscribe();

    loop {
        let principal = principal_rx.borrow_and_update().clone();
        let mut stream = match principal {
            Some(principal) => open_profile(&*store, &users, &principal).await,
            None => {
                inner.profile.send_replace(None);
                None
            }
        };

        loop {
            tokio::select! {
                changed = principal_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    break;
                }
                item = next_snapshot(&mut stream) => match item {
                    Some(Ok(snapshot)) => match snapshot.decode::<UserProfile>() {
                        Ok(profile) => {
                            inner.profile.send_replace(profile);
                        }
                        Err(e) => {
                            crate::log_session_warn!("Ignoring undecodable profile '{}': {}", snapshot.path, e);
                        }
                    },
                    Some(Err(e)) => {
                        crate::log_session_warn!("Profile subscription failed: {}", e);
                        stream = None;
                    }
                    None => stream = None,
                }
            }
        }
    }
}

async fn open_profile(
    store: &dyn DocumentStore,
    users: &CollectionPath,
    principal: &Principal,
) -> Option<SnapshotStream<DocumentSnapshot>> {
    let path = match users.doc(&principal.uid) {
        Ok(path) => path,
        Err(e) => {
            crate::log_session_warn!("Cannot follow profile of '{}': {}", principal.uid, e);
            return None;
        }
    };
    match store.subscribe_document(&path).await {
        Ok(stream) => Some(stream),
        Err(e) => {
            crate::log_session_warn!("Cannot follow profile '{}': {}", path, e);
            None
        }
    }
}

async fn next_snapshot(
    stream: &mut Option<SnapshotStream<DocumentSnapshot>>,
) -> Option<StoreResult<DocumentSnapshot>> {
    match stream {
        Some(stream) => stream.next().await,
        None => futures::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncError;

    fn admin_profile() -> UserProfile {
        UserProfile {
            is_admin: true,
            ..UserProfile::new("root")
        }
    }

    #[test]
    fn test_require_principal_when_signed_out() {
        let session = SessionContext::new();
        assert_eq!(
            session.require_principal(),
            Err(SyncError::Authorization(AuthorizationError::NotSignedIn))
        );
        assert_eq!(
            session.require_admin(),
            Err(SyncError::Authorization(AuthorizationError::NotSignedIn))
        );
    }

    #[test]
    fn test_require_admin_checks_profile_flag() {
        let session = SessionContext::new();
        session.sign_in(Principal::new("u1"));
        session.set_profile(Some(UserProfile::new("alice")));
        assert_eq!(
            session.require_admin(),
            Err(SyncError::Authorization(AuthorizationError::NotAdmin))
        );

        session.set_profile(Some(admin_profile()));
        assert_eq!(session.require_admin().unwrap().uid, "u1");
    }

    #[test]
    fn test_clones_share_state() {
        let session = SessionContext::new();
        let other = session.clone();
        let receiver = other.principal();

        session.sign_in(Principal::new("u2"));
        assert_eq!(other.current_user().unwrap().uid, "u2");
        assert!(receiver.has_changed().unwrap());

        other.sign_out();
        assert!(session.current_user().is_none());
        assert!(session.current_profile().is_none());
    }
}
