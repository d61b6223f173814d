//! Resolution of voter and installer ids into user profiles

use crate::error::SyncResult;
use crate::model::{ProfileRef, UserProfile};
use crate::store::{CollectionPath, CollectionSnapshot, DocumentStore};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;

/// Looks up the profiles of a list of user ids
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    /// Profiles of `ids` in the same order; ids without a profile are dropped
    async fn lookup(&self, ids: &[String]) -> SyncResult<Vec<ProfileRef>>;

    /// Ticks whenever previously returned profiles may have gone stale
    fn invalidations(&self) -> Option<watch::Receiver<u64>> {
        None
    }
}

/// Reads the whole users collection for every lookup
pub struct UserScan {
    store: Arc<dyn DocumentStore>,
    users: CollectionPath,
}

impl UserScan {
    pub fn new(store: Arc<dyn DocumentStore>, users: CollectionPath) -> Self {
        Self { store, users }
    }
}

#[async_trait]
impl ProfileLookup for UserScan {
    async fn lookup(&self, ids: &[String]) -> SyncResult<Vec<ProfileRef>> {
        let snapshot = self.store.read_collection_once(&self.users).await?;
        Ok(resolve_profiles(ids, &decode_users(&snapshot)))
    }
}

/// Decode every user document, skipping the ones that do not parse
pub fn decode_users(snapshot: &CollectionSnapshot) -> Vec<ProfileRef> {
    snapshot
        .docs
        .iter()
        .filter_map(|doc| match doc.decode::<UserProfile>() {
            Ok(profile) => Some(ProfileRef {
                id: doc.id.clone(),
                profile,
            }),
            Err(e) => {
                crate::log_users_warn!("Skipping undecodable user '{}': {}", doc.id, e);
                None
            }
        })
        .collect()
}

/// Pick the profiles of `ids` out of `users`, keeping the order of `ids`
pub fn resolve_profiles(ids: &[String], users: &[ProfileRef]) -> Vec<ProfileRef> {
    let by_id: HashMap<&str, &ProfileRef> = users.iter().map(|u| (u.id.as_str(), u)).collect();
    ids.iter()
        .filter_map(|id| by_id.get(id.as_str()).map(|profile| (*profile).clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DocumentData, InMemoryDocumentStore};

    fn profile(id: &str, name: &str) -> ProfileRef {
        ProfileRef {
            id: id.to_string(),
            profile: UserProfile::new(name),
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_resolve_keeps_id_order_and_drops_unknown() {
        let users = vec![profile("u1", "alice"), profile("u2", "bob")];
        let resolved = resolve_profiles(&ids(&["u2", "ghost", "u1"]), &users);

        let names: Vec<&str> = resolved
            .iter()
            .map(|p| p.profile.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["bob", "alice"]);
    }

    #[tokio::test]
    async fn test_user_scan_reads_users_collection() {
        let store = InMemoryDocumentStore::new();
        let users = CollectionPath::root("users");
        store
            .write_document(
                &users.doc("u1").unwrap(),
                DocumentData::new().with("displayName", "alice"),
                false,
            )
            .await
            .unwrap();

        let scan = UserScan::new(Arc::new(store.clone()), users);
        let resolved = scan.lookup(&ids(&["u1", "u2"])).await.unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "u1");
        assert!(scan.invalidations().is_none());
    }
}
