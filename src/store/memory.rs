//! In-memory document store
//!
//! Keeps documents in a path keyed `BTreeMap` and pushes a fresh snapshot to
//! every affected subscriber after each write or delete. Faults can be
//! injected per path to exercise the error paths of the mirrors and the
//! mutation API.

use super::error::{StoreError, StoreResult};
use super::path::{CollectionPath, DocumentPath};
use super::snapshot::{
    CollectionSnapshot, Document, DocumentData, DocumentSnapshot, JsonMap, QueryOrder,
    SortDirection,
};
use super::{DocumentStore, SnapshotStream};
use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

type CollectionSender = mpsc::UnboundedSender<StoreResult<CollectionSnapshot>>;
type DocumentSender = mpsc::UnboundedSender<StoreResult<DocumentSnapshot>>;

enum Watcher {
    Collection {
        id: u64,
        path: CollectionPath,
        order: Option<QueryOrder>,
        sender: CollectionSender,
    },
    Document {
        id: u64,
        path: DocumentPath,
        sender: DocumentSender,
    },
}

impl Watcher {
    fn id(&self) -> u64 {
        match self {
            Watcher::Collection { id, .. } | Watcher::Document { id, .. } => *id,
        }
    }

    fn path(&self) -> &str {
        match self {
            Watcher::Collection { path, .. } => path.as_str(),
            Watcher::Document { path, .. } => path.as_str(),
        }
    }

    fn is_closed(&self) -> bool {
        match self {
            Watcher::Collection { sender, .. } => sender.is_closed(),
            Watcher::Document { sender, .. } => sender.is_closed(),
        }
    }
}

#[derive(Default)]
struct Faults {
    writes: HashSet<String>,
    deletes: HashSet<String>,
    reads: HashSet<String>,
    subscriptions: HashSet<String>,
}

#[derive(Default)]
struct MemoryState {
    documents: BTreeMap<String, JsonMap>,
    watchers: Vec<Watcher>,
    next_watcher_id: u64,
    faults: Faults,
    read_delay: Option<Duration>,
}

impl MemoryState {
    fn collection_snapshot(&self, path: &CollectionPath, order: Option<&QueryOrder>) -> CollectionSnapshot {
        let prefix = format!("{}/", path.as_str());
        let mut docs: Vec<Document> = self
            .documents
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(&prefix))
            .filter_map(|(key, data)| {
                let id = &key[prefix.len()..];
                // Deeper paths belong to sub-collections
                if id.contains('/') {
                    None
                } else {
                    Some(Document::new(id, data.clone()))
                }
            })
            .collect();

        if let Some(order) = order {
            docs.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.field), b.get(&order.field))
                    .then_with(|| a.id.cmp(&b.id));
                match order.direction {
                    SortDirection::Ascending => ordering,
                    SortDirection::Descending => ordering.reverse(),
                }
            });
        }

        CollectionSnapshot {
            path: path.clone(),
            docs,
        }
    }

    fn document_snapshot(&self, path: &DocumentPath) -> DocumentSnapshot {
        DocumentSnapshot {
            path: path.clone(),
            data: self.documents.get(path.as_str()).cloned(),
        }
    }

    /// Push the new state of `changed` to the watchers it affects
    fn notify(&mut self, changed: &DocumentPath) {
        let parent = changed.parent();
        for watcher in &self.watchers {
            match watcher {
                Watcher::Collection {
                    path, order, sender, ..
                } if *path == parent => {
                    let _ = sender.send(Ok(self.collection_snapshot(path, order.as_ref())));
                }
                Watcher::Document { path, sender, .. } if path == changed => {
                    let _ = sender.send(Ok(self.document_snapshot(path)));
                }
                _ => {}
            }
        }
        self.prune();
    }

    fn prune(&mut self) {
        self.watchers.retain(|w| !w.is_closed());
    }

    fn next_id(&mut self) -> u64 {
        self.next_watcher_id += 1;
        self.next_watcher_id
    }
}

/// Order JSON values: absent < null < bool < number < string < other
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

fn denied(path: &str) -> StoreError {
    StoreError::PermissionDenied {
        path: path.to_string(),
    }
}

/// In-process [`DocumentStore`]; clones share the same data
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    inner: Arc<Mutex<MemoryState>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of open subscriptions on a collection or document path
    pub fn subscriber_count(&self, path: &str) -> usize {
        self.subscriber_ids(path).len()
    }

    /// Ids of the open subscriptions on a path, in creation order
    pub fn subscriber_ids(&self, path: &str) -> Vec<u64> {
        let state = self.state();
        state
            .watchers
            .iter()
            .filter(|w| w.path() == path && !w.is_closed())
            .map(|w| w.id())
            .collect()
    }

    /// Total number of open subscriptions
    pub fn total_subscribers(&self) -> usize {
        let state = self.state();
        state.watchers.iter().filter(|w| !w.is_closed()).count()
    }

    /// Whether a document currently exists
    pub fn contains(&self, path: &str) -> bool {
        self.state().documents.contains_key(path)
    }

    /// Reject writes to `path` with a permission error
    pub fn fail_writes_at(&self, path: &str) {
        self.state().faults.writes.insert(path.to_string());
    }

    /// Reject deletes of `path` with a permission error
    pub fn fail_deletes_at(&self, path: &str) {
        self.state().faults.deletes.insert(path.to_string());
    }

    /// Reject one-shot reads of `path` with a permission error
    pub fn fail_reads_at(&self, path: &str) {
        self.state().faults.reads.insert(path.to_string());
    }

    /// Reject new subscriptions on `path` with a permission error
    pub fn fail_subscriptions_at(&self, path: &str) {
        self.state().faults.subscriptions.insert(path.to_string());
    }

    pub fn clear_faults(&self) {
        self.state().faults = Faults::default();
    }

    /// Delay every one-shot read, to keep lookups in flight
    pub fn set_read_delay(&self, delay: Option<Duration>) {
        self.state().read_delay = delay;
    }

    /// Deliver `error` to every open subscription on `path`, ending them
    pub fn break_subscriptions(&self, path: &str, error: StoreError) {
        let mut state = self.state();
        for watcher in state.watchers.iter().filter(|w| w.path() == path) {
            match watcher {
                Watcher::Collection { sender, .. } => {
                    let _ = sender.send(Err(error.clone()));
                }
                Watcher::Document { sender, .. } => {
                    let _ = sender.send(Err(error.clone()));
                }
            }
        }
        state.watchers.retain(|w| w.path() != path);
        crate::log_store_debug!("Broke subscriptions on '{}': {}", path, error);
    }

    async fn delay_read(&self) {
        let delay = self.state().read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn subscribe_collection(
        &self,
        path: &CollectionPath,
        order: Option<&QueryOrder>,
    ) -> StoreResult<SnapshotStream<CollectionSnapshot>> {
        let mut state = self.state();
        if state.faults.subscriptions.contains(path.as_str()) {
            return Err(denied(path.as_str()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(Ok(state.collection_snapshot(path, order)));

        let id = state.next_id();
        state.prune();
        state.watchers.push(Watcher::Collection {
            id,
            path: path.clone(),
            order: order.cloned(),
            sender,
        });
        crate::log_store_debug!("Subscription {} opened on collection '{}'", id, path);

        Ok(UnboundedReceiverStream::new(receiver).boxed())
    }

    async fn subscribe_document(
        &self,
        path: &DocumentPath,
    ) -> StoreResult<SnapshotStream<DocumentSnapshot>> {
        let mut state = self.state();
        if state.faults.subscriptions.contains(path.as_str()) {
            return Err(denied(path.as_str()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let _ = sender.send(Ok(state.document_snapshot(path)));

        let id = state.next_id();
        state.prune();
        state.watchers.push(Watcher::Document {
            id,
            path: path.clone(),
            sender,
        });
        crate::log_store_debug!("Subscription {} opened on document '{}'", id, path);

        Ok(UnboundedReceiverStream::new(receiver).boxed())
    }

    async fn read_collection_once(&self, path: &CollectionPath) -> StoreResult<CollectionSnapshot> {
        self.delay_read().await;
        let state = self.state();
        if state.faults.reads.contains(path.as_str()) {
            return Err(denied(path.as_str()));
        }
        Ok(state.collection_snapshot(path, None))
    }

    async fn read_document_once(&self, path: &DocumentPath) -> StoreResult<DocumentSnapshot> {
        self.delay_read().await;
        let state = self.state();
        if state.faults.reads.contains(path.as_str()) {
            return Err(denied(path.as_str()));
        }
        Ok(state.document_snapshot(path))
    }

    async fn write_document(
        &self,
        path: &DocumentPath,
        data: DocumentData,
        merge: bool,
    ) -> StoreResult<()> {
        let mut state = self.state();
        if state.faults.writes.contains(path.as_str()) {
            return Err(denied(path.as_str()));
        }

        let fields = data.resolve(Utc::now());
        let document = state
            .documents
            .entry(path.as_str().to_string())
            .or_default();
        if merge {
            document.extend(fields);
        } else {
            *document = fields;
        }

        state.notify(path);
        Ok(())
    }

    async fn delete_document(&self, path: &DocumentPath) -> StoreResult<()> {
        let mut state = self.state();
        if state.faults.deletes.contains(path.as_str()) {
            return Err(denied(path.as_str()));
        }

        if state.documents.remove(path.as_str()).is_some() {
            state.notify(path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn games() -> CollectionPath {
        CollectionPath::root("games")
    }

    async fn add_game(store: &InMemoryDocumentStore, id: &str, title: &str) {
        store
            .write_document(
                &games().doc(id).unwrap(),
                DocumentData::new().with("title", title),
                false,
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_collection_subscription_receives_ordered_snapshots() {
        let store = InMemoryDocumentStore::new();
        add_game(&store, "b", "Zelda").await;

        let mut stream = store
            .subscribe_collection(&games(), Some(&QueryOrder::asc("title")))
            .await
            .unwrap();
        let initial = stream.next().await.unwrap().unwrap();
        assert_eq!(initial.ids(), vec!["b"]);

        add_game(&store, "a", "Among Us").await;
        let updated = stream.next().await.unwrap().unwrap();
        assert_eq!(updated.ids(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_sub_collection_documents_are_not_listed_in_parent() {
        let store = InMemoryDocumentStore::new();
        add_game(&store, "g1", "Quake").await;
        let vote = games().doc("g1").unwrap().collection("votes").doc("u1").unwrap();
        store
            .write_document(&vote, DocumentData::new().with("userId", "u1"), false)
            .await
            .unwrap();

        let snapshot = store.read_collection_once(&games()).await.unwrap();
        assert_eq!(snapshot.ids(), vec!["g1"]);
        let votes = store
            .read_collection_once(&games().doc("g1").unwrap().collection("votes"))
            .await
            .unwrap();
        assert_eq!(votes.ids(), vec!["u1"]);
    }

    #[tokio::test]
    async fn test_merge_write_keeps_existing_fields() {
        let store = InMemoryDocumentStore::new();
        let path = DocumentPath::parse("partyStatus/current").unwrap();
        store
            .write_document(&path, DocumentData::new().with("currentGameId", "g1"), false)
            .await
            .unwrap();
        store
            .write_document(&path, DocumentData::new().with("pauseEnd", Value::Null), true)
            .await
            .unwrap();

        let snapshot = store.read_document_once(&path).await.unwrap();
        assert_eq!(snapshot.get("currentGameId"), Some(&json!("g1")));
        assert_eq!(snapshot.get("pauseEnd"), Some(&Value::Null));
    }

    #[tokio::test]
    async fn test_dropping_stream_closes_subscription() {
        let store = InMemoryDocumentStore::new();
        let stream = store.subscribe_collection(&games(), None).await.unwrap();
        assert_eq!(store.subscriber_count("games"), 1);

        drop(stream);
        assert_eq!(store.subscriber_count("games"), 0);
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = InMemoryDocumentStore::new();
        let path = games().doc("g1").unwrap();
        store.fail_deletes_at(path.as_str());
        store.fail_subscriptions_at("games");

        assert!(matches!(
            store.delete_document(&path).await,
            Err(StoreError::PermissionDenied { .. })
        ));
        assert!(store.subscribe_collection(&games(), None).await.is_err());

        store.clear_faults();
        assert!(store.delete_document(&path).await.is_ok());
    }

    #[tokio::test]
    async fn test_document_subscription_sees_absent_then_created() {
        let store = InMemoryDocumentStore::new();
        let path = DocumentPath::parse("partyStatus/current").unwrap();
        let mut stream = store.subscribe_document(&path).await.unwrap();

        assert!(!stream.next().await.unwrap().unwrap().exists());
        store
            .write_document(&path, DocumentData::new().with("pauseEnd", Value::Null), false)
            .await
            .unwrap();
        assert!(stream.next().await.unwrap().unwrap().exists());
    }
}
