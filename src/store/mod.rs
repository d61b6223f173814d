//! # Document Store Client
//!
//! The generic surface of the remote hierarchical document store: push
//! subscriptions on collections and documents, one-shot reads, writes and
//! deletes. Nothing in this crate depends on a particular backend; the
//! [`memory`] module provides an in-process implementation.

pub mod error;
#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod path;
pub mod snapshot;
pub mod subscription;

pub use error::{StoreError, StoreResult};
#[cfg(any(test, feature = "mock"))]
pub use memory::InMemoryDocumentStore;
pub use path::{CollectionPath, DocumentPath};
pub use snapshot::{
    server_timestamp, timestamp_value, CollectionSnapshot, Document, DocumentData,
    DocumentSnapshot, FieldValue, JsonMap, QueryOrder, SortDirection,
};
pub use subscription::SubscriptionHandle;

use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of snapshots pushed by a subscription.
///
/// The first item is the state at subscription time, every further item the
/// full state after a change. Dropping the stream cancels the subscription.
pub type SnapshotStream<T> = BoxStream<'static, StoreResult<T>>;

/// Remote document store consumed by the mirrors and the mutation API
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribe to a collection, optionally ordered by a field
    async fn subscribe_collection(
        &self,
        path: &CollectionPath,
        order: Option<&QueryOrder>,
    ) -> StoreResult<SnapshotStream<CollectionSnapshot>>;

    /// Subscribe to a single document, absent documents included
    async fn subscribe_document(
        &self,
        path: &DocumentPath,
    ) -> StoreResult<SnapshotStream<DocumentSnapshot>>;

    /// Read the current content of a collection once
    async fn read_collection_once(&self, path: &CollectionPath) -> StoreResult<CollectionSnapshot>;

    /// Read a document once; the snapshot reports whether it exists
    async fn read_document_once(&self, path: &DocumentPath) -> StoreResult<DocumentSnapshot>;

    /// Write a document, replacing it or merging into the existing fields
    async fn write_document(
        &self,
        path: &DocumentPath,
        data: DocumentData,
        merge: bool,
    ) -> StoreResult<()>;

    /// Delete a document; deleting an absent document succeeds
    async fn delete_document(&self, path: &DocumentPath) -> StoreResult<()>;

    /// Sentinel resolved to the commit time by the store
    fn server_timestamp(&self) -> FieldValue {
        server_timestamp()
    }
}
