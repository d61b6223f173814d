//! Ownership of live store subscriptions
//!
//! Every snapshot stream is pumped by a forwarder task owned by a
//! [`SubscriptionHandle`]. Releasing or dropping the handle aborts the task,
//! which drops the stream and closes the subscription at the store.

use super::error::StoreResult;
use super::SnapshotStream;
use futures::StreamExt;
use tokio::task::JoinHandle;

/// Owner of one live subscription
#[derive(Debug)]
pub struct SubscriptionHandle {
    label: String,
    task: Option<JoinHandle<()>>,
}

impl SubscriptionHandle {
    /// Start pumping `stream` into `on_item`.
    ///
    /// The forwarder stops when `on_item` returns `false`, after the first
    /// error item, or when the store ends the stream.
    pub fn spawn<T, F>(label: impl Into<String>, mut stream: SnapshotStream<T>, mut on_item: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(StoreResult<T>) -> bool + Send + 'static,
    {
        let label = label.into();
        let task_label = label.clone();
        let task = tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                let failed = item.is_err();
                if !on_item(item) || failed {
                    break;
                }
            }
            crate::log_store_debug!("Subscription '{}' forwarder finished", task_label);
        });

        Self {
            label,
            task: Some(task),
        }
    }

    /// Name of the subscribed path, for logs
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether the forwarder is still running
    pub fn is_active(&self) -> bool {
        self.task.as_ref().map(|t| !t.is_finished()).unwrap_or(false)
    }

    /// Release the subscription; the forwarder is cancelled at its next
    /// suspension point and its stream dropped.
    pub fn release(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            crate::log_store_debug!("Released subscription '{}'", self.label);
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.abort();
    }
}
