//! Registry of the per-game child subscriptions
//!
//! Each game owns one subscription per [`ChildKind`]. Entries carry a
//! generation number so that notifications queued by a released forwarder
//! can be told apart from those of its replacement, and a lookup sequence so
//! that only the newest profile lookup of an entry is applied.

use crate::store::SubscriptionHandle;
use std::collections::HashMap;
use std::fmt;

/// The two sub-collections mirrored under every game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    Votes,
    InstalledBy,
}

impl ChildKind {
    pub const ALL: [ChildKind; 2] = [ChildKind::Votes, ChildKind::InstalledBy];
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChildKind::Votes => write!(f, "votes"),
            ChildKind::InstalledBy => write!(f, "installed-by"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChildKey {
    pub game_id: String,
    pub kind: ChildKind,
}

impl ChildKey {
    pub fn new(game_id: &str, kind: ChildKind) -> Self {
        Self {
            game_id: game_id.to_string(),
            kind,
        }
    }
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.game_id, self.kind)
    }
}

#[derive(Debug)]
struct ChildEntry {
    generation: u64,
    handle: SubscriptionHandle,
    lookup_seq: u64,
}

#[derive(Debug, Default)]
pub struct SubscriptionTree {
    entries: HashMap<ChildKey, ChildEntry>,
    next_generation: u64,
}

impl SubscriptionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the generation for a subscription about to be opened
    pub fn next_generation(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Register a freshly opened subscription.
    ///
    /// Callers release the previous entry before opening the stream; an entry
    /// still present here is released first all the same.
    pub fn insert(&mut self, key: ChildKey, generation: u64, handle: SubscriptionHandle) {
        let entry = ChildEntry {
            generation,
            handle,
            lookup_seq: 0,
        };
        if let Some(previous) = self.entries.insert(key, entry) {
            previous.handle.release();
        }
    }

    /// Release the subscription of `key`, if any
    pub fn release(&mut self, key: &ChildKey) -> bool {
        match self.entries.remove(key) {
            Some(entry) => {
                entry.handle.release();
                true
            }
            None => false,
        }
    }

    /// Release both subscriptions of a game
    pub fn release_game(&mut self, game_id: &str) {
        for kind in ChildKind::ALL {
            self.release(&ChildKey::new(game_id, kind));
        }
    }

    pub fn release_all(&mut self) {
        for (_, entry) in self.entries.drain() {
            entry.handle.release();
        }
    }

    /// Whether a notification of `generation` belongs to the live entry
    pub fn is_current(&self, key: &ChildKey, generation: u64) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.generation == generation)
            .unwrap_or(false)
    }

    /// Start a profile lookup for `key`, superseding any lookup in flight.
    ///
    /// Returns the generation and sequence the result must be tagged with.
    pub fn begin_lookup(&mut self, key: &ChildKey) -> Option<(u64, u64)> {
        self.entries.get_mut(key).map(|entry| {
            entry.lookup_seq += 1;
            (entry.generation, entry.lookup_seq)
        })
    }

    /// Whether a lookup result is still the newest for the live entry
    pub fn is_latest_lookup(&self, key: &ChildKey, generation: u64, seq: u64) -> bool {
        self.entries
            .get(key)
            .map(|entry| entry.generation == generation && entry.lookup_seq == seq)
            .unwrap_or(false)
    }

    pub fn contains(&self, key: &ChildKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<ChildKey> {
        self.entries.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use futures::StreamExt;

    fn idle_handle(label: &str) -> SubscriptionHandle {
        let pending = stream::pending::<crate::store::StoreResult<()>>().boxed();
        SubscriptionHandle::spawn(label, pending, |_| true)
    }

    #[tokio::test]
    async fn test_generation_tracks_replacement() {
        let mut tree = SubscriptionTree::new();
        let key = ChildKey::new("g1", ChildKind::Votes);

        let first = tree.next_generation();
        tree.insert(key.clone(), first, idle_handle("g1/votes"));
        assert!(tree.is_current(&key, first));

        tree.release(&key);
        let second = tree.next_generation();
        tree.insert(key.clone(), second, idle_handle("g1/votes"));

        assert!(!tree.is_current(&key, first));
        assert!(tree.is_current(&key, second));
        assert_eq!(tree.len(), 1);
    }

    #[tokio::test]
    async fn test_newer_lookup_supersedes_older() {
        let mut tree = SubscriptionTree::new();
        let key = ChildKey::new("g1", ChildKind::InstalledBy);
        let generation = tree.next_generation();
        tree.insert(key.clone(), generation, idle_handle("g1/installedBy"));

        let (gen_a, seq_a) = tree.begin_lookup(&key).unwrap();
        let (gen_b, seq_b) = tree.begin_lookup(&key).unwrap();

        assert!(!tree.is_latest_lookup(&key, gen_a, seq_a));
        assert!(tree.is_latest_lookup(&key, gen_b, seq_b));
    }

    #[tokio::test]
    async fn test_release_game_drops_both_kinds() {
        let mut tree = SubscriptionTree::new();
        for kind in ChildKind::ALL {
            let generation = tree.next_generation();
            tree.insert(ChildKey::new("g1", kind), generation, idle_handle("g1"));
        }
        let generation = tree.next_generation();
        tree.insert(
            ChildKey::new("g2", ChildKind::Votes),
            generation,
            idle_handle("g2"),
        );

        tree.release_game("g1");
        assert_eq!(tree.keys(), vec![ChildKey::new("g2", ChildKind::Votes)]);
        assert!(tree.begin_lookup(&ChildKey::new("g1", ChildKind::Votes)).is_none());
    }
}
