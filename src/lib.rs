//! # partysync
//!
//! Live mirror of a game night party held in a remote hierarchical document
//! store. Games are mirrored together with the votes and installed-by
//! markers stored under each of them, and kept current through snapshots
//! pushed by the store.
//!
//! ## Core Components
//!
//! * `sync` - The live collection synchronizer and its subscription tree
//! * `mutations` - Writes on games, votes and installed markers
//! * `status` - Pause state and current game mirrors of the party status
//! * `users` - User directory, admin toggles and profile cache
//! * `session` - Signed-in principal and profile shared by all components
//! * `store` - The document store interface and an in-memory implementation
//! * `config` - TOML configuration with environment overrides
//! * `logging` - Feature-targeted logging on `log` and `env_logger`
//!
//! ## Architecture
//!
//! Mutations write to the store and never touch a mirror directly. The store
//! pushes snapshots to the open subscriptions, each pumped by a forwarder
//! task into the owning mirror, which publishes an immutable view on a
//! `watch` channel for readers.

pub mod logging;

pub mod config;
pub mod constants;
pub mod error;
pub mod model;
pub mod mutations;
pub mod session;
pub mod status;
pub mod store;
pub mod sync;
pub mod users;

// Re-export main types for convenience
pub use config::{ProfileLookupMode, SyncConfig};
pub use error::{AuthorizationError, SyncError, SyncResult};
pub use model::{Game, NewGame, PartyStatus, Principal, ProfileRef, UserProfile};
pub use mutations::GameMutations;
pub use session::{IdentityProvider, SessionContext};
pub use status::{CurrentGame, GameTitle, PauseMirror, PauseState, StatusMirror};
#[cfg(any(test, feature = "mock"))]
pub use store::InMemoryDocumentStore;
pub use store::{DocumentStore, StoreError, StoreResult};
pub use sync::{GameMirror, GameSynchronizer, ProfileLookup, UserScan};
pub use users::UserDirectory;
