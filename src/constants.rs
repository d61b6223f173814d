/// Default names of the collections and documents in the party store.
///
/// Used by [`SyncConfig`](crate::config::SyncConfig) when the configuration
/// file leaves them out.
pub const DEFAULT_GAMES_COLLECTION: &str = "games";
pub const DEFAULT_VOTES_COLLECTION: &str = "votes";
pub const DEFAULT_INSTALLED_BY_COLLECTION: &str = "installedBy";
pub const DEFAULT_USERS_COLLECTION: &str = "users";
pub const DEFAULT_PARTY_STATUS_COLLECTION: &str = "partyStatus";
pub const DEFAULT_PARTY_STATUS_DOCUMENT: &str = "current";

/// Default sort keys of the mirrored collections
pub const DEFAULT_GAMES_ORDER_FIELD: &str = "title";
pub const DEFAULT_USERS_ORDER_FIELD: &str = "createdAt";
