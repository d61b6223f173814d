//! Records stored in the party document store and the mirrored game entry

pub mod game;
pub mod party;
pub mod user;

pub use game::{Game, GameRecord, InstalledMarker, NewGame, VoteMarker};
pub use party::PartyStatus;
pub use user::{Principal, ProfileRef, UserProfile};
