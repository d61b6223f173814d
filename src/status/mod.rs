//! # Party Status Mirrors
//!
//! Two independent subscribers on the party status singleton: the pause
//! state and the game currently being played. Each holds one subscription,
//! released on `unsubscribe` or drop, and exposes the admin writes that
//! change the fields it mirrors.

pub mod current_game;
pub mod pause;

pub use current_game::{CurrentGame, GameTitle, StatusMirror};
pub use pause::{PauseMirror, PauseState};

use crate::error::SyncResult;
use crate::session::SessionContext;
use crate::store::{DocumentData, DocumentPath, DocumentStore};

const ERROR_CHANNEL_CAPACITY: usize = 16;

/// Merge `data` into the status document, stamping `updatedAt`
async fn write_status(
    store: &dyn DocumentStore,
    session: &SessionContext,
    path: &DocumentPath,
    data: DocumentData,
) -> SyncResult<()> {
    let admin = session.require_admin()?;
    let data = data.with_server_timestamp("updatedAt");
    store.write_document(path, data, true).await?;
    crate::log_status_info!("'{}' updated party status", admin.uid);
    Ok(())
}
