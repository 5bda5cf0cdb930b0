//! Client bootstrap over a persistent session.
//!
//! One interactive login writes the SQLite session file; every later run
//! connects straight from it. The sender pool runner is detached here and
//! lives for the whole process.

use crate::domain::DomainError;
use grammers_client::{Client, SenderPool};
use grammers_session::storages::SqliteSession;
use std::path::Path;
use std::sync::Arc;

/// Open the session file at `path` (creating parent directories), start the
/// sender pool and hand back a connected client.
pub async fn connect(api_id: i32, path: impl AsRef<Path>) -> Result<Client, DomainError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DomainError::Transport(format!("create session directory: {}", e)))?;
    }
    let session = SqliteSession::open(path)
        .await
        .map_err(|e| DomainError::Transport(format!("open session file: {}", e)))?;

    let pool = SenderPool::new(Arc::new(session), api_id);
    let handle = pool.handle.clone();
    tokio::spawn(async move {
        pool.runner.run().await;
    });
    Ok(Client::new(handle))
}
