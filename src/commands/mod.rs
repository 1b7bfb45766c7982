//! Handlers for requests arriving from the UI.
//!
//! Each handler answers exactly one request. Filesystem work runs on the
//! blocking pool so that independent requests proceed concurrently.
//! `getNotes`, `readNote` and `writeNote` surface their error message; every
//! other handler logs the failure and answers with `false`.

pub mod export;
pub mod notes;
pub mod trash;

use std::sync::Arc;

use log::warn;

use crate::error::{Result, StoreError};
use crate::host::Host;
use crate::paths::NotePaths;
use crate::repository::NoteRepository;
use crate::trash::TrashManager;

pub use export::*;
pub use notes::*;
pub use trash::*;

/// Everything a handler needs, cheap to clone into a blocking task.
#[derive(Clone)]
pub struct AppState {
    pub repository: NoteRepository,
    pub trash: TrashManager,
    pub host: Arc<dyn Host>,
}

impl AppState {
    pub fn new(paths: NotePaths, host: Arc<dyn Host>) -> Self {
        Self {
            repository: NoteRepository::new(paths.clone()),
            trash: TrashManager::new(paths),
            host,
        }
    }
}

/// Runs filesystem work off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
}

/// Logs a failed operation and drops the reason.
pub(crate) fn logged<T>(operation: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            warn!("{} failed: {}", operation, err);
            None
        }
    }
}
