use log::info;

use crate::commands::{blocking, logged, AppState};
use crate::models::{NoteExt, NoteKey, TrashEntry};

/// Moves a note to the trash.
pub async fn trash_note(state: &AppState, title: String, ext: NoteExt) -> bool {
    let trash = state.trash.clone();
    logged(
        "trashNote",
        blocking(move || trash.trash(&NoteKey::new(title, ext))).await,
    )
    .is_some()
}

/// Lists trashed notes, unsorted.
pub async fn get_trash(state: &AppState) -> Result<Vec<TrashEntry>, String> {
    let trash = state.trash.clone();
    blocking(move || trash.list())
        .await
        .map_err(|e| e.to_string())
}

/// Moves a trashed note back; `false` if an active note has the same name.
pub async fn restore_note(state: &AppState, title: String, ext: NoteExt) -> bool {
    let trash = state.trash.clone();
    logged(
        "restoreNote",
        blocking(move || trash.restore(&NoteKey::new(title, ext))).await,
    )
    .is_some()
}

pub async fn empty_trash(state: &AppState) -> bool {
    let trash = state.trash.clone();
    logged("emptyTrash", blocking(move || trash.empty()).await).is_some()
}

/// Removes trash entries older than `retention_days`. Returns how many were
/// purged, or `None` if the trash could not be listed.
pub async fn purge_expired_trash(state: &AppState, retention_days: u32) -> Option<usize> {
    let trash = state.trash.clone();
    let report = logged(
        "purgeTrash",
        blocking(move || trash.purge_expired(retention_days)).await,
    )?;
    info!(
        "Trash purge finished: {} removed, {} failed",
        report.purged.len(),
        report.failed
    );
    Some(report.purged.len())
}
