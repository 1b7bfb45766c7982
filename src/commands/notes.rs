use crate::commands::{blocking, logged, AppState};
use crate::models::{CreateOutcome, NoteExt, NoteKey, NoteRecord};

/// Lists all notes in the root, bootstrapping the welcome note on first run.
pub async fn get_notes(state: &AppState) -> Result<Vec<NoteRecord>, String> {
    let repository = state.repository.clone();
    blocking(move || repository.list())
        .await
        .map_err(|e| e.to_string())
}

/// Reads the content of a note.
pub async fn read_note(state: &AppState, title: String, ext: NoteExt) -> Result<String, String> {
    let repository = state.repository.clone();
    blocking(move || repository.read(&NoteKey::new(title, ext)))
        .await
        .map_err(|e| e.to_string())
}

/// Saves content to a note, creating the file if needed.
pub async fn write_note(
    state: &AppState,
    title: String,
    ext: NoteExt,
    content: String,
) -> Result<(), String> {
    let repository = state.repository.clone();
    blocking(move || repository.write(&NoteKey::new(title, ext), &content))
        .await
        .map_err(|e| e.to_string())
}

/// Prompts for a location and creates an empty note there.
///
/// `None` covers cancellation, a refused location and I/O failure alike.
pub async fn create_note(state: &AppState) -> Option<NoteKey> {
    let repository = state.repository.clone();
    let host = state.host.clone();
    match logged("createNote", blocking(move || repository.create(host.as_ref())).await)? {
        CreateOutcome::Created(key) => Some(key),
        CreateOutcome::Cancelled | CreateOutcome::Rejected(_) => None,
    }
}

/// Creates the next free `Untitled` note without prompting.
pub async fn create_untitled_note(state: &AppState) -> Option<NoteKey> {
    let repository = state.repository.clone();
    logged(
        "createUntitledNote",
        blocking(move || repository.create_untitled()).await,
    )
}

/// Permanently deletes a note.
pub async fn delete_note(state: &AppState, title: String, ext: NoteExt) -> bool {
    let repository = state.repository.clone();
    logged(
        "deleteNote",
        blocking(move || repository.remove(&NoteKey::new(title, ext))).await,
    )
    .is_some()
}

/// Renames a note; `false` when the new name is taken or the move fails.
pub async fn rename_note(
    state: &AppState,
    old_title: String,
    new_title: String,
    ext: NoteExt,
) -> bool {
    let repository = state.repository.clone();
    logged(
        "renameNote",
        blocking(move || repository.rename(&old_title, &new_title, ext)).await,
    )
    .is_some()
}
