//! UI-side state container.
//!
//! [`NotesClient`] owns the [`NoteIndex`] and the pin preferences. It only
//! changes them after the store has confirmed an operation, and always by
//! swapping in a new snapshot.

use std::sync::Arc;

use chrono::Utc;
use log::warn;

use crate::config::ConfigManager;
use crate::index::{sort_trash, NoteIndex};
use crate::models::{LastNote, NoteKey, NoteRecord, ThemeMode, TrashEntry};
use crate::service::{Request, Response, ServiceHandle};

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

fn flag(response: crate::error::Result<Response>) -> bool {
    match response {
        Ok(Response::Flag(value)) => value,
        Ok(other) => {
            warn!("Unexpected response {:?}", other);
            false
        }
        Err(err) => {
            warn!("Request failed: {}", err);
            false
        }
    }
}

fn created(response: crate::error::Result<Response>) -> Option<NoteKey> {
    match response {
        Ok(Response::Created(key)) => Some(key),
        Ok(_) => None,
        Err(err) => {
            warn!("Request failed: {}", err);
            None
        }
    }
}

pub struct NotesClient {
    service: ServiceHandle,
    config: Arc<ConfigManager>,
    index: NoteIndex,
}

impl NotesClient {
    pub fn new(service: ServiceHandle, config: Arc<ConfigManager>) -> Self {
        let index = NoteIndex::new(config.pinned_notes());
        Self {
            service,
            config,
            index,
        }
    }

    pub fn index(&self) -> &NoteIndex {
        &self.index
    }

    /// Reloads the listing from the store.
    pub async fn load(&mut self) -> Result<(), String> {
        match self.service.call(Request::GetNotes).await {
            Ok(Response::Notes(notes)) => {
                self.index.replace_notes(notes);
                Ok(())
            }
            Ok(Response::Failed { error }) => Err(error),
            Ok(other) => Err(format!("Unexpected response {:?}", other)),
            Err(err) => Err(err.to_string()),
        }
    }

    /// Prompts for a new note; on success it is listed first and selected.
    pub async fn create(&mut self) -> bool {
        let response = self.service.call(Request::CreateNote).await;
        self.apply_created(created(response))
    }

    pub async fn create_untitled(&mut self) -> bool {
        let response = self.service.call(Request::CreateUntitledNote).await;
        self.apply_created(created(response))
    }

    fn apply_created(&mut self, key: Option<NoteKey>) -> bool {
        let Some(key) = key else {
            return false;
        };
        self.index.apply_created(&key, now_millis());
        self.remember(Some(&key));
        true
    }

    /// Moves a note to the trash; defaults to the selected note.
    pub async fn trash(&mut self, target: Option<NoteKey>) -> bool {
        let Some(key) = target.or_else(|| self.selected_key()) else {
            return false;
        };
        let request = Request::TrashNote {
            title: key.title.clone(),
            ext: key.ext,
        };
        if !flag(self.service.call(request).await) {
            return false;
        }
        self.index.apply_removed(&key);
        true
    }

    /// Deletes a note for good, bypassing the trash.
    pub async fn delete_permanently(&mut self, key: NoteKey) -> bool {
        let request = Request::DeleteNote {
            title: key.title.clone(),
            ext: key.ext,
        };
        if !flag(self.service.call(request).await) {
            return false;
        }
        self.index.apply_removed(&key);
        true
    }

    /// Saves new content for the selected note.
    pub async fn update_selected(&mut self, content: String) -> Result<bool, String> {
        let Some(key) = self.selected_key() else {
            return Ok(false);
        };
        let request = Request::WriteNote {
            title: key.title.clone(),
            ext: key.ext,
            content,
        };
        match self.service.call(request).await {
            Ok(Response::Ack) => {
                self.index.apply_written(&key, now_millis());
                Ok(true)
            }
            Ok(Response::Failed { error }) => Err(error),
            Ok(other) => Err(format!("Unexpected response {:?}", other)),
            Err(err) => Err(err.to_string()),
        }
    }

    /// Content of the selected note, read from disk.
    pub async fn selected_content(&self) -> Result<Option<String>, String> {
        let Some(key) = self.selected_key() else {
            return Ok(None);
        };
        let request = Request::ReadNote {
            title: key.title,
            ext: key.ext,
        };
        match self.service.call(request).await {
            Ok(Response::Content(content)) => Ok(Some(content)),
            Ok(Response::Failed { error }) => Err(error),
            Ok(other) => Err(format!("Unexpected response {:?}", other)),
            Err(err) => Err(err.to_string()),
        }
    }

    /// Renames a listed note, keeping its extension. Pins follow the rename.
    pub async fn rename(&mut self, key: &NoteKey, new_title: &str) -> bool {
        if !self.index.snapshot().iter().any(|n| n.is(&key.title, key.ext)) {
            return false;
        }
        let request = Request::RenameNote {
            old_title: key.title.clone(),
            new_title: new_title.to_string(),
            ext: key.ext,
        };
        if !flag(self.service.call(request).await) {
            return false;
        }
        if self.index.apply_renamed(&key.title, new_title, key.ext, now_millis()) {
            self.persist_pins().await;
        }
        true
    }

    /// Flips the pin on a title and persists the pin set.
    pub async fn toggle_pin(&mut self, title: &str) -> bool {
        let pinned = self.index.toggle_pin(title);
        self.persist_pins().await;
        pinned
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.index.set_query(query);
    }

    pub fn select(&mut self, index: Option<usize>) {
        self.index.select(index);
        let key = self.selected_key();
        self.remember(key.as_ref());
    }

    pub fn selected_note(&self) -> Option<NoteRecord> {
        self.index.selected_note()
    }

    /// Trash contents, most recently deleted first.
    pub async fn trash_listing(&self) -> Result<Vec<TrashEntry>, String> {
        match self.service.call(Request::GetTrash).await {
            Ok(Response::Trash(entries)) => Ok(sort_trash(entries)),
            Ok(Response::Failed { error }) => Err(error),
            Ok(other) => Err(format!("Unexpected response {:?}", other)),
            Err(err) => Err(err.to_string()),
        }
    }

    /// Restores a trashed note and reloads the listing.
    pub async fn restore(&mut self, key: NoteKey) -> bool {
        let request = Request::RestoreNote {
            title: key.title,
            ext: key.ext,
        };
        if !flag(self.service.call(request).await) {
            return false;
        }
        if let Err(err) = self.load().await {
            warn!("Reload after restore failed: {}", err);
        }
        true
    }

    pub async fn empty_trash(&self) -> bool {
        flag(self.service.call(Request::EmptyTrash).await)
    }

    pub async fn export_pdf(&self) -> bool {
        flag(self.service.call(Request::ExportPdf).await)
    }

    pub fn theme(&self) -> ThemeMode {
        self.config.theme()
    }

    pub async fn set_theme(&self, theme: ThemeMode) {
        self.config.set_theme(theme);
        self.config.schedule_save().await;
    }

    fn selected_key(&self) -> Option<NoteKey> {
        self.index.selected_note().map(|n| n.key())
    }

    fn remember(&self, key: Option<&NoteKey>) {
        self.config.set_last_note(key.map(|k| LastNote {
            title: k.title.clone(),
            ext: k.ext,
        }));
    }

    async fn persist_pins(&self) {
        self.config.set_pinned_notes(self.index.pinned().to_vec());
        self.config.schedule_save().await;
    }
}
