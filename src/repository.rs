use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::host::{FileFilter, Host, SaveDialogOptions};
use crate::models::{CreateOutcome, NoteExt, NoteKey, NoteRecord};
use crate::paths::{ensure_directly_in, NotePaths};

/// Title of the note synthesized when the root holds no notes.
pub const WELCOME_TITLE: &str = "Welcome";
/// Bundled first-run content.
pub const WELCOME_CONTENT: &str = include_str!("../resources/welcome.md");
/// Stem used for generated note names.
pub const UNTITLED_TITLE: &str = "Untitled";

/// Last-modified time of a file in epoch milliseconds.
pub(crate) fn modified_millis(path: &Path) -> Result<i64> {
    let modified = fs::metadata(path)
        .and_then(|meta| meta.modified())
        .map_err(|e| StoreError::io(path, e))?;
    Ok(DateTime::<Utc>::from(modified).timestamp_millis())
}

/// Note files that live directly in `dir`, as `(title, ext)` pairs.
pub(crate) fn note_files_in(dir: &Path) -> Result<Vec<NoteKey>> {
    let entries = fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))?;

    let mut keys = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let is_file = entry.file_type().map(|t| t.is_file()).unwrap_or(false);
        if !is_file {
            continue;
        }
        let file_name = entry.file_name();
        let Some(file_name) = file_name.to_str() else {
            debug!("Skipping non UTF-8 file name in {}", dir.display());
            continue;
        };
        if let Some((title, ext)) = NoteExt::split_file_name(file_name) {
            keys.push(NoteKey::new(title, ext));
        }
    }
    Ok(keys)
}

/// Active notes stored as flat files in the notes root.
#[derive(Debug, Clone)]
pub struct NoteRepository {
    paths: NotePaths,
}

impl NoteRepository {
    pub fn new(paths: NotePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &NotePaths {
        &self.paths
    }

    /// Lists every `.md`/`.txt` file in the root with its modification time.
    ///
    /// A store with no notes, active or trashed, gets a `Welcome.md` note
    /// copied from the bundled template before listing.
    pub fn list(&self) -> Result<Vec<NoteRecord>> {
        self.paths.ensure_root()?;

        let mut keys = note_files_in(self.paths.root_dir())?;
        if keys.is_empty() && !self.has_trashed_notes()? {
            let welcome = NoteKey::new(WELCOME_TITLE, NoteExt::Markdown);
            self.write(&welcome, WELCOME_CONTENT)?;
            info!("Created welcome note in {}", self.paths.root_dir().display());
            keys.push(welcome);
        }

        keys.into_iter()
            .map(|key| {
                let path = self.paths.root_dir().join(key.file_name());
                Ok(NoteRecord {
                    last_edit_time: modified_millis(&path)?,
                    title: key.title,
                    ext: key.ext,
                })
            })
            .collect()
    }

    pub fn read(&self, key: &NoteKey) -> Result<String> {
        let path = self.paths.note_path(key)?;
        fs::read_to_string(&path).map_err(|e| StoreError::io(path, e))
    }

    /// Overwrites or creates the note file with `content`.
    pub fn write(&self, key: &NoteKey, content: &str) -> Result<()> {
        let path = self.paths.note_path(key)?;
        debug!("Writing note {}", path.display());
        fs::write(&path, content).map_err(|e| StoreError::io(path, e))
    }

    /// Asks the host for a destination and creates an empty note there.
    ///
    /// Anything other than a recognized note file directly inside the root
    /// is refused with an error dialog and reported as `Rejected`.
    pub fn create(&self, host: &dyn Host) -> Result<CreateOutcome> {
        self.paths.ensure_root()?;

        let options = SaveDialogOptions {
            title: "New Note",
            default_path: self
                .paths
                .root_dir()
                .join(format!("{}{}", UNTITLED_TITLE, NoteExt::Markdown)),
            button_label: "Create",
            filters: vec![
                FileFilter {
                    name: "Markdown",
                    extensions: &["md"],
                },
                FileFilter {
                    name: "Text",
                    extensions: &["txt"],
                },
            ],
        };

        let Some(chosen) = host.show_save_dialog(&options) else {
            info!("Note creation cancelled");
            return Ok(CreateOutcome::Cancelled);
        };

        let key = match self.accept_location(&chosen) {
            Ok(key) => key,
            Err(err) => {
                warn!("Refused note location {}: {}", chosen.display(), err);
                let message = err.to_string();
                host.show_error("Creation failed", &message);
                return Ok(CreateOutcome::Rejected(message));
            }
        };

        match self.create_empty(&key) {
            Ok(()) => Ok(CreateOutcome::Created(key)),
            Err(err @ StoreError::Collision { .. }) => {
                let message = err.to_string();
                host.show_error("Creation failed", &message);
                Ok(CreateOutcome::Rejected(message))
            }
            Err(err) => Err(err),
        }
    }

    /// Creates an empty `Untitled.md`, or `Untitled 2.md`, `Untitled 3.md`, ...
    /// picking the first free name.
    pub fn create_untitled(&self) -> Result<NoteKey> {
        self.paths.ensure_root()?;

        let mut suffix = 1u32;
        loop {
            let title = if suffix == 1 {
                UNTITLED_TITLE.to_string()
            } else {
                format!("{} {}", UNTITLED_TITLE, suffix)
            };
            let key = NoteKey::new(title, NoteExt::Markdown);
            match self.create_empty(&key) {
                Ok(()) => return Ok(key),
                Err(StoreError::Collision { .. }) => suffix += 1,
                Err(err) => return Err(err),
            }
        }
    }

    /// Permanently deletes a note. A note that is already gone counts as
    /// deleted.
    pub fn remove(&self, key: &NoteKey) -> Result<()> {
        let path = self.paths.note_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                info!("Deleted note {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Delete of missing note {} treated as done", path.display());
                Ok(())
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    /// Renames a note within the root, keeping its extension.
    ///
    /// Fails with `Collision` and touches nothing when the new name is taken.
    pub fn rename(&self, old_title: &str, new_title: &str, ext: NoteExt) -> Result<()> {
        let from = self.paths.note_path(&NoteKey::new(old_title, ext))?;
        let to = self.paths.note_path(&NoteKey::new(new_title, ext))?;

        if exists(&to)? {
            return Err(StoreError::Collision { path: to });
        }
        if !exists(&from)? {
            return Err(StoreError::NotFound { path: from });
        }

        fs::rename(&from, &to).map_err(|e| StoreError::io(&from, e))?;
        info!("Renamed note {} -> {}", from.display(), to.display());
        Ok(())
    }

    fn has_trashed_notes(&self) -> Result<bool> {
        let trash_dir = self.paths.trash_dir();
        if !exists(trash_dir)? {
            return Ok(false);
        }
        Ok(!note_files_in(trash_dir)?.is_empty())
    }

    fn accept_location(&self, chosen: &Path) -> Result<NoteKey> {
        let file_name = chosen
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| StoreError::InvalidName {
                name: chosen.display().to_string(),
                reason: "not a file name".to_string(),
            })?;

        let (title, ext) = match NoteExt::split_file_name(file_name) {
            Some(parts) => parts,
            None => {
                let ext = Path::new(file_name)
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default();
                return Err(StoreError::UnsupportedExtension { ext });
            }
        };

        ensure_directly_in(self.paths.root_dir(), chosen)?;
        let key = NoteKey::new(title, ext);
        self.paths.note_path(&key)?;
        Ok(key)
    }

    fn create_empty(&self, key: &NoteKey) -> Result<()> {
        let path = self.paths.note_path(key)?;
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(_) => {
                info!("Created note {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                Err(StoreError::Collision { path })
            }
            Err(e) => Err(StoreError::io(path, e)),
        }
    }
}

fn exists(path: &Path) -> Result<bool> {
    path.try_exists().map_err(|e| StoreError::io(path, e))
}
