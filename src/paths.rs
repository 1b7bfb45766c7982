use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StoreError};
use crate::models::NoteKey;

/// Name of the notes directory under the home directory.
pub const APP_DIR_NAME: &str = "JotPad";
/// Name of the trash directory inside the notes root.
pub const TRASH_DIR_NAME: &str = ".trash";
/// Environment variable overriding the notes root.
pub const ROOT_ENV_VAR: &str = "JOTPAD_ROOT";

/// Validates a note title so that `title + ext` names a file directly
/// inside a directory.
///
/// Rejects empty titles, the bare "." and ".." names, and titles containing:
/// - "/" (forward slash path separator)
/// - "\\" (backslash path separator)
/// - NUL
pub fn validate_title(title: &str) -> Result<()> {
    let invalid = |reason: &str| StoreError::InvalidName {
        name: title.to_string(),
        reason: reason.to_string(),
    };

    if title.trim().is_empty() {
        return Err(invalid("title is empty"));
    }
    if title == "." || title == ".." {
        return Err(invalid("reserved directory name"));
    }
    if title.contains('/') {
        return Err(invalid("contains invalid separator '/'"));
    }
    if title.contains('\\') {
        return Err(invalid("contains invalid separator '\\'"));
    }
    if title.contains('\0') {
        return Err(invalid("contains a NUL byte"));
    }
    Ok(())
}

/// Checks that `candidate` names an entry whose parent directory is exactly
/// `dir`, after resolving symlinks on both sides.
///
/// The candidate itself does not need to exist; its parent does.
pub fn ensure_directly_in(dir: &Path, candidate: &Path) -> Result<()> {
    let outside = || StoreError::OutsideRoot {
        path: candidate.to_path_buf(),
    };

    let parent = candidate.parent().ok_or_else(outside)?;
    if candidate.file_name().is_none() {
        return Err(outside());
    }

    let canonical_dir = dir.canonicalize().map_err(|e| StoreError::io(dir, e))?;
    // A parent that cannot be resolved cannot be the root either.
    let canonical_parent = parent.canonicalize().map_err(|_| outside())?;

    if canonical_parent != canonical_dir {
        return Err(outside());
    }
    Ok(())
}

/// Locations of the notes root and its trash directory.
///
/// The layout is:
/// - `{root_dir}/<Title>.md | <Title>.txt` - active notes
/// - `{root_dir}/.trash/` - trashed notes and their `.meta.json` sidecars
///
/// Nothing is created on construction; callers ensure a directory exists
/// right before they use it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotePaths {
    root_dir: PathBuf,
    trash_dir: PathBuf,
}

impl NotePaths {
    /// Uses `$JOTPAD_ROOT` when set, otherwise `~/JotPad`.
    pub fn new() -> Result<Self> {
        if let Some(root) = std::env::var_os(ROOT_ENV_VAR).filter(|v| !v.is_empty()) {
            return Ok(Self::new_with_root(PathBuf::from(root)));
        }

        let home = dirs::home_dir().ok_or_else(|| StoreError::NotFound {
            path: PathBuf::from("~"),
        })?;
        Ok(Self::new_with_root(home.join(APP_DIR_NAME)))
    }

    /// Creates paths rooted at a custom directory. Useful for testing.
    pub fn new_with_root(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        let trash_dir = root_dir.join(TRASH_DIR_NAME);
        Self {
            root_dir,
            trash_dir,
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn trash_dir(&self) -> &Path {
        &self.trash_dir
    }

    pub fn ensure_root(&self) -> Result<()> {
        fs::create_dir_all(&self.root_dir).map_err(|e| StoreError::io(&self.root_dir, e))
    }

    pub fn ensure_trash(&self) -> Result<()> {
        fs::create_dir_all(&self.trash_dir).map_err(|e| StoreError::io(&self.trash_dir, e))
    }

    /// Path of an active note, after validating its title.
    pub fn note_path(&self, key: &NoteKey) -> Result<PathBuf> {
        validate_title(&key.title)?;
        Ok(self.root_dir.join(key.file_name()))
    }

    /// Path of a trashed note's content file, after validating its title.
    pub fn trashed_path(&self, key: &NoteKey) -> Result<PathBuf> {
        validate_title(&key.title)?;
        Ok(self.trash_dir.join(key.file_name()))
    }
}
