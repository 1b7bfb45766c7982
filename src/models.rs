use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Extension of a note file. Only these two are recognized in the notes root.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub enum NoteExt {
    Markdown,
    Text,
}

impl NoteExt {
    pub const ALL: [NoteExt; 2] = [NoteExt::Markdown, NoteExt::Text];

    /// The extension with its leading dot, as it appears on disk.
    pub fn as_str(&self) -> &'static str {
        match self {
            NoteExt::Markdown => ".md",
            NoteExt::Text => ".txt",
        }
    }

    /// Splits a file name into `(title, ext)` if it carries a recognized
    /// extension and a non-empty stem.
    pub fn split_file_name(file_name: &str) -> Option<(&str, NoteExt)> {
        NoteExt::ALL.into_iter().find_map(|ext| {
            file_name
                .strip_suffix(ext.as_str())
                .filter(|title| !title.is_empty())
                .map(|title| (title, ext))
        })
    }
}

impl fmt::Display for NoteExt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteExt {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ".md" => Ok(NoteExt::Markdown),
            ".txt" => Ok(NoteExt::Text),
            other => Err(StoreError::UnsupportedExtension {
                ext: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for NoteExt {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<NoteExt> for String {
    fn from(ext: NoteExt) -> Self {
        ext.as_str().to_string()
    }
}

/// Identity of a note: two notes with the same title but different
/// extensions are distinct.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
pub struct NoteKey {
    pub title: String,
    pub ext: NoteExt,
}

impl NoteKey {
    pub fn new(title: impl Into<String>, ext: NoteExt) -> Self {
        Self {
            title: title.into(),
            ext,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}{}", self.title, self.ext)
    }
}

/// A note in the active set.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteRecord {
    pub title: String,
    pub ext: NoteExt,
    /// Epoch milliseconds.
    pub last_edit_time: i64,
}

impl NoteRecord {
    pub fn key(&self) -> NoteKey {
        NoteKey::new(self.title.clone(), self.ext)
    }

    pub fn is(&self, title: &str, ext: NoteExt) -> bool {
        self.title == title && self.ext == ext
    }
}

/// A note sitting in the trash directory.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrashEntry {
    #[serde(flatten)]
    pub note: NoteRecord,
    /// Epoch milliseconds; from the sidecar, or the file mtime when the
    /// sidecar is missing or unreadable.
    pub deleted_at: i64,
}

/// Contents of a `<name>.meta.json` sidecar next to a trashed note.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TrashMeta {
    pub deleted_at: i64,
}

/// Result of an interactive note creation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(NoteKey),
    /// The user dismissed the save dialog.
    Cancelled,
    /// The chosen location was refused; the message was shown to the user.
    Rejected(String),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    Light,
    Dark,
    #[default]
    System,
}

/// Last opened note information
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct LastNote {
    pub title: String,
    pub ext: NoteExt,
}

/// Client-local preferences. Never consulted for file storage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Config {
    pub pinned_notes: Vec<String>,
    pub theme: ThemeMode,
    pub trash_retention_days: u32,
    pub last_note: Option<LastNote>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pinned_notes: vec![],
            theme: ThemeMode::System,
            trash_retention_days: crate::trash::DEFAULT_RETENTION_DAYS,
            last_note: None,
        }
    }
}
