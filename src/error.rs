//! Typed failure reasons for note store operations.
//!
//! The boundary mostly reports plain booleans; these variants are what gets
//! logged before that collapse happens.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Failure reason for a repository or trash operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The target file does not exist.
    #[error("Note not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The destination name is already taken.
    #[error("A note already exists at {}", path.display())]
    Collision { path: PathBuf },

    /// A path chosen for a new note is not directly inside the notes root.
    #[error("Notes must be saved directly inside the notes folder, not {}", path.display())]
    OutsideRoot { path: PathBuf },

    /// A title that cannot be used as a file name.
    #[error("Invalid note name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// An extension other than `.md` or `.txt`.
    #[error("Unsupported note extension '{ext}'")]
    UnsupportedExtension { ext: String },

    /// The underlying filesystem call failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The desktop shell could not perform a request.
    #[error("Host error: {0}")]
    Host(String),

    /// A blocking filesystem task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Task(String),
}

impl StoreError {
    /// Wraps an `io::Error`, mapping `NotFound` to the dedicated variant.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            StoreError::NotFound { path }
        } else {
            StoreError::Io { path, source }
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
