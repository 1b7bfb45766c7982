//! Collaborators provided by the desktop shell.
//!
//! The note store never opens windows itself. Creating a note needs a save
//! dialog, rejecting a location needs an error dialog, and PDF export needs
//! the shell to render the current view.

use std::path::PathBuf;

use log::warn;

/// A file-type filter offered by a save dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    pub name: &'static str,
    /// Extensions without the leading dot.
    pub extensions: &'static [&'static str],
}

/// Options for a save-file prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveDialogOptions {
    pub title: &'static str,
    pub default_path: PathBuf,
    pub button_label: &'static str,
    pub filters: Vec<FileFilter>,
}

/// Page setup for print-to-PDF.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfOptions {
    pub print_background: bool,
    /// Margins in inches.
    pub margin: f64,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            print_background: true,
            margin: 0.5,
        }
    }
}

/// Dialog and printing capabilities of the host shell.
pub trait Host: Send + Sync {
    /// Shows a save-file prompt. `None` means the user cancelled.
    fn show_save_dialog(&self, options: &SaveDialogOptions) -> Option<PathBuf>;

    /// Shows a blocking error message to the user.
    fn show_error(&self, title: &str, message: &str);

    /// Renders the currently displayed view as PDF bytes.
    fn print_to_pdf(&self, options: &PdfOptions) -> Result<Vec<u8>, String>;
}

/// Host used when no window is attached: every prompt is treated as
/// dismissed and printing is unavailable.
#[derive(Debug, Default, Clone)]
pub struct HeadlessHost;

impl Host for HeadlessHost {
    fn show_save_dialog(&self, options: &SaveDialogOptions) -> Option<PathBuf> {
        warn!("No dialog available for '{}', treating as cancelled", options.title);
        None
    }

    fn show_error(&self, title: &str, message: &str) {
        warn!("{}: {}", title, message);
    }

    fn print_to_pdf(&self, _options: &PdfOptions) -> Result<Vec<u8>, String> {
        Err("No view is attached to print".to_string())
    }
}
