use std::fs;
use std::path::PathBuf;

use log::info;

use crate::commands::{blocking, logged, AppState};
use crate::error::StoreError;
use crate::host::{FileFilter, PdfOptions, SaveDialogOptions};

/// Exports the current view as a PDF chosen through a save dialog.
///
/// Cancelling the dialog or any rendering/writing failure yields `false`.
pub async fn export_pdf(state: &AppState) -> bool {
    let host = state.host.clone();
    let exported = blocking(move || {
        let options = SaveDialogOptions {
            title: "Export as PDF",
            default_path: PathBuf::from("note.pdf"),
            button_label: "Export",
            filters: vec![FileFilter {
                name: "PDF",
                extensions: &["pdf"],
            }],
        };
        let Some(path) = host.show_save_dialog(&options) else {
            info!("PDF export cancelled");
            return Ok(false);
        };

        let pdf = host
            .print_to_pdf(&PdfOptions::default())
            .map_err(StoreError::Host)?;
        fs::write(&path, pdf).map_err(|e| StoreError::io(&path, e))?;
        info!("PDF exported to {}", path.display());
        Ok(true)
    })
    .await;

    logged("exportPDF", exported).unwrap_or(false)
}
