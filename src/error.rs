//! Error types for the mjk-prints library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`PrintsError`]: **Fatal.** The operation cannot proceed at all
//!   (missing row, not a PDF, storage unreachable). Returned as
//!   `Err(PrintsError)` from [`crate::process::process_file`] and the
//!   repository/storage traits.
//!
//! * [`ArtifactError`]: **Non-fatal.** A single preview or thumbnail failed
//!   (render glitch, encoder error, rejected upload) while the others are
//!   fine. Stored in [`crate::output::ProcessingOutput::failures`] so a file
//!   with four good thumbnails out of five still completes.

use thiserror::Error;
use uuid::Uuid;

/// All fatal errors returned by the mjk-prints library.
#[derive(Debug, Error)]
pub enum PrintsError {
    // ── Lookup errors ─────────────────────────────────────────────────────
    /// No `file_uploads` row with this id.
    #[error("File upload {id} not found")]
    FileNotFound { id: Uuid },

    /// A generic missing row (product, order, order item).
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// The row is already marked `processing` and `force` was not set.
    #[error("File upload {id} is already being processed")]
    AlreadyProcessing { id: Uuid },

    // ── Input errors ──────────────────────────────────────────────────────
    /// The stored object is not a PDF.
    #[error("Object '{path}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { path: String, magic: Vec<u8> },

    /// The PDF parsed but has no pages.
    #[error("PDF '{path}' contains no pages")]
    EmptyDocument { path: String },

    /// PDF header/trailer/xref is corrupt, or the document is encrypted.
    #[error("PDF '{path}' could not be opened: {detail}")]
    CorruptPdf { path: String, detail: String },

    /// Request payload failed validation.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Caller is not allowed to perform the operation (e.g. download limit).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Upload exceeds the configured size limit.
    #[error("Payload of {size} bytes exceeds the {limit}-byte limit")]
    PayloadTooLarge { size: usize, limit: usize },

    // ── Backend errors ────────────────────────────────────────────────────
    /// Blob storage returned an error.
    #[error("Storage operation '{op}' failed for '{path}': {reason}")]
    StorageFailed {
        op: &'static str,
        path: String,
        reason: String,
    },

    /// The database REST endpoint returned an error.
    #[error("Database operation on '{table}' failed: {reason}")]
    DatabaseFailed { table: &'static str, reason: String },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// Every preview and thumbnail failed; the file has nothing to show.
    #[error("All {total} artifacts failed.\nFirst error: {first_error}")]
    AllArtifactsFailed { total: usize, first_error: String },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium or place the library next to the binary."
    )]
    PdfiumBindingFailed(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrintsError {
    pub(crate) fn storage(op: &'static str, path: impl Into<String>, reason: impl ToString) -> Self {
        Self::StorageFailed {
            op,
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn database(table: &'static str, reason: impl ToString) -> Self {
        Self::DatabaseFailed {
            table,
            reason: reason.to_string(),
        }
    }
}

/// A non-fatal error for a single generated image.
#[derive(Debug, Clone, Error, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactError {
    /// pdfium failed to rasterise the page.
    #[error("{label}: rasterisation failed: {detail}")]
    RenderFailed { label: String, detail: String },

    /// JPEG encoding failed.
    #[error("{label}: encoding failed: {detail}")]
    EncodeFailed { label: String, detail: String },

    /// Storage rejected the upload.
    #[error("{label}: upload failed: {detail}")]
    UploadFailed { label: String, detail: String },
}

impl ArtifactError {
    /// The artifact label (`preview small`, `thumbnail 3`, …).
    pub fn label(&self) -> &str {
        match self {
            ArtifactError::RenderFailed { label, .. }
            | ArtifactError::EncodeFailed { label, .. }
            | ArtifactError::UploadFailed { label, .. } => label,
        }
    }
}
