//! Input resolution: fetch an uploaded PDF from the bucket and validate it.
//!
//! We check the `%PDF` magic bytes before handing anything to pdfium so a
//! mislabeled upload (a ZIP renamed to `.pdf`, an HTML error page) fails
//! with a readable error instead of a pdfium load failure.

use crate::error::PrintsError;
use crate::storage::BlobStore;
use bytes::Bytes;
use tracing::{debug, info};

/// PDF files start with these four bytes.
pub const PDF_MAGIC: &[u8; 4] = b"%PDF";

/// Check that `bytes` look like a PDF.
pub fn validate_pdf(path: &str, bytes: &[u8]) -> Result<(), PrintsError> {
    if bytes.len() < PDF_MAGIC.len() || &bytes[..PDF_MAGIC.len()] != PDF_MAGIC {
        let magic = bytes.iter().take(PDF_MAGIC.len()).copied().collect();
        return Err(PrintsError::NotAPdf {
            path: path.to_string(),
            magic,
        });
    }
    Ok(())
}

/// Download the object at `storage_path` and validate it as a PDF.
pub async fn fetch_pdf(store: &dyn BlobStore, storage_path: &str) -> Result<Bytes, PrintsError> {
    info!("Fetching PDF from storage: {}", storage_path);
    let bytes = store.get(storage_path).await?;
    validate_pdf(storage_path, &bytes)?;
    debug!("Fetched {} bytes from {}", bytes.len(), storage_path);
    Ok(bytes)
}
