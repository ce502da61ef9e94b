//! Upload lifecycle: accept a PDF into the bucket and remove it again.

use crate::db::FileRepository;
use crate::error::PrintsError;
use crate::models::{FileUpload, NewFileUpload, ProcessingStatus};
use crate::pipeline::input::PDF_MAGIC;
use crate::storage::{self, BlobStore};
use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Store a new PDF and insert its `pending` row.
///
/// # Errors
/// - `PayloadTooLarge` when `data` exceeds `max_bytes`
/// - `Validation` for an empty body or bytes that are not a PDF
pub async fn store_upload(
    files: &dyn FileRepository,
    store: &dyn BlobStore,
    file_name: &str,
    data: Bytes,
    product_id: Option<Uuid>,
    max_bytes: usize,
) -> Result<FileUpload, PrintsError> {
    if data.len() > max_bytes {
        return Err(PrintsError::PayloadTooLarge {
            size: data.len(),
            limit: max_bytes,
        });
    }
    if data.is_empty() {
        return Err(PrintsError::Validation("uploaded file is empty".into()));
    }
    if !data.starts_with(PDF_MAGIC) {
        return Err(PrintsError::Validation(format!(
            "'{file_name}' is not a PDF"
        )));
    }

    let id = Uuid::new_v4();
    let storage_path = storage::pdf_path(id, file_name);
    let file_size = data.len() as i64;

    store.put(&storage_path, data, PDF_CONTENT_TYPE).await?;

    let new = NewFileUpload {
        id,
        product_id,
        file_name: file_name.to_string(),
        storage_path: storage_path.clone(),
        file_size,
        mime_type: PDF_CONTENT_TYPE.to_string(),
        processing_status: ProcessingStatus::Pending,
    };

    match files.insert_file_upload(&new).await {
        Ok(row) => {
            info!("Stored upload {} at {} ({} bytes)", id, storage_path, file_size);
            Ok(row)
        }
        Err(e) => {
            // No row points at the blob, so nothing would ever clean it up.
            if let Err(cleanup) = store.delete(&[storage_path.clone()]).await {
                warn!("Orphaned {} after failed insert: {}", storage_path, cleanup);
            }
            Err(e)
        }
    }
}

/// Delete a file's PDF, its previews and thumbnails, and its row.
pub async fn remove_upload(
    files: &dyn FileRepository,
    store: &dyn BlobStore,
    file_id: Uuid,
) -> Result<(), PrintsError> {
    let row = files
        .get_file_upload(file_id)
        .await?
        .ok_or(PrintsError::FileNotFound { id: file_id })?;

    let mut paths = vec![row.storage_path.clone()];
    paths.extend(storage::artifact_paths(file_id));
    store.delete(&paths).await?;

    files.delete_file_upload(file_id).await?;
    info!("Removed upload {} ({})", file_id, row.storage_path);
    Ok(())
}
