//! Upload, processing, and removal of PDF files.

use super::{AppError, Result, SharedState};
use crate::models::FileUpload;
use crate::output::ProcessingOutput;
use crate::process::process_file;
use crate::uploads;
use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(upload_file))
        .route("/:id", get(get_file).delete(delete_file))
        .route("/:id/process", post(process))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::Validation(format!("Invalid multipart body: {}", e.body_text()))
    }
}

/// POST /api/files
///
/// Multipart fields: `file` (required) and `product_id` (optional). Returns
/// 202 with the `pending` row; processing continues in the background.
pub async fn upload_file(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<FileUpload>)> {
    let mut file: Option<(String, Bytes)> = None;
    let mut product_id: Option<Uuid> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let name = field.file_name().unwrap_or("document.pdf").to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some((name, data));
            }
            Some("product_id") => {
                let text = field.text().await.map_err(multipart_error)?;
                let text = text.trim();
                if !text.is_empty() {
                    let id = Uuid::parse_str(text).map_err(|_| {
                        AppError::Validation(format!("product_id '{text}' is not a UUID"))
                    })?;
                    product_id = Some(id);
                }
            }
            _ => {}
        }
    }

    let (name, data) =
        file.ok_or_else(|| AppError::Validation("multipart field 'file' is required".into()))?;

    if let Some(pid) = product_id {
        if state.catalog.get_product(pid).await?.is_none() {
            return Err(AppError::Validation(format!("Product {pid} does not exist")));
        }
    }

    let row = uploads::store_upload(
        state.files.as_ref(),
        state.store.as_ref(),
        &name,
        data,
        product_id,
        state.server.max_upload_bytes,
    )
    .await?;

    if state.server.auto_process {
        let ctx = state.process_context();
        let config = state.processing.clone();
        let id = row.id;
        tokio::spawn(async move {
            match process_file(id, &ctx, &config).await {
                Ok(out) => info!(
                    "Background processing of {} finished: {} artifacts",
                    id, out.stats.succeeded
                ),
                Err(e) => warn!("Background processing of {} failed: {}", id, e),
            }
        });
    }

    Ok((StatusCode::ACCEPTED, Json(row)))
}

/// GET /api/files/:id
pub async fn get_file(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<FileUpload>> {
    state
        .files
        .get_file_upload(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("File upload {id} not found")))
}

#[derive(Debug, Default, Deserialize)]
pub struct ProcessQuery {
    #[serde(default)]
    pub force: bool,
}

/// POST /api/files/:id/process
///
/// Runs synchronously and returns the full output.
pub async fn process(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<ProcessQuery>,
) -> Result<Json<ProcessingOutput>> {
    let mut config = state.processing.clone();
    config.force = query.force || config.force;
    let output = process_file(id, &state.process_context(), &config).await?;
    Ok(Json(output))
}

/// DELETE /api/files/:id
pub async fn delete_file(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    uploads::remove_upload(state.files.as_ref(), state.store.as_ref(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}
