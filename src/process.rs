//! Processing entry points: turn one `file_uploads` row into previews.
//!
//! [`process_file`] is the whole job: one render pass for page 1, one for the
//! thumbnail pages, and a plain loop over the resulting images. Each
//! artifact's resize → encode → upload is isolated, so a bad page costs one
//! thumbnail, not the whole file.
//!
//! ## Status transitions
//!
//! ```text
//! pending ──▶ processing ──▶ completed
//!                  │
//!                  └──────▶ failed  (fatal error; message persisted)
//! ```

use crate::config::ProcessingConfig;
use crate::db::{CatalogRepository, FileRepository};
use crate::error::{ArtifactError, PrintsError};
use crate::models::{FileUpload, FileUploadPatch, ProcessingStatus, ProductPatch};
use crate::output::{
    ArtifactKind, GeneratedImage, PdfMetadata, ProcessingOutput, ProcessingStats,
};
use crate::pipeline::render::{PageRenderer, RenderTarget};
use crate::pipeline::{encode, input, resize};
use crate::storage::{self, BlobStore};
use bytes::Bytes;
use chrono::Utc;
use image::DynamicImage;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// The collaborators a processing run talks to.
#[derive(Clone)]
pub struct ProcessContext {
    pub files: Arc<dyn FileRepository>,
    pub store: Arc<dyn BlobStore>,
    pub renderer: Arc<dyn PageRenderer>,
    /// When set, a linked product gets the large preview as its cover image.
    pub catalog: Option<Arc<dyn CatalogRepository>>,
}

/// Process an uploaded PDF: previews, thumbnails, metadata, status.
///
/// # Returns
/// `Ok(ProcessingOutput)` once the row is `completed`, even if some
/// artifacts were skipped (see `output.failures`).
///
/// # Errors
/// - [`PrintsError::FileNotFound`]: no such row (status untouched)
/// - [`PrintsError::AlreadyProcessing`]: row is `processing` and
///   `config.force` is false (status untouched)
/// - anything fatal after the row entered `processing`; the row is then
///   marked `failed` with the error message
pub async fn process_file(
    file_id: Uuid,
    ctx: &ProcessContext,
    config: &ProcessingConfig,
) -> Result<ProcessingOutput, PrintsError> {
    let total_start = Instant::now();

    let file = ctx
        .files
        .get_file_upload(file_id)
        .await?
        .ok_or(PrintsError::FileNotFound { id: file_id })?;

    if file.processing_status == ProcessingStatus::Processing && !config.force {
        return Err(PrintsError::AlreadyProcessing { id: file_id });
    }

    info!("Processing file {} ({})", file_id, file.storage_path);
    ctx.files
        .update_file_upload(
            file_id,
            &FileUploadPatch::status(ProcessingStatus::Processing, None),
        )
        .await?;

    match run(&file, ctx, config, total_start).await {
        Ok(output) => Ok(output),
        Err(e) => {
            error!("Processing file {} failed: {}", file_id, e);
            let patch = FileUploadPatch::status(ProcessingStatus::Failed, Some(e.to_string()));
            if let Err(write_err) = ctx.files.update_file_upload(file_id, &patch).await {
                error!(
                    "Could not mark file {} as failed: {}",
                    file_id, write_err
                );
            }
            Err(e)
        }
    }
}

/// Validate PDF bytes and read their metadata. No storage or database.
pub async fn inspect_bytes(
    source: &str,
    pdf: Bytes,
    renderer: &dyn PageRenderer,
) -> Result<PdfMetadata, PrintsError> {
    input::validate_pdf(source, &pdf)?;
    renderer.inspect(source, pdf).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn run(
    file: &FileUpload,
    ctx: &ProcessContext,
    config: &ProcessingConfig,
    total_start: Instant,
) -> Result<ProcessingOutput, PrintsError> {
    let file_id = file.id;
    let source = file.storage_path.as_str();

    // ── Step 1: Download ─────────────────────────────────────────────────
    let download_start = Instant::now();
    let pdf = input::fetch_pdf(ctx.store.as_ref(), source).await?;
    let download_duration_ms = download_start.elapsed().as_millis() as u64;

    // ── Step 2: Metadata ─────────────────────────────────────────────────
    let metadata = ctx.renderer.inspect(source, pdf.clone()).await?;
    let planned = config.planned_artifacts(metadata.page_count);
    info!(
        "File {}: {} pages, {} artifacts planned",
        file_id, metadata.page_count, planned
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_processing_start(file_id, planned);
    }

    let mut previews = Vec::new();
    let mut thumbnails = Vec::new();
    let mut failures = Vec::new();
    let mut render_duration_ms = 0u64;

    // ── Step 3: Previews from page 1 ─────────────────────────────────────
    if !config.preview_sizes.is_empty() {
        let target = RenderTarget {
            width: config.preview_render_width(),
            max_height: config.max_rendered_pixels,
        };
        let render_start = Instant::now();
        let rendered = ctx.renderer.render(source, pdf.clone(), &[0], target).await?;
        render_duration_ms += render_start.elapsed().as_millis() as u64;

        let page_one = rendered.into_iter().find(|(idx, _)| *idx == 0).map(|(_, r)| r);

        for &size in &config.preview_sizes {
            let kind = ArtifactKind::Preview { size };
            let result = match &page_one {
                Some(Ok(img)) => {
                    let resized = resize::resize_to_width(img, size.width());
                    emit_artifact(file_id, kind, &resized, ctx, config).await
                }
                Some(Err(detail)) => Err(ArtifactError::RenderFailed {
                    label: kind.label(),
                    detail: detail.clone(),
                }),
                None => Err(ArtifactError::RenderFailed {
                    label: kind.label(),
                    detail: "page 1 was not rendered".into(),
                }),
            };
            record(result, &mut previews, &mut failures, config);
        }
    }

    // ── Step 4: Thumbnails for the first pages ───────────────────────────
    let thumb_count = config.max_thumbnails.min(metadata.page_count);
    if thumb_count > 0 {
        let indices: Vec<usize> = (0..thumb_count).collect();
        let target = RenderTarget {
            width: config.thumbnail_width,
            max_height: config.max_rendered_pixels,
        };
        let render_start = Instant::now();
        let rendered = ctx.renderer.render(source, pdf.clone(), &indices, target).await?;
        render_duration_ms += render_start.elapsed().as_millis() as u64;

        for idx in indices {
            let kind = ArtifactKind::Thumbnail { page: idx + 1 };
            let result = match rendered.iter().find(|(i, _)| *i == idx) {
                Some((_, Ok(img))) => emit_artifact(file_id, kind, img, ctx, config).await,
                Some((_, Err(detail))) => Err(ArtifactError::RenderFailed {
                    label: kind.label(),
                    detail: detail.clone(),
                }),
                None => Err(ArtifactError::RenderFailed {
                    label: kind.label(),
                    detail: "page was not rendered".into(),
                }),
            };
            record(result, &mut thumbnails, &mut failures, config);
        }
    }

    // ── Step 5: Outcome ──────────────────────────────────────────────────
    let succeeded = previews.len() + thumbnails.len();
    if succeeded == 0 {
        let first_error = failures
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no artifacts were produced".to_string());
        return Err(PrintsError::AllArtifactsFailed {
            total: failures.len(),
            first_error,
        });
    }

    let stats = ProcessingStats {
        planned_artifacts: planned,
        succeeded,
        failed: failures.len(),
        download_duration_ms,
        render_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    let output = ProcessingOutput {
        file_id,
        metadata,
        previews,
        thumbnails,
        failures,
        stats,
    };

    // ── Step 6: Persist ──────────────────────────────────────────────────
    let patch = completion_patch(&output)?;
    ctx.files.update_file_upload(file_id, &patch).await?;

    if let (Some(catalog), Some(product_id)) = (&ctx.catalog, file.product_id) {
        link_product_cover(catalog.as_ref(), product_id, &output).await;
    }

    info!(
        "File {} completed: {}/{} artifacts in {}ms",
        file_id, output.stats.succeeded, planned, output.stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_processing_complete(file_id, output.stats.succeeded, output.stats.failed);
    }

    Ok(output)
}

/// Encode and upload one artifact.
async fn emit_artifact(
    file_id: Uuid,
    kind: ArtifactKind,
    img: &DynamicImage,
    ctx: &ProcessContext,
    config: &ProcessingConfig,
) -> Result<GeneratedImage, ArtifactError> {
    let label = kind.label();

    let data = encode::encode_jpeg(img, config.jpeg_quality).map_err(|e| {
        ArtifactError::EncodeFailed {
            label: label.clone(),
            detail: e.to_string(),
        }
    })?;

    let storage_path = match kind {
        ArtifactKind::Preview { size } => storage::preview_path(file_id, size),
        ArtifactKind::Thumbnail { page } => storage::thumbnail_path(file_id, page),
    };
    let bytes = data.len();

    ctx.store
        .put(&storage_path, data, encode::JPEG_CONTENT_TYPE)
        .await
        .map_err(|e| ArtifactError::UploadFailed {
            label: label.clone(),
            detail: e.to_string(),
        })?;

    debug!("{} → {} ({} bytes)", label, storage_path, bytes);

    Ok(GeneratedImage {
        kind,
        public_url: ctx.store.public_url(&storage_path),
        storage_path,
        width: img.width(),
        height: img.height(),
        bytes,
    })
}

/// Sort one artifact result into the success or failure list.
fn record(
    result: Result<GeneratedImage, ArtifactError>,
    ok: &mut Vec<GeneratedImage>,
    failures: &mut Vec<ArtifactError>,
    config: &ProcessingConfig,
) {
    match result {
        Ok(img) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_artifact_complete(&img.storage_path, img.bytes);
            }
            ok.push(img);
        }
        Err(e) => {
            warn!("Skipping {}", e);
            if let Some(ref cb) = config.progress_callback {
                cb.on_artifact_error(e.label(), &e.to_string());
            }
            failures.push(e);
        }
    }
}

/// Build the `completed` row update from a finished run.
fn completion_patch(output: &ProcessingOutput) -> Result<FileUploadPatch, PrintsError> {
    let processing_error = if output.failures.is_empty() {
        None
    } else {
        Some(
            output
                .failures
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )
    };

    Ok(FileUploadPatch {
        processing_status: Some(ProcessingStatus::Completed),
        processing_error: Some(processing_error),
        page_count: Some(i32::try_from(output.metadata.page_count).unwrap_or(i32::MAX)),
        metadata: Some(to_json(&output.metadata)?),
        preview_urls: Some(to_json(&output.preview_url_map())?),
        thumbnail_urls: Some(to_json(&output.thumbnail_url_list())?),
        processed_at: Some(Utc::now()),
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, PrintsError> {
    serde_json::to_value(value).map_err(|e| PrintsError::Internal(format!("serialise result: {e}")))
}

/// Point a product's cover image at the new large preview, unless an admin
/// set a different image by hand.
async fn link_product_cover(
    catalog: &dyn CatalogRepository,
    product_id: Uuid,
    output: &ProcessingOutput,
) {
    let Some(cover) = output.cover_url() else {
        return;
    };

    let product = match catalog.get_product(product_id).await {
        Ok(Some(p)) => p,
        Ok(None) => {
            warn!("File {} links to missing product {}", output.file_id, product_id);
            return;
        }
        Err(e) => {
            warn!("Could not load product {}: {}", product_id, e);
            return;
        }
    };

    let owned_by_file = product
        .preview_image_url
        .as_deref()
        .is_none_or(|url| url.contains(&output.file_id.to_string()));
    if !owned_by_file {
        debug!("Product {} has a custom cover; leaving it", product_id);
        return;
    }

    let patch = ProductPatch {
        preview_image_url: Some(Some(cover.to_string())),
        updated_at: Utc::now(),
        ..Default::default()
    };
    if let Err(e) = catalog.update_product(product_id, &patch).await {
        warn!("Could not set cover for product {}: {}", product_id, e);
    }
}
