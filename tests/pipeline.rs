//! Processing pipeline tests against in-memory storage and a synthetic renderer.
//!
//! Run with:
//!   cargo test --test pipeline

mod common;

use common::{context, product, seed_upload, FakeRenderer, FAKE_PDF};
use mjk_prints::models::ProcessingStatus;
use mjk_prints::storage::{preview_path, thumbnail_path};
use mjk_prints::{
    process_file, ArtifactError, ArtifactKind, BlobStore, CatalogRepository, FileRepository, MemoryDb,
    MemoryStore, PreviewSize, PrintsError, ProcessingConfig, ProcessingProgressCallback,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn backends() -> (Arc<MemoryDb>, Arc<MemoryStore>) {
    (Arc::new(MemoryDb::new()), Arc::new(MemoryStore::new()))
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_generates_previews_and_five_thumbnails() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(8));

    let output = process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .expect("processing should succeed");

    assert_eq!(output.previews.len(), 3);
    assert_eq!(output.thumbnails.len(), 5);
    assert!(output.failures.is_empty());
    assert_eq!(output.stats.planned_artifacts, 8);
    assert_eq!(output.stats.succeeded, 8);

    for size in PreviewSize::ALL {
        let path = preview_path(row.id, size);
        let obj = store.object(&path).await.expect("preview uploaded");
        assert_eq!(obj.content_type, "image/jpeg");
        assert_eq!(&obj.data[..2], &[0xFF, 0xD8], "JPEG SOI marker");

        let img = output
            .previews
            .iter()
            .find(|p| p.kind == ArtifactKind::Preview { size })
            .unwrap();
        assert_eq!(img.width, size.width());
        assert_eq!(img.storage_path, path);
    }
    for page in 1..=5 {
        assert!(store.object(&thumbnail_path(row.id, page)).await.is_some());
    }
    assert!(store.object(&thumbnail_path(row.id, 6)).await.is_none());
    assert!(output.thumbnails.iter().all(|t| t.width == 200));

    let stored = db.get_file_upload(row.id).await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
    assert_eq!(stored.processing_error, None);
    assert_eq!(stored.page_count, Some(8));
    assert!(stored.processed_at.is_some());

    let previews = stored.preview_urls.unwrap();
    assert_eq!(
        previews["large"],
        format!("memory://public/previews/{}/page-1-large.jpg", row.id)
    );
    let thumbs = stored.thumbnail_urls.unwrap();
    let thumbs = thumbs.as_array().unwrap();
    assert_eq!(thumbs.len(), 5);
    assert_eq!(
        thumbs[0],
        format!("memory://public/thumbnails/{}/page-1.jpg", row.id)
    );
    assert_eq!(stored.metadata.unwrap()["page_count"], 8);

    assert_eq!(
        db.status_log(row.id).await,
        vec![ProcessingStatus::Processing, ProcessingStatus::Completed]
    );
}

#[tokio::test]
async fn test_two_page_pdf_yields_two_thumbnails() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(2));

    let output = process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap();

    assert_eq!(output.thumbnails.len(), 2);
    assert_eq!(output.stats.planned_artifacts, 5);
    assert_eq!(
        store
            .keys_with_prefix(&format!("thumbnails/{}/", row.id))
            .await
            .len(),
        2
    );
}

#[tokio::test]
async fn test_reprocessing_overwrites_same_paths() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(3));
    let config = ProcessingConfig::default();

    assert_ok!(process_file(row.id, &ctx, &config).await);
    let first = store.keys().await;
    assert_ok!(process_file(row.id, &ctx, &config).await);

    assert_eq!(store.keys().await, first);
}

// ── Isolation of per-artifact failures ───────────────────────────────────────

#[tokio::test]
async fn test_thumbnail_render_failure_is_isolated() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(6).failing(2));

    let output = process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap();

    assert_eq!(output.previews.len(), 3);
    assert_eq!(output.thumbnails.len(), 4);
    assert_eq!(output.failures.len(), 1);
    assert!(matches!(
        &output.failures[0],
        ArtifactError::RenderFailed { label, .. } if label == "thumbnail 3"
    ));
    assert!(store.object(&thumbnail_path(row.id, 3)).await.is_none());
    assert!(store.object(&thumbnail_path(row.id, 4)).await.is_some());

    let stored = db.get_file_upload(row.id).await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
    assert!(stored.processing_error.unwrap().contains("thumbnail 3"));
    assert_eq!(stored.thumbnail_urls.unwrap().as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_upload_failure_is_isolated() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    store
        .fail_puts_to(preview_path(row.id, PreviewSize::Medium))
        .await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(1));

    let output = process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap();

    assert_eq!(output.previews.len(), 2);
    assert_eq!(output.thumbnails.len(), 1);
    assert!(matches!(
        &output.failures[..],
        [ArtifactError::UploadFailed { label, .. }] if label == "preview medium"
    ));
    let stored = db.get_file_upload(row.id).await.unwrap().unwrap();
    let previews = stored.preview_urls.unwrap();
    assert!(previews.get("medium").is_none());
    assert!(previews.get("small").is_some());
}

#[tokio::test]
async fn test_page_one_failure_skips_previews_but_keeps_other_thumbnails() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(3).failing(0));

    let output = process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap();

    assert!(output.previews.is_empty());
    assert_eq!(output.thumbnails.len(), 2);
    assert_eq!(output.failures.len(), 4);
    assert_eq!(output.cover_url(), None);
}

// ── Fatal errors ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_not_a_pdf_marks_row_failed() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, b"PK\x03\x04zip", ProcessingStatus::Pending).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(3));

    let err = process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PrintsError::NotAPdf { .. }), "got {err:?}");

    let stored = db.get_file_upload(row.id).await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Failed);
    assert!(stored
        .processing_error
        .unwrap()
        .contains("is not a valid PDF"));
    assert_eq!(
        db.status_log(row.id).await,
        vec![ProcessingStatus::Processing, ProcessingStatus::Failed]
    );
    assert!(store
        .keys_with_prefix(&format!("previews/{}/", row.id))
        .await
        .is_empty());
}

#[tokio::test]
async fn test_every_artifact_failing_is_fatal() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(2).failing(0).failing(1));

    let err = process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap_err();
    assert!(
        matches!(err, PrintsError::AllArtifactsFailed { total: 5, .. }),
        "got {err:?}"
    );

    let stored = db.get_file_upload(row.id).await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Failed);
}

#[tokio::test]
async fn test_empty_document_is_fatal() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(0));

    let err = assert_err!(process_file(row.id, &ctx, &ProcessingConfig::default()).await);
    assert!(matches!(err, PrintsError::EmptyDocument { .. }));
}

#[tokio::test]
async fn test_missing_blob_marks_row_failed() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    store.delete(&[row.storage_path.clone()]).await.unwrap();
    let ctx = context(&db, &store, FakeRenderer::with_pages(1));

    let err = process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PrintsError::StorageFailed { .. }));
    let stored = db.get_file_upload(row.id).await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Failed);
}

#[tokio::test]
async fn test_unknown_file_is_not_found() {
    let (db, store) = backends();
    let ctx = context(&db, &store, FakeRenderer::with_pages(1));
    let id = Uuid::new_v4();

    let err = process_file(id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PrintsError::FileNotFound { id: e } if e == id));
}

// ── Status guard ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_already_processing_without_force() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Processing).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(1));

    let err = process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap_err();
    assert!(matches!(err, PrintsError::AlreadyProcessing { .. }));
    assert!(db.status_log(row.id).await.is_empty(), "status must not change");

    let forced = ProcessingConfig::builder().force(true).build().unwrap();
    let output = process_file(row.id, &ctx, &forced).await.unwrap();
    assert_eq!(output.stats.failed, 0);
}

#[tokio::test]
async fn test_failed_rows_can_be_retried() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Failed).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(1));

    assert_ok!(process_file(row.id, &ctx, &ProcessingConfig::default()).await);
    let stored = db.get_file_upload(row.id).await.unwrap().unwrap();
    assert_eq!(stored.processing_status, ProcessingStatus::Completed);
}

// ── Config variations ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_custom_plan_and_thumbnail_width() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(10));
    let config = ProcessingConfig::builder()
        .preview_sizes(vec![PreviewSize::Small])
        .max_thumbnails(2)
        .thumbnail_width(120)
        .build()
        .unwrap();

    let output = process_file(row.id, &ctx, &config).await.unwrap();

    assert_eq!(output.previews.len(), 1);
    assert_eq!(output.previews[0].width, 300);
    assert_eq!(output.thumbnails.len(), 2);
    assert!(output.thumbnails.iter().all(|t| t.width == 120));
}

// ── Product cover ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_links_large_preview_as_product_cover() {
    let (db, store) = backends();
    let mut row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let p = product("Star Map", Some(row.id));
    db.seed_product(p.clone()).await;
    row.product_id = Some(p.id);
    db.seed_file(row.clone()).await;

    let ctx = context(&db, &store, FakeRenderer::with_pages(1));
    let output = process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap();

    let stored = db.get_product(p.id).await.unwrap().unwrap();
    assert_eq!(stored.preview_image_url.as_deref(), output.cover_url());
    assert!(stored.preview_image_url.unwrap().ends_with("page-1-large.jpg"));
}

#[tokio::test]
async fn test_keeps_custom_product_cover() {
    let (db, store) = backends();
    let mut row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let mut p = product("Tide Chart", Some(row.id));
    p.preview_image_url = Some("https://cdn.example.com/hand-picked.jpg".into());
    db.seed_product(p.clone()).await;
    row.product_id = Some(p.id);
    db.seed_file(row.clone()).await;

    let ctx = context(&db, &store, FakeRenderer::with_pages(1));
    process_file(row.id, &ctx, &ProcessingConfig::default())
        .await
        .unwrap();

    let stored = db.get_product(p.id).await.unwrap().unwrap();
    assert_eq!(
        stored.preview_image_url.as_deref(),
        Some("https://cdn.example.com/hand-picked.jpg")
    );
}

// ── Progress callback ────────────────────────────────────────────────────────

#[derive(Default)]
struct Counting {
    planned: AtomicUsize,
    completed: AtomicUsize,
    errors: AtomicUsize,
    finished: AtomicUsize,
}

impl ProcessingProgressCallback for Counting {
    fn on_processing_start(&self, _file_id: Uuid, planned_artifacts: usize) {
        self.planned.store(planned_artifacts, Ordering::SeqCst);
    }
    fn on_artifact_complete(&self, _storage_path: &str, _bytes: usize) {
        self.completed.fetch_add(1, Ordering::SeqCst);
    }
    fn on_artifact_error(&self, _label: &str, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }
    fn on_processing_complete(&self, _file_id: Uuid, _succeeded: usize, _failed: usize) {
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_progress_callback_sees_every_artifact() {
    let (db, store) = backends();
    let row = seed_upload(&db, &store, FAKE_PDF, ProcessingStatus::Pending).await;
    let ctx = context(&db, &store, FakeRenderer::with_pages(4).failing(3));
    let cb = Arc::new(Counting::default());
    let config = ProcessingConfig::builder()
        .progress_callback(cb.clone())
        .build()
        .unwrap();

    process_file(row.id, &ctx, &config).await.unwrap();

    assert_eq!(cb.planned.load(Ordering::SeqCst), 7);
    assert_eq!(cb.completed.load(Ordering::SeqCst), 6);
    assert_eq!(cb.errors.load(Ordering::SeqCst), 1);
    assert_eq!(cb.finished.load(Ordering::SeqCst), 1);
}
