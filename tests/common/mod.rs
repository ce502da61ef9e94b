//! Shared fixtures: a synthetic renderer and seeded in-memory backends.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use image::{DynamicImage, ImageBuffer, Rgb};
use mjk_prints::models::{FileUpload, ProcessingStatus, Product, ProductStatus};
use mjk_prints::storage;
use mjk_prints::{
    BlobStore, MemoryDb, MemoryStore, PageRenderer, PdfMetadata, PrintsError, ProcessContext,
    RenderTarget, RenderedPage,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

/// US Letter in points.
pub const PAGE_WIDTH_PTS: f32 = 612.0;
pub const PAGE_HEIGHT_PTS: f32 = 792.0;

/// Minimal bytes that pass the `%PDF` check. Only [`FakeRenderer`] reads them.
pub const FAKE_PDF: &[u8] = b"%PDF-1.7\n%fake\n";

/// Produces solid-colour pages of Letter proportions without pdfium.
#[derive(Debug, Clone, Default)]
pub struct FakeRenderer {
    pub page_count: usize,
    /// 0-based pages whose render fails.
    pub failing_pages: HashSet<usize>,
}

impl FakeRenderer {
    pub fn with_pages(page_count: usize) -> Self {
        Self {
            page_count,
            failing_pages: HashSet::new(),
        }
    }

    pub fn failing(mut self, page_index: usize) -> Self {
        self.failing_pages.insert(page_index);
        self
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn inspect(&self, source: &str, _pdf: Bytes) -> Result<PdfMetadata, PrintsError> {
        if self.page_count == 0 {
            return Err(PrintsError::EmptyDocument {
                path: source.to_string(),
            });
        }
        Ok(PdfMetadata {
            title: Some("Fixture".into()),
            page_count: self.page_count,
            pdf_version: "Pdf1_7".into(),
            page_width_pts: PAGE_WIDTH_PTS,
            page_height_pts: PAGE_HEIGHT_PTS,
            ..Default::default()
        })
    }

    async fn render(
        &self,
        _source: &str,
        _pdf: Bytes,
        page_indices: &[usize],
        target: RenderTarget,
    ) -> Result<Vec<RenderedPage>, PrintsError> {
        Ok(page_indices
            .iter()
            .filter(|&&idx| idx < self.page_count)
            .map(|&idx| {
                if self.failing_pages.contains(&idx) {
                    return (idx, Err(format!("synthetic failure on page {}", idx + 1)));
                }
                let height = ((target.width as f32 * PAGE_HEIGHT_PTS / PAGE_WIDTH_PTS) as u32)
                    .min(target.max_height)
                    .max(1);
                let shade = (idx as u8).wrapping_mul(40).wrapping_add(30);
                let img = ImageBuffer::from_pixel(target.width, height, Rgb([shade, 120, 200]));
                (idx, Ok(DynamicImage::ImageRgb8(img)))
            })
            .collect())
    }
}

pub fn file_row(id: Uuid, storage_path: &str, status: ProcessingStatus) -> FileUpload {
    FileUpload {
        id,
        product_id: None,
        file_name: "print.pdf".into(),
        storage_path: storage_path.to_string(),
        file_size: FAKE_PDF.len() as i64,
        mime_type: "application/pdf".into(),
        processing_status: status,
        processing_error: None,
        page_count: None,
        metadata: None,
        preview_urls: None,
        thumbnail_urls: None,
        created_at: Utc::now(),
        processed_at: None,
    }
}

/// Store `data` as a PDF and seed a row with `status`. Returns the row.
pub async fn seed_upload(
    db: &MemoryDb,
    store: &MemoryStore,
    data: &[u8],
    status: ProcessingStatus,
) -> FileUpload {
    let id = Uuid::new_v4();
    let path = storage::pdf_path(id, "print.pdf");
    store
        .put(&path, Bytes::copy_from_slice(data), "application/pdf")
        .await
        .unwrap();
    let row = file_row(id, &path, status);
    db.seed_file(row.clone()).await;
    row
}

pub fn product(title: &str, file_id: Option<Uuid>) -> Product {
    let now = Utc::now();
    Product {
        id: Uuid::new_v4(),
        title: title.to_string(),
        slug: mjk_prints::catalog::slugify(title),
        description: None,
        price_cents: 1500,
        currency: "USD".into(),
        status: ProductStatus::Active,
        file_id,
        preview_image_url: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn context(db: &Arc<MemoryDb>, store: &Arc<MemoryStore>, renderer: FakeRenderer) -> ProcessContext {
    ProcessContext {
        files: db.clone(),
        store: store.clone(),
        renderer: Arc::new(renderer),
        catalog: Some(db.clone()),
    }
}
