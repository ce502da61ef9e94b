//! Result types produced by the processing pipeline.

use crate::config::PreviewSize;
use crate::error::ArtifactError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Document-level metadata read from the PDF without rendering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
    /// First-page width in PDF points (1/72 inch).
    pub page_width_pts: f32,
    /// First-page height in PDF points.
    pub page_height_pts: f32,
}

/// What a generated image represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArtifactKind {
    Preview { size: PreviewSize },
    /// 1-indexed page number.
    Thumbnail { page: usize },
}

impl ArtifactKind {
    /// Human-readable label used in logs and error messages.
    pub fn label(&self) -> String {
        match self {
            ArtifactKind::Preview { size } => format!("preview {size}"),
            ArtifactKind::Thumbnail { page } => format!("thumbnail {page}"),
        }
    }
}

/// One uploaded preview or thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub kind: ArtifactKind,
    pub storage_path: String,
    pub public_url: String,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// Timing and counts for one processing run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub planned_artifacts: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub download_duration_ms: u64,
    pub render_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingOutput {
    pub file_id: Uuid,
    pub metadata: PdfMetadata,
    pub previews: Vec<GeneratedImage>,
    pub thumbnails: Vec<GeneratedImage>,
    /// Artifacts that were skipped; the run still completed.
    pub failures: Vec<ArtifactError>,
    pub stats: ProcessingStats,
}

impl ProcessingOutput {
    /// `{"small": url, ...}` as stored in `file_uploads.preview_urls`.
    pub fn preview_url_map(&self) -> BTreeMap<&'static str, &str> {
        self.previews
            .iter()
            .filter_map(|img| match img.kind {
                ArtifactKind::Preview { size } => Some((size.as_str(), img.public_url.as_str())),
                ArtifactKind::Thumbnail { .. } => None,
            })
            .collect()
    }

    /// Thumbnail URLs in page order, as stored in `file_uploads.thumbnail_urls`.
    pub fn thumbnail_url_list(&self) -> Vec<&str> {
        let mut thumbs: Vec<&GeneratedImage> = self.thumbnails.iter().collect();
        thumbs.sort_by_key(|img| match img.kind {
            ArtifactKind::Thumbnail { page } => page,
            ArtifactKind::Preview { .. } => 0,
        });
        thumbs.iter().map(|img| img.public_url.as_str()).collect()
    }

    /// Largest preview URL, used as a product's default cover image.
    pub fn cover_url(&self) -> Option<&str> {
        self.previews
            .iter()
            .max_by_key(|img| img.width)
            .map(|img| img.public_url.as_str())
    }
}
