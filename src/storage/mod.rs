//! Blob storage: the bucket holding uploaded PDFs and generated images.
//!
//! The pipeline only ever talks to [`BlobStore`]; the production
//! implementation is [`SupabaseStorage`] and tests use [`MemoryStore`].
//!
//! ## Layout
//!
//! ```text
//! pdfs/{fileId}/{sanitisedName}.pdf
//! previews/{fileId}/page-1-{small|medium|large}.jpg
//! thumbnails/{fileId}/page-{n}.jpg
//! ```
//!
//! Paths are deterministic so reprocessing overwrites the previous run's
//! images instead of accumulating new ones.

mod memory;
mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseStorage;

use crate::config::PreviewSize;
use crate::error::PrintsError;
use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

/// Upper bound on thumbnail pages swept when deleting a file's artifacts.
pub const MAX_THUMBNAIL_SWEEP: usize = 20;

/// Read/write access to the storage bucket.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Download an object.
    async fn get(&self, path: &str) -> Result<Bytes, PrintsError>;

    /// Upload an object, overwriting any existing one.
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), PrintsError>;

    /// Remove objects; paths that do not exist are ignored.
    async fn delete(&self, paths: &[String]) -> Result<(), PrintsError>;

    /// Time-limited URL for a private object.
    async fn signed_url(&self, path: &str, expires_in_secs: u64) -> Result<String, PrintsError>;

    /// Cheap reachability probe for `/api/health`.
    async fn health_check(&self) -> Result<(), PrintsError>;

    /// Public URL for an object in a public bucket. No I/O.
    fn public_url(&self, path: &str) -> String;
}

/// `pdfs/{fileId}/{name}`
pub fn pdf_path(file_id: Uuid, file_name: &str) -> String {
    format!("pdfs/{}/{}", file_id, sanitize_file_name(file_name))
}

/// `previews/{fileId}/page-1-{size}.jpg`
pub fn preview_path(file_id: Uuid, size: PreviewSize) -> String {
    format!("previews/{}/page-1-{}.jpg", file_id, size.as_str())
}

/// `thumbnails/{fileId}/page-{n}.jpg` with 1-indexed `page`.
pub fn thumbnail_path(file_id: Uuid, page: usize) -> String {
    format!("thumbnails/{}/page-{}.jpg", file_id, page)
}

/// Every derived-artifact path a file can own.
pub fn artifact_paths(file_id: Uuid) -> Vec<String> {
    PreviewSize::ALL
        .iter()
        .map(|s| preview_path(file_id, *s))
        .chain((1..=MAX_THUMBNAIL_SWEEP).map(|p| thumbnail_path(file_id, p)))
        .collect()
}

static RE_UNSAFE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());
static RE_DASHES: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").unwrap());

/// Reduce a client-supplied file name to a safe storage key segment.
///
/// Directory components are dropped, unsafe runs become a single `-`, and
/// the result always ends in `.pdf`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned = RE_UNSAFE.replace_all(base.trim(), "-");
    let cleaned = RE_DASHES.replace_all(&cleaned, "-");
    let cleaned = cleaned.trim_matches(|c| c == '-' || c == '.');

    let stem = if cleaned.is_empty() { "document" } else { cleaned };
    if stem.to_ascii_lowercase().ends_with(".pdf") {
        stem.to_string()
    } else {
        format!("{stem}.pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_artifact_paths() {
        let id = Uuid::parse_str("6f1c2b9e-0000-4000-8000-000000000001").unwrap();
        assert_eq!(
            preview_path(id, PreviewSize::Medium),
            "previews/6f1c2b9e-0000-4000-8000-000000000001/page-1-medium.jpg"
        );
        assert_eq!(
            thumbnail_path(id, 3),
            "thumbnails/6f1c2b9e-0000-4000-8000-000000000001/page-3.jpg"
        );
        assert_eq!(artifact_paths(id).len(), 3 + MAX_THUMBNAIL_SWEEP);
    }

    #[test]
    fn sanitize_strips_directories_and_unsafe_chars() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd.pdf");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\My Print (v2).PDF"), "My-Print-v2-.PDF");
        assert_eq!(sanitize_file_name("  spring   poster.pdf "), "spring-poster.pdf");
        assert_eq!(sanitize_file_name("???"), "document.pdf");
        assert_eq!(sanitize_file_name(""), "document.pdf");
    }
}
