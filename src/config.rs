//! Configuration types for PDF processing and the Supabase backend.
//!
//! Processing behaviour is controlled through [`ProcessingConfig`], built via
//! its [`ProcessingConfigBuilder`]. Backend coordinates live in
//! [`SupabaseConfig`] and HTTP-server knobs in [`ServerConfig`]; the binary
//! fills all three from CLI flags and environment variables.

use crate::error::PrintsError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default storage bucket for PDFs and generated images.
pub const DEFAULT_BUCKET: &str = "mjk-prints-storage";

/// Longest signed download URL we hand out: one week.
pub const MAX_SIGNED_URL_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Configuration for one processing run.
///
/// # Example
/// ```rust
/// use mjk_prints::ProcessingConfig;
///
/// let config = ProcessingConfig::builder()
///     .max_thumbnails(3)
///     .jpeg_quality(90)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_thumbnails, 3);
/// ```
#[derive(Clone)]
pub struct ProcessingConfig {
    /// Preview variants rendered from page 1. Default: small, medium, large.
    pub preview_sizes: Vec<PreviewSize>,

    /// Upper bound on thumbnails; a shorter document gets one per page. Default: 5.
    pub max_thumbnails: usize,

    /// Thumbnail width in pixels. Default: 200.
    pub thumbnail_width: u32,

    /// Cap on the rendered height in pixels. Default: 2000.
    ///
    /// A tall page (receipt roll, poster) at 1200 px wide could otherwise
    /// produce an enormous bitmap.
    pub max_rendered_pixels: u32,

    /// JPEG quality 1–100. Default: 85.
    pub jpeg_quality: u8,

    /// Reprocess even when the row is already `processing`. Default: false.
    pub force: bool,

    /// Optional progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            preview_sizes: PreviewSize::ALL.to_vec(),
            max_thumbnails: 5,
            thumbnail_width: 200,
            max_rendered_pixels: 2000,
            jpeg_quality: 85,
            force: false,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ProcessingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessingConfig")
            .field("preview_sizes", &self.preview_sizes)
            .field("max_thumbnails", &self.max_thumbnails)
            .field("thumbnail_width", &self.thumbnail_width)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("force", &self.force)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ProcessingProgressCallback>"),
            )
            .finish()
    }
}

impl ProcessingConfig {
    /// Create a new builder for `ProcessingConfig`.
    pub fn builder() -> ProcessingConfigBuilder {
        ProcessingConfigBuilder {
            config: Self::default(),
        }
    }

    /// Width page 1 is rendered at before resizing to each preview size.
    pub fn preview_render_width(&self) -> u32 {
        self.preview_sizes
            .iter()
            .map(|s| s.width())
            .max()
            .unwrap_or(0)
    }

    /// Number of artifacts a document with `page_count` pages will produce.
    pub fn planned_artifacts(&self, page_count: usize) -> usize {
        self.preview_sizes.len() + self.max_thumbnails.min(page_count)
    }
}

/// Builder for [`ProcessingConfig`].
#[derive(Debug)]
pub struct ProcessingConfigBuilder {
    config: ProcessingConfig,
}

impl ProcessingConfigBuilder {
    pub fn preview_sizes(mut self, sizes: Vec<PreviewSize>) -> Self {
        let mut sizes = sizes;
        sizes.sort_by_key(|s| s.width());
        sizes.dedup();
        self.config.preview_sizes = sizes;
        self
    }

    pub fn max_thumbnails(mut self, n: usize) -> Self {
        self.config.max_thumbnails = n.min(20);
        self
    }

    pub fn thumbnail_width(mut self, px: u32) -> Self {
        self.config.thumbnail_width = px.clamp(50, 1000);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn force(mut self, v: bool) -> Self {
        self.config.force = v;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ProcessingConfig, PrintsError> {
        let c = &self.config;
        if c.preview_sizes.is_empty() && c.max_thumbnails == 0 {
            return Err(PrintsError::InvalidConfig(
                "at least one preview size or thumbnail is required".into(),
            ));
        }
        if c.jpeg_quality == 0 || c.jpeg_quality > 100 {
            return Err(PrintsError::InvalidConfig(format!(
                "JPEG quality must be 1–100, got {}",
                c.jpeg_quality
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// A preview variant of the first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PreviewSize {
    /// 300 px wide: catalog grid cards.
    Small,
    /// 600 px wide: product detail page.
    Medium,
    /// 1200 px wide: zoom / lightbox.
    Large,
}

impl PreviewSize {
    pub const ALL: [PreviewSize; 3] = [PreviewSize::Small, PreviewSize::Medium, PreviewSize::Large];

    pub fn width(self) -> u32 {
        match self {
            PreviewSize::Small => 300,
            PreviewSize::Medium => 600,
            PreviewSize::Large => 1200,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PreviewSize::Small => "small",
            PreviewSize::Medium => "medium",
            PreviewSize::Large => "large",
        }
    }
}

impl fmt::Display for PreviewSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Backend config ───────────────────────────────────────────────────────

/// Coordinates of the hosted Supabase project.
#[derive(Clone)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co` (no trailing slash).
    pub url: String,
    /// Service-role key; sent as both `apikey` and bearer token.
    pub service_key: String,
    /// Storage bucket name. Default: [`DEFAULT_BUCKET`].
    pub bucket: String,
    /// Per-request timeout in seconds. Default: 120.
    pub timeout_secs: u64,
}

impl SupabaseConfig {
    pub fn new(url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            bucket: DEFAULT_BUCKET.to_string(),
            timeout_secs: 120,
        }
    }

    pub fn with_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs.max(1);
        self
    }

    /// Validate the URL scheme and that a key is present.
    pub fn validate(&self) -> Result<(), PrintsError> {
        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(PrintsError::InvalidConfig(format!(
                "Supabase URL must be http(s), got '{}'",
                self.url
            )));
        }
        if self.service_key.trim().is_empty() {
            return Err(PrintsError::InvalidConfig(
                "Supabase service key is empty".into(),
            ));
        }
        if self.bucket.trim().is_empty() {
            return Err(PrintsError::InvalidConfig("storage bucket is empty".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for SupabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseConfig")
            .field("url", &self.url)
            .field("service_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Largest accepted PDF upload in bytes. Default: 50 MiB.
    pub max_upload_bytes: usize,
    /// Lifetime of signed download URLs in seconds. Default: 3600.
    pub signed_url_ttl_secs: u64,
    /// Spawn processing right after an upload. Default: true.
    pub auto_process: bool,
}

impl ServerConfig {
    /// Signed URL lifetime clamped to `1..=MAX_SIGNED_URL_TTL_SECS`.
    pub fn download_ttl_secs(&self) -> u64 {
        self.signed_url_ttl_secs.clamp(1, MAX_SIGNED_URL_TTL_SECS)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024,
            signed_url_ttl_secs: 3600,
            auto_process: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_artifact_plan() {
        let c = ProcessingConfig::default();
        assert_eq!(c.preview_sizes, PreviewSize::ALL.to_vec());
        assert_eq!(c.max_thumbnails, 5);
        assert_eq!(c.preview_render_width(), 1200);
        assert_eq!(c.planned_artifacts(12), 8);
        assert_eq!(c.planned_artifacts(2), 5);
    }

    #[test]
    fn download_ttl_is_bounded() {
        let ttl = |secs| ServerConfig {
            signed_url_ttl_secs: secs,
            ..ServerConfig::default()
        };
        assert_eq!(ServerConfig::default().download_ttl_secs(), 3600);
        assert_eq!(ttl(0).download_ttl_secs(), 1);
        assert_eq!(ttl(u64::MAX).download_ttl_secs(), MAX_SIGNED_URL_TTL_SECS);
    }

    #[test]
    fn builder_clamps() {
        let c = ProcessingConfig::builder()
            .jpeg_quality(0)
            .thumbnail_width(10_000)
            .max_thumbnails(99)
            .build()
            .unwrap();
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.thumbnail_width, 1000);
        assert_eq!(c.max_thumbnails, 20);
    }

    #[test]
    fn builder_rejects_empty_plan() {
        let err = ProcessingConfig::builder()
            .preview_sizes(vec![])
            .max_thumbnails(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, PrintsError::InvalidConfig(_)));
    }

    #[test]
    fn preview_sizes_sorted_and_deduped() {
        let c = ProcessingConfig::builder()
            .preview_sizes(vec![PreviewSize::Large, PreviewSize::Small, PreviewSize::Large])
            .build()
            .unwrap();
        assert_eq!(c.preview_sizes, vec![PreviewSize::Small, PreviewSize::Large]);
    }

    #[test]
    fn supabase_config_trims_and_redacts() {
        let c = SupabaseConfig::new("https://x.supabase.co/", "secret-key");
        assert_eq!(c.url, "https://x.supabase.co");
        assert_eq!(c.bucket, DEFAULT_BUCKET);
        assert!(c.validate().is_ok());
        assert!(!format!("{c:?}").contains("secret-key"));
    }

    #[test]
    fn supabase_config_rejects_bad_url() {
        let c = SupabaseConfig::new("ftp://x", "k");
        assert!(c.validate().is_err());
        let c = SupabaseConfig::new("https://x", " ");
        assert!(c.validate().is_err());
    }
}
