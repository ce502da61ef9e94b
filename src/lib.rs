//! # mjk-prints
//!
//! Backend for a digital print marketplace: a product catalog, PDF uploads
//! with generated previews, and order downloads, over a hosted Supabase
//! project (PostgREST for rows, Storage for blobs).
//!
//! ## Processing Pipeline
//!
//! ```text
//! file_uploads row (pending)
//!  │
//!  ├─ 1. Input    download the PDF from the bucket, check %PDF magic
//!  ├─ 2. Inspect  metadata + page count via pdfium (spawn_blocking)
//!  ├─ 3. Render   page 1 at preview width, pages 1..=5 at thumbnail width
//!  ├─ 4. Resize   small / medium / large previews (Lanczos3)
//!  ├─ 5. Encode   JPEG, quality 85
//!  └─ 6. Upload   deterministic paths, then mark the row completed
//! ```
//!
//! A failure on one preview or thumbnail is logged and recorded in
//! [`ProcessingOutput::failures`]; the file still completes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mjk_prints::{process_file, PdfiumRenderer, PostgrestDb, ProcessContext,
//!     ProcessingConfig, SupabaseClient, SupabaseConfig, SupabaseStorage};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SupabaseClient::new(SupabaseConfig::new(
//!         "https://project.supabase.co",
//!         std::env::var("SUPABASE_SERVICE_ROLE_KEY")?,
//!     ))?;
//!     let db = Arc::new(PostgrestDb::new(client.clone()));
//!     let ctx = ProcessContext {
//!         files: db.clone(),
//!         store: Arc::new(SupabaseStorage::new(client)),
//!         renderer: Arc::new(PdfiumRenderer::new()),
//!         catalog: Some(db),
//!     };
//!     let id = "1f0e6c1e-7a43-4c8e-9a55-2f7f3c1b9d10".parse()?;
//!     let output = process_file(id, &ctx, &ProcessingConfig::default()).await?;
//!     println!("{} artifacts", output.stats.succeeded);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mjk-prints` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod storage;
pub mod supabase;
pub mod uploads;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{
    PreviewSize, ProcessingConfig, ProcessingConfigBuilder, ServerConfig, SupabaseConfig,
    DEFAULT_BUCKET, MAX_SIGNED_URL_TTL_SECS,
};
pub use db::{CatalogRepository, FileRepository, MemoryDb, PostgrestDb};
pub use error::{ArtifactError, PrintsError};
pub use output::{ArtifactKind, GeneratedImage, PdfMetadata, ProcessingOutput, ProcessingStats};
pub use pipeline::render::{PageRenderer, PdfiumRenderer, RenderTarget, RenderedPage};
pub use process::{inspect_bytes, process_file, ProcessContext};
pub use progress::{NoopProgressCallback, ProcessingProgressCallback, ProgressCallback};
pub use storage::{BlobStore, MemoryStore, SupabaseStorage};
pub use supabase::SupabaseClient;
