//! PDF rasterisation and metadata extraction behind the [`PageRenderer`] seam.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async contexts.
//! [`PdfiumRenderer`] moves every call onto the blocking pool so Tokio worker
//! threads never stall during CPU-heavy rendering.
//!
//! ## Failure granularity
//!
//! A document that will not open is fatal ([`PrintsError::CorruptPdf`]). A
//! single page that fails to render is reported per page so the caller can
//! skip that thumbnail and keep the rest.

use crate::error::PrintsError;
use crate::output::PdfMetadata;
use async_trait::async_trait;
use bytes::Bytes;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable naming an existing pdfium shared library.
pub const PDFIUM_LIB_PATH_ENV: &str = "PDFIUM_LIB_PATH";

/// Output geometry for a render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderTarget {
    /// Target width in pixels; height follows the page aspect ratio.
    pub width: u32,
    /// Height cap in pixels for unusually tall pages.
    pub max_height: u32,
}

/// One rendered page: 0-based index and either the bitmap or a failure detail.
pub type RenderedPage = (usize, Result<DynamicImage, String>);

/// The image-render primitive the pipeline depends on.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Read document metadata without rendering.
    ///
    /// `source` names the document in error messages (usually its storage path).
    async fn inspect(&self, source: &str, pdf: Bytes) -> Result<PdfMetadata, PrintsError>;

    /// Rasterise the given 0-based pages.
    ///
    /// Indices past the end of the document are skipped with a warning and do
    /// not appear in the result.
    async fn render(
        &self,
        source: &str,
        pdf: Bytes,
        page_indices: &[usize],
        target: RenderTarget,
    ) -> Result<Vec<RenderedPage>, PrintsError>;
}

/// [`PageRenderer`] backed by pdfium.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRenderer {
    library_path: Option<PathBuf>,
}

impl PdfiumRenderer {
    /// Bind from `PDFIUM_LIB_PATH`, then `./`, then the system library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind to a specific pdfium library file.
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    /// Try binding once up front so a missing library surfaces at startup
    /// rather than on the first upload.
    pub async fn check_binding(&self) -> Result<(), PrintsError> {
        let path = self.library_path.clone();
        tokio::task::spawn_blocking(move || bind_pdfium(path.as_deref()).map(|_| ()))
            .await
            .map_err(|e| PrintsError::Internal(format!("Binding task panicked: {}", e)))?
    }
}

#[async_trait]
impl PageRenderer for PdfiumRenderer {
    async fn inspect(&self, source: &str, pdf: Bytes) -> Result<PdfMetadata, PrintsError> {
        let path = self.library_path.clone();
        let source = source.to_string();

        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium(path.as_deref())?;
            extract_metadata_blocking(&pdfium, &source, &pdf)
        })
        .await
        .map_err(|e| PrintsError::Internal(format!("Metadata task panicked: {}", e)))?
    }

    async fn render(
        &self,
        source: &str,
        pdf: Bytes,
        page_indices: &[usize],
        target: RenderTarget,
    ) -> Result<Vec<RenderedPage>, PrintsError> {
        let path = self.library_path.clone();
        let source = source.to_string();
        let indices = page_indices.to_vec();

        tokio::task::spawn_blocking(move || {
            let pdfium = bind_pdfium(path.as_deref())?;
            render_pages_blocking(&pdfium, &source, &pdf, &indices, target)
        })
        .await
        .map_err(|e| PrintsError::Internal(format!("Render task panicked: {}", e)))?
    }
}

/// Bind to pdfium: explicit path, then `PDFIUM_LIB_PATH`, then the working
/// directory, then the system library search path.
pub fn bind_pdfium(library_path: Option<&Path>) -> Result<Pdfium, PrintsError> {
    let env_path = std::env::var_os(PDFIUM_LIB_PATH_ENV).map(PathBuf::from);

    let bindings = match library_path.map(Path::to_path_buf).or(env_path) {
        Some(p) => Pdfium::bind_to_library(&p)
            .map_err(|e| PrintsError::PdfiumBindingFailed(format!("{}: {:?}", p.display(), e)))?,
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| PrintsError::PdfiumBindingFailed(format!("{:?}", e)))?,
    };

    Ok(Pdfium::new(bindings))
}

fn open_document<'a>(
    pdfium: &'a Pdfium,
    source: &str,
    pdf: &'a [u8],
) -> Result<PdfDocument<'a>, PrintsError> {
    pdfium.load_pdf_from_byte_slice(pdf, None).map_err(|e| {
        let err_str = format!("{:?}", e);
        let detail = if err_str.contains("Password") || err_str.contains("password") {
            "document is password-protected".to_string()
        } else {
            err_str
        };
        PrintsError::CorruptPdf {
            path: source.to_string(),
            detail,
        }
    })
}

/// Blocking implementation of metadata extraction.
fn extract_metadata_blocking(
    pdfium: &Pdfium,
    source: &str,
    pdf: &[u8],
) -> Result<PdfMetadata, PrintsError> {
    let document = open_document(pdfium, source, pdf)?;

    let metadata = document.metadata();
    let pages = document.pages();
    let page_count = pages.len() as usize;

    if page_count == 0 {
        return Err(PrintsError::EmptyDocument {
            path: source.to_string(),
        });
    }

    let get_meta = |tag: PdfDocumentMetadataTagType| -> Option<String> {
        metadata.get(tag).and_then(|t| {
            let v = t.value().trim().to_string();
            if v.is_empty() {
                None
            } else {
                Some(v)
            }
        })
    };

    let (page_width_pts, page_height_pts) = pages
        .get(0)
        .map(|p| (p.width().value, p.height().value))
        .unwrap_or((0.0, 0.0));

    info!("PDF {} loaded: {} pages", source, page_count);

    Ok(PdfMetadata {
        title: get_meta(PdfDocumentMetadataTagType::Title),
        author: get_meta(PdfDocumentMetadataTagType::Author),
        subject: get_meta(PdfDocumentMetadataTagType::Subject),
        creator: get_meta(PdfDocumentMetadataTagType::Creator),
        producer: get_meta(PdfDocumentMetadataTagType::Producer),
        creation_date: get_meta(PdfDocumentMetadataTagType::CreationDate),
        modification_date: get_meta(PdfDocumentMetadataTagType::ModificationDate),
        page_count,
        pdf_version: format!("{:?}", document.version()),
        page_width_pts,
        page_height_pts,
    })
}

/// Blocking implementation of page rendering.
fn render_pages_blocking(
    pdfium: &Pdfium,
    source: &str,
    pdf: &[u8],
    page_indices: &[usize],
    target: RenderTarget,
) -> Result<Vec<RenderedPage>, PrintsError> {
    let document = open_document(pdfium, source, pdf)?;
    let pages = document.pages();
    let total_pages = pages.len() as usize;

    let render_config = PdfRenderConfig::new()
        .set_target_width(target.width as i32)
        .set_maximum_height(target.max_height as i32);

    let mut results = Vec::with_capacity(page_indices.len());

    for &idx in page_indices {
        if idx >= total_pages {
            warn!(
                "Skipping page {} (out of range, total={})",
                idx + 1,
                total_pages
            );
            continue;
        }

        let rendered = pages
            .get(idx as u16)
            .map_err(|e| format!("{:?}", e))
            .and_then(|page| {
                page.render_with_config(&render_config)
                    .map(|bitmap| bitmap.as_image())
                    .map_err(|e| format!("{:?}", e))
            });

        match &rendered {
            Ok(image) => debug!(
                "Rendered page {} → {}x{} px",
                idx + 1,
                image.width(),
                image.height()
            ),
            Err(e) => warn!("Page {} failed to render: {}", idx + 1, e),
        }

        results.push((idx, rendered));
    }

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// An A4 document with `pages` blank pages, or `None` when no
    /// pdfium library can be bound on this machine.
    fn blank_document(pages: usize) -> Option<(Pdfium, Vec<u8>)> {
        let pdfium = bind_pdfium(None).ok()?;
        let bytes = {
            let mut document = pdfium.create_new_pdf().ok()?;
            for _ in 0..pages {
                document
                    .pages_mut()
                    .create_page_at_end(PdfPagePaperSize::a4())
                    .ok()?;
            }
            document.save_to_bytes().ok()?
        };
        Some((pdfium, bytes))
    }

    #[test]
    fn renders_owned_images_at_target_width() {
        let Some((pdfium, pdf)) = blank_document(2) else {
            println!("SKIP: pdfium not available");
            return;
        };
        let target = RenderTarget {
            width: 240,
            max_height: 10_000,
        };
        let pages = render_pages_blocking(&pdfium, "blank.pdf", &pdf, &[0, 1, 5], target)
            .expect("document opens");

        assert_eq!(pages.len(), 2);
        for (idx, page) in pages {
            let img = page.expect("page renders");
            assert_eq!(img.width(), 240, "page {idx}");
            assert!(img.height() > img.width());
        }
    }

    #[test]
    fn garbage_is_corrupt() {
        let Ok(pdfium) = bind_pdfium(None) else {
            println!("SKIP: pdfium not available");
            return;
        };
        let err = render_pages_blocking(
            &pdfium,
            "junk.pdf",
            b"%PDF-1.7 junk",
            &[0],
            RenderTarget {
                width: 100,
                max_height: 100,
            },
        )
        .unwrap_err();
        assert!(matches!(err, PrintsError::CorruptPdf { .. }));
    }
}
