//! Pipeline stages for turning an uploaded PDF into preview images.
//!
//! Each submodule implements exactly one transformation step so each can be
//! tested alone and the rendering backend can be swapped without touching
//! the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ render ──▶ resize ──▶ encode ──▶ (upload)
//! (bucket)  (pdfium)   (image)    (JPEG)
//! ```
//!
//! 1. [`input`]: download the PDF from blob storage and check its magic bytes
//! 2. [`render`]: read metadata and rasterise pages; runs in `spawn_blocking`
//!    because pdfium is not async-safe
//! 3. [`resize`]: derive each preview width from one high-resolution render
//! 4. [`encode`]: flatten to RGB and JPEG-encode for the bucket

pub mod encode;
pub mod input;
pub mod render;
pub mod resize;
