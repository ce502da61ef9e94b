//! HTTP API: catalog, uploads, processing, and downloads over axum.
//!
//! ```text
//! /api/health
//! /api/products            /api/products/:id
//! /api/files               /api/files/:id      /api/files/:id/process
//! /api/orders/:id          /api/orders/:id/items/:item_id/download
//! ```

pub mod error;
pub mod files;
pub mod health;
pub mod orders;
pub mod products;

pub use error::{AppError, Result};

use crate::config::{ProcessingConfig, ServerConfig};
use crate::db::{CatalogRepository, FileRepository};
use crate::pipeline::render::PageRenderer;
use crate::process::ProcessContext;
use crate::storage::BlobStore;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Headroom over `max_upload_bytes` for multipart framing and the other fields.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Everything the handlers share.
pub struct AppState {
    pub files: Arc<dyn FileRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub store: Arc<dyn BlobStore>,
    pub renderer: Arc<dyn PageRenderer>,
    pub processing: ProcessingConfig,
    pub server: ServerConfig,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn process_context(&self) -> ProcessContext {
        ProcessContext {
            files: self.files.clone(),
            store: self.store.clone(),
            renderer: self.renderer.clone(),
            catalog: Some(self.catalog.clone()),
        }
    }
}

/// Build the full application router.
pub fn router(state: SharedState) -> Router {
    let body_limit = state.server.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD);

    let api = Router::new()
        .merge(health::router())
        .nest("/products", products::router())
        .nest("/files", files::router())
        .nest("/orders", orders::router());

    Router::new()
        .nest("/api", api)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
