//! Database access for the marketplace tables.
//!
//! Two narrow traits split what the pipeline needs ([`FileRepository`]) from
//! what the HTTP catalog/order handlers need ([`CatalogRepository`]). Both are
//! implemented by [`PostgrestDb`] (Supabase's REST layer over Postgres) and by
//! [`MemoryDb`] for tests.

mod memory;
mod postgrest;

pub use memory::MemoryDb;
pub use postgrest::PostgrestDb;

use crate::error::PrintsError;
use crate::models::{
    Download, FileUpload, FileUploadPatch, NewDownload, NewFileUpload, NewProduct, Order,
    OrderItem, Product, ProductPatch, ProductQuery,
};
use async_trait::async_trait;
use uuid::Uuid;

/// Default and maximum page sizes for product listings.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Read/update access to `file_uploads`.
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn get_file_upload(&self, id: Uuid) -> Result<Option<FileUpload>, PrintsError>;

    async fn insert_file_upload(&self, new: &NewFileUpload) -> Result<FileUpload, PrintsError>;

    /// Apply `patch`; a missing row is `PrintsError::FileNotFound`.
    async fn update_file_upload(
        &self,
        id: Uuid,
        patch: &FileUploadPatch,
    ) -> Result<FileUpload, PrintsError>;

    /// Returns whether a row was deleted.
    async fn delete_file_upload(&self, id: Uuid) -> Result<bool, PrintsError>;
}

/// Products, orders, and download tracking.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, PrintsError>;

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, PrintsError>;

    async fn insert_product(&self, new: &NewProduct) -> Result<Product, PrintsError>;

    async fn update_product(
        &self,
        id: Uuid,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, PrintsError>;

    async fn delete_product(&self, id: Uuid) -> Result<bool, PrintsError>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, PrintsError>;

    async fn list_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, PrintsError>;

    async fn count_downloads(&self, order_item_id: Uuid) -> Result<u32, PrintsError>;

    async fn insert_download(&self, new: &NewDownload) -> Result<Download, PrintsError>;

    /// Cheap reachability probe for `/api/health`.
    async fn ping(&self) -> Result<(), PrintsError>;
}

/// Resolve a listing's `(limit, offset)` with defaults and the page-size cap.
pub fn page_bounds(query: &ProductQuery) -> (u32, u32) {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (limit, query.offset.unwrap_or(0))
}
