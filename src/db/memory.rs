//! In-memory repositories for tests and local development.

use super::{page_bounds, CatalogRepository, FileRepository};
use crate::error::PrintsError;
use crate::models::{
    Download, FileUpload, FileUploadPatch, NewDownload, NewFileUpload, NewProduct, Order,
    OrderItem, Product, ProductPatch, ProductQuery,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct MemoryDb {
    files: RwLock<HashMap<Uuid, FileUpload>>,
    products: RwLock<HashMap<Uuid, Product>>,
    orders: RwLock<HashMap<Uuid, Order>>,
    order_items: RwLock<Vec<OrderItem>>,
    downloads: RwLock<Vec<Download>>,
    /// Every status written to `file_uploads`, in order, for transition assertions.
    status_log: RwLock<Vec<(Uuid, crate::models::ProcessingStatus)>>,
    offline: AtomicBool,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `ping` fail, as if the database were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub async fn seed_file(&self, row: FileUpload) {
        self.files.write().await.insert(row.id, row);
    }

    pub async fn seed_product(&self, row: Product) {
        self.products.write().await.insert(row.id, row);
    }

    pub async fn seed_order(&self, order: Order, items: Vec<OrderItem>) {
        self.orders.write().await.insert(order.id, order);
        self.order_items.write().await.extend(items);
    }

    pub async fn downloads(&self) -> Vec<Download> {
        self.downloads.read().await.clone()
    }

    pub async fn status_log(&self, id: Uuid) -> Vec<crate::models::ProcessingStatus> {
        self.status_log
            .read()
            .await
            .iter()
            .filter(|(row, _)| *row == id)
            .map(|(_, s)| *s)
            .collect()
    }
}

#[async_trait]
impl FileRepository for MemoryDb {
    async fn get_file_upload(&self, id: Uuid) -> Result<Option<FileUpload>, PrintsError> {
        Ok(self.files.read().await.get(&id).cloned())
    }

    async fn insert_file_upload(&self, new: &NewFileUpload) -> Result<FileUpload, PrintsError> {
        let row = FileUpload {
            id: new.id,
            product_id: new.product_id,
            file_name: new.file_name.clone(),
            storage_path: new.storage_path.clone(),
            file_size: new.file_size,
            mime_type: new.mime_type.clone(),
            processing_status: new.processing_status,
            processing_error: None,
            page_count: None,
            metadata: None,
            preview_urls: None,
            thumbnail_urls: None,
            created_at: Utc::now(),
            processed_at: None,
        };
        self.files.write().await.insert(row.id, row.clone());
        self.status_log
            .write()
            .await
            .push((row.id, row.processing_status));
        Ok(row)
    }

    async fn update_file_upload(
        &self,
        id: Uuid,
        patch: &FileUploadPatch,
    ) -> Result<FileUpload, PrintsError> {
        let mut files = self.files.write().await;
        let row = files.get_mut(&id).ok_or(PrintsError::FileNotFound { id })?;
        patch.apply_to(row);
        if let Some(status) = patch.processing_status {
            self.status_log.write().await.push((id, status));
        }
        Ok(row.clone())
    }

    async fn delete_file_upload(&self, id: Uuid) -> Result<bool, PrintsError> {
        Ok(self.files.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl CatalogRepository for MemoryDb {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, PrintsError> {
        let (limit, offset) = page_bounds(query);
        let mut rows: Vec<Product> = self
            .products
            .read()
            .await
            .values()
            .filter(|p| query.status.is_none_or(|s| p.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(rows
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, PrintsError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn insert_product(&self, new: &NewProduct) -> Result<Product, PrintsError> {
        let mut products = self.products.write().await;
        if products.values().any(|p| p.slug == new.slug) {
            return Err(PrintsError::Validation(format!(
                "slug '{}' is already taken",
                new.slug
            )));
        }
        let now = Utc::now();
        let row = Product {
            id: new.id,
            title: new.title.clone(),
            slug: new.slug.clone(),
            description: new.description.clone(),
            price_cents: new.price_cents,
            currency: new.currency.clone(),
            status: new.status,
            file_id: new.file_id,
            preview_image_url: new.preview_image_url.clone(),
            created_at: now,
            updated_at: now,
        };
        products.insert(row.id, row.clone());
        Ok(row)
    }

    async fn update_product(
        &self,
        id: Uuid,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, PrintsError> {
        let mut products = self.products.write().await;
        if let Some(ref slug) = patch.slug {
            if products.values().any(|p| p.id != id && p.slug == *slug) {
                return Err(PrintsError::Validation(format!(
                    "slug '{slug}' is already taken"
                )));
            }
        }
        Ok(products.get_mut(&id).map(|p| {
            patch.apply_to(p);
            p.clone()
        }))
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, PrintsError> {
        Ok(self.products.write().await.remove(&id).is_some())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, PrintsError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, PrintsError> {
        Ok(self
            .order_items
            .read()
            .await
            .iter()
            .filter(|i| i.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn count_downloads(&self, order_item_id: Uuid) -> Result<u32, PrintsError> {
        Ok(self
            .downloads
            .read()
            .await
            .iter()
            .filter(|d| d.order_item_id == order_item_id)
            .count() as u32)
    }

    async fn insert_download(&self, new: &NewDownload) -> Result<Download, PrintsError> {
        let row = Download {
            id: new.id,
            order_item_id: new.order_item_id,
            file_id: new.file_id,
            downloaded_at: new.downloaded_at,
            ip_address: new.ip_address.clone(),
        };
        self.downloads.write().await.push(row.clone());
        Ok(row)
    }

    async fn ping(&self) -> Result<(), PrintsError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PrintsError::database("products", "connection refused"));
        }
        Ok(())
    }
}
