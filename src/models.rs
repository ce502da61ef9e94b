//! Row types for the marketplace tables.
//!
//! These mirror the hosted Postgres schema as exposed by PostgREST. The
//! database owns the constraints; the types here only carry data and the
//! few enums whose string values the application branches on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// `file_uploads.processing_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An uploaded PDF and the results of processing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileUpload {
    pub id: Uuid,
    #[serde(default)]
    pub product_id: Option<Uuid>,
    pub file_name: String,
    pub storage_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub processing_status: ProcessingStatus,
    #[serde(default)]
    pub processing_error: Option<String>,
    #[serde(default)]
    pub page_count: Option<i32>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub preview_urls: Option<Value>,
    #[serde(default)]
    pub thumbnail_urls: Option<Value>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

/// Insert payload for `file_uploads`.
#[derive(Debug, Clone, Serialize)]
pub struct NewFileUpload {
    pub id: Uuid,
    pub product_id: Option<Uuid>,
    pub file_name: String,
    pub storage_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub processing_status: ProcessingStatus,
}

/// Partial update for `file_uploads`. `None` fields are left untouched.
///
/// `processing_error` is doubly optional so a patch can clear the column
/// (`Some(None)` serialises as `null`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileUploadPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<ProcessingStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_urls: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_urls: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl FileUploadPatch {
    /// Status-only transition; clears any previous error when `error` is `None`.
    pub fn status(status: ProcessingStatus, error: Option<String>) -> Self {
        Self {
            processing_status: Some(status),
            processing_error: Some(error),
            ..Default::default()
        }
    }

    /// Apply this patch to an in-memory row.
    pub fn apply_to(&self, row: &mut FileUpload) {
        if let Some(s) = self.processing_status {
            row.processing_status = s;
        }
        if let Some(ref e) = self.processing_error {
            row.processing_error = e.clone();
        }
        if let Some(n) = self.page_count {
            row.page_count = Some(n);
        }
        if let Some(ref m) = self.metadata {
            row.metadata = Some(m.clone());
        }
        if let Some(ref p) = self.preview_urls {
            row.preview_urls = Some(p.clone());
        }
        if let Some(ref t) = self.thumbnail_urls {
            row.thumbnail_urls = Some(t.clone());
        }
        if let Some(at) = self.processed_at {
            row.processed_at = Some(at);
        }
    }
}

// ── Catalog ──────────────────────────────────────────────────────────────

/// `products.status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    #[default]
    Draft,
    Active,
    Archived,
}

impl ProductStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(ProductStatus::Draft),
            "active" => Ok(ProductStatus::Active),
            "archived" => Ok(ProductStatus::Archived),
            other => Err(format!("unknown product status '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub status: ProductStatus,
    #[serde(default)]
    pub file_id: Option<Uuid>,
    #[serde(default)]
    pub preview_image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated insert payload for `products`.
#[derive(Debug, Clone, Serialize)]
pub struct NewProduct {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub price_cents: i64,
    pub currency: String,
    pub status: ProductStatus,
    pub file_id: Option<Uuid>,
    pub preview_image_url: Option<String>,
}

/// Validated partial update for `products`.
///
/// `description` and `preview_image_url` are doubly optional: `Some(None)`
/// clears the column.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProductPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProductStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_image_url: Option<Option<String>>,
    pub updated_at: DateTime<Utc>,
}

impl ProductPatch {
    pub fn apply_to(&self, p: &mut Product) {
        if let Some(ref v) = self.title {
            p.title = v.clone();
        }
        if let Some(ref v) = self.slug {
            p.slug = v.clone();
        }
        if let Some(ref v) = self.description {
            p.description = v.clone();
        }
        if let Some(v) = self.price_cents {
            p.price_cents = v;
        }
        if let Some(ref v) = self.currency {
            p.currency = v.clone();
        }
        if let Some(v) = self.status {
            p.status = v;
        }
        if let Some(v) = self.file_id {
            p.file_id = Some(v);
        }
        if let Some(ref v) = self.preview_image_url {
            p.preview_image_url = v.clone();
        }
        p.updated_at = self.updated_at;
    }
}

/// List filter for products.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub status: Option<ProductStatus>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

// ── Orders ───────────────────────────────────────────────────────────────

/// `orders.status`, written by the payment webhooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_email: String,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub currency: String,
    #[serde(default)]
    pub payment_provider: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub price_cents: i64,
    /// `None` means unlimited downloads.
    #[serde(default)]
    pub max_downloads: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Download {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub file_id: Uuid,
    pub downloaded_at: DateTime<Utc>,
    #[serde(default)]
    pub ip_address: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewDownload {
    pub id: Uuid,
    pub order_item_id: Uuid,
    pub file_id: Uuid,
    pub downloaded_at: DateTime<Utc>,
    pub ip_address: Option<String>,
}
