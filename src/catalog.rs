//! Catalog rules: product payload validation, slugs, and download grants.
//!
//! Handlers stay thin; everything that decides whether a request is
//! acceptable lives here so it can be tested without HTTP.

use crate::db::CatalogRepository;
use crate::error::PrintsError;
use crate::models::{
    NewDownload, NewProduct, Order, OrderItem, OrderStatus, Product, ProductPatch, ProductStatus,
};
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_CURRENCY: &str = "USD";

static RE_NON_SLUG: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

/// Lowercase ASCII letters and digits separated by single hyphens.
///
/// Non-ASCII letters are dropped rather than transliterated.
pub fn slugify(input: &str) -> String {
    let lower = input.to_lowercase();
    RE_NON_SLUG
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

fn normalize_string(value: String) -> String {
    value.trim().to_string()
}

fn normalize_optional_string(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Patch value for a nullable text column: absent leaves it, blank clears it.
fn clearable_string(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| normalize_optional_string(Some(v)))
}

fn require_title(title: String) -> Result<String, PrintsError> {
    let title = normalize_string(title);
    if title.is_empty() {
        return Err(PrintsError::Validation("title cannot be blank".into()));
    }
    Ok(title)
}

fn ensure_non_negative(value: i64, field: &str) -> Result<(), PrintsError> {
    if value < 0 {
        Err(PrintsError::Validation(format!("{field} cannot be negative")))
    } else {
        Ok(())
    }
}

/// Three ASCII letters, returned uppercased.
fn normalize_currency(value: &str) -> Result<String, PrintsError> {
    let code = value.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(PrintsError::Validation(format!(
            "currency '{code}' is not a three-letter ISO code"
        )))
    }
}

fn derive_slug(explicit: Option<String>, title: &str) -> Result<String, PrintsError> {
    let slug = match normalize_optional_string(explicit) {
        Some(s) => slugify(&s),
        None => slugify(title),
    };
    if slug.is_empty() {
        return Err(PrintsError::Validation(
            "slug must contain at least one letter or digit".into(),
        ));
    }
    Ok(slug)
}

/// `POST /api/products` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateProductRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub price_cents: i64,
    pub currency: Option<String>,
    pub status: Option<ProductStatus>,
    pub file_id: Option<Uuid>,
    pub preview_image_url: Option<String>,
}

impl CreateProductRequest {
    pub fn validate(self) -> Result<NewProduct, PrintsError> {
        let title = require_title(
            self.title
                .ok_or_else(|| PrintsError::Validation("title is required".into()))?,
        )?;
        ensure_non_negative(self.price_cents, "price_cents")?;
        let currency = normalize_currency(self.currency.as_deref().unwrap_or(DEFAULT_CURRENCY))?;
        let slug = derive_slug(self.slug, &title)?;

        Ok(NewProduct {
            id: Uuid::new_v4(),
            title,
            slug,
            description: normalize_optional_string(self.description),
            price_cents: self.price_cents,
            currency,
            status: self.status.unwrap_or_default(),
            file_id: self.file_id,
            preview_image_url: normalize_optional_string(self.preview_image_url),
        })
    }
}

/// `PATCH /api/products/:id` body. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub slug: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub currency: Option<String>,
    pub status: Option<ProductStatus>,
    pub file_id: Option<Uuid>,
    pub preview_image_url: Option<String>,
}

impl UpdateProductRequest {
    pub fn validate(self) -> Result<ProductPatch, PrintsError> {
        let title = self.title.map(require_title).transpose()?;
        if let Some(price) = self.price_cents {
            ensure_non_negative(price, "price_cents")?;
        }
        let currency = self.currency.as_deref().map(normalize_currency).transpose()?;
        let slug = match self.slug {
            Some(s) => Some(derive_slug(Some(s), "")?),
            None => None,
        };

        Ok(ProductPatch {
            title,
            slug,
            description: clearable_string(self.description),
            price_cents: self.price_cents,
            currency,
            status: self.status,
            file_id: self.file_id,
            preview_image_url: clearable_string(self.preview_image_url),
            updated_at: Utc::now(),
        })
    }
}

/// What a buyer is allowed to download, once every check has passed.
#[derive(Debug, Clone)]
pub struct DownloadGrant {
    pub order: Order,
    pub item: OrderItem,
    pub product: Product,
    pub file_id: Uuid,
    /// Downloads recorded before this one.
    pub previous_downloads: u32,
}

/// Check an order item may be downloaded.
///
/// # Errors
/// - `NotFound` for a missing order, item, or product
/// - `Forbidden` when the order is not completed, the item is not part of
///   the order, the product has no file, or the download limit is used up
pub async fn authorize_download(
    catalog: &dyn CatalogRepository,
    order_id: Uuid,
    item_id: Uuid,
) -> Result<DownloadGrant, PrintsError> {
    let order = catalog
        .get_order(order_id)
        .await?
        .ok_or_else(|| PrintsError::NotFound {
            entity: "Order",
            id: order_id.to_string(),
        })?;

    if order.status != OrderStatus::Completed {
        return Err(PrintsError::Forbidden(format!(
            "order {order_id} is not completed"
        )));
    }

    let item = catalog
        .list_order_items(order_id)
        .await?
        .into_iter()
        .find(|i| i.id == item_id)
        .ok_or_else(|| PrintsError::NotFound {
            entity: "Order item",
            id: item_id.to_string(),
        })?;

    let product = catalog
        .get_product(item.product_id)
        .await?
        .ok_or_else(|| PrintsError::NotFound {
            entity: "Product",
            id: item.product_id.to_string(),
        })?;

    let file_id = product.file_id.ok_or_else(|| {
        PrintsError::Forbidden(format!("product {} has no downloadable file", product.id))
    })?;

    let previous_downloads = catalog.count_downloads(item.id).await?;
    if let Some(max) = item.max_downloads {
        if i64::from(previous_downloads) >= i64::from(max) {
            return Err(PrintsError::Forbidden(format!(
                "download limit of {max} reached"
            )));
        }
    }

    Ok(DownloadGrant {
        order,
        item,
        product,
        file_id,
        previous_downloads,
    })
}

/// Record a download against a grant.
pub async fn record_download(
    catalog: &dyn CatalogRepository,
    grant: &DownloadGrant,
    ip_address: Option<String>,
) -> Result<(), PrintsError> {
    let new = NewDownload {
        id: Uuid::new_v4(),
        order_item_id: grant.item.id,
        file_id: grant.file_id,
        downloaded_at: Utc::now(),
        ip_address,
    };
    catalog.insert_download(&new).await?;
    info!(
        "Download {} of item {} (order {})",
        grant.previous_downloads + 1,
        grant.item.id,
        grant.order.id
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("  Vintage Botanical -- Print #3 "), "vintage-botanical-print-3");
        assert_eq!(slugify("Café au lait"), "caf-au-lait");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn create_requires_title() {
        let err = CreateProductRequest::default().validate().unwrap_err();
        assert!(matches!(err, PrintsError::Validation(_)));

        let req = CreateProductRequest {
            title: Some("   ".into()),
            ..Default::default()
        };
        assert!(matches!(req.validate(), Err(PrintsError::Validation(_))));
    }

    #[test]
    fn create_normalises_fields() {
        let req = CreateProductRequest {
            title: Some("  Moon Chart  ".into()),
            description: Some("  ".into()),
            price_cents: 1200,
            currency: Some("eur".into()),
            ..Default::default()
        };
        let p = req.validate().unwrap();
        assert_eq!(p.title, "Moon Chart");
        assert_eq!(p.slug, "moon-chart");
        assert_eq!(p.description, None);
        assert_eq!(p.currency, "EUR");
        assert_eq!(p.status, ProductStatus::Draft);
    }

    #[test]
    fn create_rejects_negative_price_and_bad_currency() {
        let req = CreateProductRequest {
            title: Some("A".into()),
            price_cents: -1,
            ..Default::default()
        };
        assert!(req.validate().is_err());

        let req = CreateProductRequest {
            title: Some("A".into()),
            currency: Some("dollars".into()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_validates_only_present_fields() {
        let patch = UpdateProductRequest {
            price_cents: Some(500),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(patch.price_cents, Some(500));
        assert!(patch.title.is_none());

        let bad = UpdateProductRequest {
            title: Some("".into()),
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn update_blank_text_clears_column() {
        let patch = UpdateProductRequest {
            description: Some("   ".into()),
            preview_image_url: Some("".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.preview_image_url, Some(None));

        let patch = UpdateProductRequest {
            description: Some(" Giclée on cotton rag ".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(patch.description, Some(Some("Giclée on cotton rag".into())));
        assert_eq!(patch.preview_image_url, None);

        let json = serde_json::to_value(
            UpdateProductRequest {
                preview_image_url: Some("".into()),
                ..Default::default()
            }
            .validate()
            .unwrap(),
        )
        .unwrap();
        assert!(json["preview_image_url"].is_null());
        assert!(json.get("description").is_none());
    }
}
