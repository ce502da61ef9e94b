//! Order lookup and download grants.

use super::{AppError, Result, SharedState};
use crate::catalog;
use crate::models::{Order, OrderItem};
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use uuid::Uuid;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/:id", get(get_order))
        .route("/:id/items/:item_id/download", post(create_download))
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub url: String,
    pub expires_at: DateTime<Utc>,
    pub file_name: String,
    /// `None` when the item has no download limit.
    pub downloads_remaining: Option<u32>,
}

/// GET /api/orders/:id
pub async fn get_order(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>> {
    let order = state
        .catalog
        .get_order(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order {id} not found")))?;
    let items = state.catalog.list_order_items(id).await?;
    Ok(Json(OrderResponse { order, items }))
}

/// First hop of `X-Forwarded-For`, if the proxy set one.
fn client_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// POST /api/orders/:id/items/:item_id/download
pub async fn create_download(
    State(state): State<SharedState>,
    Path((order_id, item_id)): Path<(Uuid, Uuid)>,
    headers: HeaderMap,
) -> Result<Json<DownloadResponse>> {
    let grant = catalog::authorize_download(state.catalog.as_ref(), order_id, item_id).await?;

    let file = state
        .files
        .get_file_upload(grant.file_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File upload {} not found", grant.file_id)))?;

    let ttl = state.server.download_ttl_secs();
    let url = state.store.signed_url(&file.storage_path, ttl).await?;

    catalog::record_download(state.catalog.as_ref(), &grant, client_ip(&headers)).await?;

    let downloads_remaining = grant.item.max_downloads.map(|max| {
        let max = u32::try_from(max).unwrap_or(0);
        max.saturating_sub(grant.previous_downloads + 1)
    });

    Ok(Json(DownloadResponse {
        url,
        expires_at: Utc::now() + Duration::seconds(ttl as i64),
        file_name: file.file_name,
        downloads_remaining,
    }))
}
