//! Product catalog handlers.

use super::{AppError, Result, SharedState};
use crate::catalog::{CreateProductRequest, UpdateProductRequest};
use crate::models::{Product, ProductQuery};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use uuid::Uuid;

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).patch(update_product).delete(delete_product),
        )
}

fn product_not_found(id: Uuid) -> AppError {
    AppError::NotFound(format!("Product {id} not found"))
}

/// GET /api/products
pub async fn list_products(
    State(state): State<SharedState>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<Vec<Product>>> {
    let products = state.catalog.list_products(&query).await?;
    Ok(Json(products))
}

/// POST /api/products
pub async fn create_product(
    State(state): State<SharedState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>)> {
    let new = payload.validate()?;
    let product = state.catalog.insert_product(&new).await?;
    tracing::info!("Created product {} ({})", product.id, product.slug);
    Ok((StatusCode::CREATED, Json(product)))
}

/// GET /api/products/:id
pub async fn get_product(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Product>> {
    state
        .catalog
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| product_not_found(id))
}

/// PATCH /api/products/:id
pub async fn update_product(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<Json<Product>> {
    let patch = payload.validate()?;
    state
        .catalog
        .update_product(id, &patch)
        .await?
        .map(Json)
        .ok_or_else(|| product_not_found(id))
}

/// DELETE /api/products/:id
pub async fn delete_product(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    if state.catalog.delete_product(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(product_not_found(id))
    }
}
