//! PostgREST implementation of the repository traits.
//!
//! Every call is a single HTTP request against `{url}/rest/v1/{table}` with
//! `id=eq.{uuid}` style filters. Writes ask for
//! `Prefer: return=representation` so the stored row comes back in the
//! response and we never issue a follow-up read.

use super::{page_bounds, CatalogRepository, FileRepository};
use crate::error::PrintsError;
use crate::models::{
    Download, FileUpload, FileUploadPatch, NewDownload, NewFileUpload, NewProduct, Order,
    OrderItem, Product, ProductPatch, ProductQuery,
};
use crate::supabase::{error_body, SupabaseClient};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

const FILE_UPLOADS: &str = "file_uploads";
const PRODUCTS: &str = "products";
const ORDERS: &str = "orders";
const ORDER_ITEMS: &str = "order_items";
const DOWNLOADS: &str = "downloads";

const RETURN_REPRESENTATION: (&str, &str) = ("Prefer", "return=representation");

#[derive(Clone, Debug)]
pub struct PostgrestDb {
    client: SupabaseClient,
}

impl PostgrestDb {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn read_rows<T: DeserializeOwned>(
        table: &'static str,
        response: reqwest::Response,
    ) -> Result<Vec<T>, PrintsError> {
        if !response.status().is_success() {
            return Err(PrintsError::database(table, error_body(response).await));
        }
        response
            .json::<Vec<T>>()
            .await
            .map_err(|e| PrintsError::database(table, e))
    }

    async fn select(
        &self,
        table: &'static str,
        filters: &[(&str, String)],
    ) -> Result<reqwest::Response, PrintsError> {
        debug!("SELECT {} {:?}", table, filters);
        self.client
            .http()
            .get(self.client.table_url(table))
            .query(filters)
            .send()
            .await
            .map_err(|e| PrintsError::database(table, e))
    }

    async fn select_by_id<T: DeserializeOwned>(
        &self,
        table: &'static str,
        id: Uuid,
    ) -> Result<Option<T>, PrintsError> {
        let response = self
            .select(table, &[("id", format!("eq.{id}")), ("select", "*".into())])
            .await?;
        let rows: Vec<T> = Self::read_rows(table, response).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        table: &'static str,
        body: &B,
    ) -> Result<T, PrintsError> {
        let response = self
            .client
            .http()
            .post(self.client.table_url(table))
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(body)
            .send()
            .await
            .map_err(|e| PrintsError::database(table, e))?;
        let rows: Vec<T> = Self::read_rows(table, response).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| PrintsError::database(table, "insert returned no row"))
    }

    async fn update_by_id<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        table: &'static str,
        id: Uuid,
        body: &B,
    ) -> Result<Option<T>, PrintsError> {
        let response = self
            .client
            .http()
            .patch(self.client.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .json(body)
            .send()
            .await
            .map_err(|e| PrintsError::database(table, e))?;
        let rows: Vec<T> = Self::read_rows(table, response).await?;
        Ok(rows.into_iter().next())
    }

    async fn delete_by_id(&self, table: &'static str, id: Uuid) -> Result<bool, PrintsError> {
        let response = self
            .client
            .http()
            .delete(self.client.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header(RETURN_REPRESENTATION.0, RETURN_REPRESENTATION.1)
            .send()
            .await
            .map_err(|e| PrintsError::database(table, e))?;
        let rows: Vec<serde_json::Value> = Self::read_rows(table, response).await?;
        Ok(!rows.is_empty())
    }
}

#[derive(Deserialize)]
struct IdOnly {
    #[allow(dead_code)]
    id: Uuid,
}

#[async_trait]
impl FileRepository for PostgrestDb {
    async fn get_file_upload(&self, id: Uuid) -> Result<Option<FileUpload>, PrintsError> {
        self.select_by_id(FILE_UPLOADS, id).await
    }

    async fn insert_file_upload(&self, new: &NewFileUpload) -> Result<FileUpload, PrintsError> {
        self.insert(FILE_UPLOADS, new).await
    }

    async fn update_file_upload(
        &self,
        id: Uuid,
        patch: &FileUploadPatch,
    ) -> Result<FileUpload, PrintsError> {
        self.update_by_id(FILE_UPLOADS, id, patch)
            .await?
            .ok_or(PrintsError::FileNotFound { id })
    }

    async fn delete_file_upload(&self, id: Uuid) -> Result<bool, PrintsError> {
        self.delete_by_id(FILE_UPLOADS, id).await
    }
}

#[async_trait]
impl CatalogRepository for PostgrestDb {
    async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, PrintsError> {
        let (limit, offset) = page_bounds(query);
        let mut filters = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
            ("limit", limit.to_string()),
            ("offset", offset.to_string()),
        ];
        if let Some(status) = query.status {
            filters.push(("status", format!("eq.{}", status.as_str())));
        }
        let response = self.select(PRODUCTS, &filters).await?;
        Self::read_rows(PRODUCTS, response).await
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, PrintsError> {
        self.select_by_id(PRODUCTS, id).await
    }

    async fn insert_product(&self, new: &NewProduct) -> Result<Product, PrintsError> {
        self.insert(PRODUCTS, new).await
    }

    async fn update_product(
        &self,
        id: Uuid,
        patch: &ProductPatch,
    ) -> Result<Option<Product>, PrintsError> {
        self.update_by_id(PRODUCTS, id, patch).await
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool, PrintsError> {
        self.delete_by_id(PRODUCTS, id).await
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, PrintsError> {
        self.select_by_id(ORDERS, id).await
    }

    async fn list_order_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, PrintsError> {
        let response = self
            .select(
                ORDER_ITEMS,
                &[
                    ("order_id", format!("eq.{order_id}")),
                    ("select", "*".into()),
                ],
            )
            .await?;
        Self::read_rows(ORDER_ITEMS, response).await
    }

    async fn count_downloads(&self, order_item_id: Uuid) -> Result<u32, PrintsError> {
        let response = self
            .select(
                DOWNLOADS,
                &[
                    ("order_item_id", format!("eq.{order_item_id}")),
                    ("select", "id".into()),
                ],
            )
            .await?;
        let rows: Vec<IdOnly> = Self::read_rows(DOWNLOADS, response).await?;
        Ok(rows.len() as u32)
    }

    async fn insert_download(&self, new: &NewDownload) -> Result<Download, PrintsError> {
        self.insert(DOWNLOADS, new).await
    }

    async fn ping(&self) -> Result<(), PrintsError> {
        let response = self
            .select(PRODUCTS, &[("select", "id".into()), ("limit", "1".into())])
            .await?;
        let _: Vec<IdOnly> = Self::read_rows(PRODUCTS, response).await?;
        Ok(())
    }
}
