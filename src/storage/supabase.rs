//! Supabase Storage implementation of [`BlobStore`].

use super::BlobStore;
use crate::error::PrintsError;
use crate::supabase::{error_body, SupabaseClient};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

#[derive(Clone, Debug)]
pub struct SupabaseStorage {
    client: SupabaseClient,
}

#[derive(Deserialize)]
struct SignedUrlResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

impl SupabaseStorage {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlobStore for SupabaseStorage {
    async fn get(&self, path: &str) -> Result<Bytes, PrintsError> {
        let url = self.client.object_url(path);
        debug!("GET {}", url);

        let response = self
            .client
            .http()
            .get(&url)
            .send()
            .await
            .map_err(|e| PrintsError::storage("download", path, e))?;

        if !response.status().is_success() {
            return Err(PrintsError::storage(
                "download",
                path,
                error_body(response).await,
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| PrintsError::storage("download", path, e))?;
        info!("Downloaded {} ({} bytes)", path, bytes.len());
        Ok(bytes)
    }

    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), PrintsError> {
        let url = self.client.object_url(path);
        let len = data.len();

        let response = self
            .client
            .http()
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(data)
            .send()
            .await
            .map_err(|e| PrintsError::storage("upload", path, e))?;

        if !response.status().is_success() {
            return Err(PrintsError::storage(
                "upload",
                path,
                error_body(response).await,
            ));
        }

        debug!("Uploaded {} ({} bytes)", path, len);
        Ok(())
    }

    async fn delete(&self, paths: &[String]) -> Result<(), PrintsError> {
        if paths.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .http()
            .delete(self.client.bucket_url())
            .json(&json!({ "prefixes": paths }))
            .send()
            .await
            .map_err(|e| PrintsError::storage("delete", paths.join(","), e))?;

        if !response.status().is_success() {
            return Err(PrintsError::storage(
                "delete",
                paths.join(","),
                error_body(response).await,
            ));
        }

        info!("Deleted {} object(s)", paths.len());
        Ok(())
    }

    async fn signed_url(&self, path: &str, expires_in_secs: u64) -> Result<String, PrintsError> {
        let response = self
            .client
            .http()
            .post(self.client.sign_url(path))
            .json(&json!({ "expiresIn": expires_in_secs }))
            .send()
            .await
            .map_err(|e| PrintsError::storage("sign", path, e))?;

        if !response.status().is_success() {
            return Err(PrintsError::storage("sign", path, error_body(response).await));
        }

        let body: SignedUrlResponse = response
            .json()
            .await
            .map_err(|e| PrintsError::storage("sign", path, e))?;

        Ok(format!("{}{}", self.client.storage_base(), body.signed_url))
    }

    async fn health_check(&self) -> Result<(), PrintsError> {
        let url = format!(
            "{}/bucket/{}",
            self.client.storage_base(),
            self.client.bucket()
        );
        let response = self
            .client
            .http()
            .get(&url)
            .send()
            .await
            .map_err(|e| PrintsError::storage("health", self.client.bucket(), e))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(PrintsError::storage(
                "health",
                self.client.bucket(),
                error_body(response).await,
            ))
        }
    }

    fn public_url(&self, path: &str) -> String {
        self.client.public_object_url(path)
    }
}
