//! Shared HTTP client for the hosted Supabase project.
//!
//! Both the Storage API and PostgREST authenticate the same way: the
//! service-role key goes in the `apikey` header and as a bearer token.
//! [`SupabaseClient`] owns one `reqwest::Client` and builds URLs for both.

use crate::config::SupabaseConfig;
use crate::error::PrintsError;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use std::time::Duration;

/// Cheaply cloneable handle; `reqwest::Client` is an `Arc` internally.
#[derive(Clone, Debug)]
pub struct SupabaseClient {
    http: reqwest::Client,
    config: SupabaseConfig,
}

impl SupabaseClient {
    pub fn new(config: SupabaseConfig) -> Result<Self, PrintsError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.service_key)
            .map_err(|e| PrintsError::InvalidConfig(format!("service key: {e}")))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.service_key))
            .map_err(|e| PrintsError::InvalidConfig(format!("service key: {e}")))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PrintsError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub fn config(&self) -> &SupabaseConfig {
        &self.config
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    /// `{url}/storage/v1/object/{bucket}/{path}`
    pub fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.config.url,
            self.config.bucket,
            path.trim_start_matches('/')
        )
    }

    /// `{url}/storage/v1/object/public/{bucket}/{path}`
    pub fn public_object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.config.url,
            self.config.bucket,
            path.trim_start_matches('/')
        )
    }

    /// `{url}/storage/v1/object/sign/{bucket}/{path}`
    pub fn sign_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.config.url,
            self.config.bucket,
            path.trim_start_matches('/')
        )
    }

    /// `{url}/storage/v1/object/{bucket}` (bulk delete endpoint)
    pub fn bucket_url(&self) -> String {
        format!("{}/storage/v1/object/{}", self.config.url, self.config.bucket)
    }

    /// `{url}/storage/v1`; signed paths returned by the API are relative to this.
    pub fn storage_base(&self) -> String {
        format!("{}/storage/v1", self.config.url)
    }

    /// `{url}/rest/v1/{table}`
    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.url, table)
    }
}

/// Read an error body for logging, truncated so a proxy's HTML page doesn't
/// flood the logs.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let text = text.trim();
    if text.is_empty() {
        format!("HTTP {status}")
    } else if text.len() > 300 {
        let mut cut = 300;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("HTTP {status}: {}\u{2026}", &text[..cut])
    } else {
        format!("HTTP {status}: {text}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> SupabaseClient {
        SupabaseClient::new(SupabaseConfig::new("https://proj.supabase.co", "key")).unwrap()
    }

    #[test]
    fn builds_storage_urls() {
        let c = client();
        assert_eq!(
            c.object_url("/pdfs/1/a.pdf"),
            "https://proj.supabase.co/storage/v1/object/mjk-prints-storage/pdfs/1/a.pdf"
        );
        assert_eq!(
            c.public_object_url("previews/1/page-1-small.jpg"),
            "https://proj.supabase.co/storage/v1/object/public/mjk-prints-storage/previews/1/page-1-small.jpg"
        );
        assert_eq!(
            c.sign_url("pdfs/1/a.pdf"),
            "https://proj.supabase.co/storage/v1/object/sign/mjk-prints-storage/pdfs/1/a.pdf"
        );
    }

    #[test]
    fn builds_table_url() {
        assert_eq!(
            client().table_url("file_uploads"),
            "https://proj.supabase.co/rest/v1/file_uploads"
        );
    }

    #[test]
    fn rejects_invalid_config() {
        assert!(SupabaseClient::new(SupabaseConfig::new("proj.supabase.co", "key")).is_err());
    }
}
