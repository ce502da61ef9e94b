//! In-memory [`BlobStore`] for tests and local runs without a Supabase project.

use super::BlobStore;
use crate::error::PrintsError;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};
use tokio::sync::RwLock;

/// A stored object and its declared content type.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub content_type: String,
}

/// Bucket held in a `BTreeMap` so listings come back sorted.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<String, StoredObject>>,
    failing_puts: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` to `path` fail.
    pub async fn fail_puts_to(&self, path: impl Into<String>) {
        self.failing_puts.write().await.insert(path.into());
    }

    /// Snapshot of the object at `path`.
    pub async fn object(&self, path: &str) -> Option<StoredObject> {
        self.objects.read().await.get(path).cloned()
    }

    /// All keys, sorted.
    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    /// Keys under `prefix`, sorted.
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.objects
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Bytes, PrintsError> {
        self.objects
            .read()
            .await
            .get(path)
            .map(|o| o.data.clone())
            .ok_or_else(|| PrintsError::storage("download", path, "object not found"))
    }

    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), PrintsError> {
        if self.failing_puts.read().await.contains(path) {
            return Err(PrintsError::storage("upload", path, "injected failure"));
        }
        self.objects.write().await.insert(
            path.to_string(),
            StoredObject {
                data,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn delete(&self, paths: &[String]) -> Result<(), PrintsError> {
        let mut objects = self.objects.write().await;
        for p in paths {
            objects.remove(p);
        }
        Ok(())
    }

    async fn signed_url(&self, path: &str, expires_in_secs: u64) -> Result<String, PrintsError> {
        if !self.objects.read().await.contains_key(path) {
            return Err(PrintsError::storage("sign", path, "object not found"));
        }
        Ok(format!("memory://signed/{path}?expires_in={expires_in_secs}"))
    }

    async fn health_check(&self) -> Result<(), PrintsError> {
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("memory://public/{path}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryStore::new();
        store
            .put("a/b.jpg", Bytes::from_static(b"jpeg"), "image/jpeg")
            .await
            .unwrap();

        assert_eq!(store.get("a/b.jpg").await.unwrap(), Bytes::from_static(b"jpeg"));
        assert_eq!(store.object("a/b.jpg").await.unwrap().content_type, "image/jpeg");

        store
            .delete(&["a/b.jpg".to_string(), "missing".to_string()])
            .await
            .unwrap();
        assert!(store.get("a/b.jpg").await.is_err());
    }

    #[tokio::test]
    async fn injected_put_failure() {
        let store = MemoryStore::new();
        store.fail_puts_to("x.jpg").await;
        let err = store
            .put("x.jpg", Bytes::new(), "image/jpeg")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("injected"));
    }
}
