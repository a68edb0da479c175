//! Blob store contract (consumed).
//!
//! Report attachments (summary/deposit photos) are opaque bytes the
//! core never inspects; it stores only the path the store returns.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(&self, bytes: &[u8], hint: &str) -> Result<String>;
    async fn fetch(&self, path: &str) -> Result<Vec<u8>>;
}

/// In-memory fake used by tests and the admin CLI. Not a deployment
/// target — a real one wires an external object store.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: std::sync::Mutex<std::collections::HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> InMemoryBlobStore {
        InMemoryBlobStore::default()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn store(&self, bytes: &[u8], hint: &str) -> Result<String> {
        let path = format!("memory://{}/{}", hint, uuid::Uuid::new_v4());
        self.objects
            .lock()
            .expect("blob store mutex poisoned")
            .insert(path.clone(), bytes.to_vec());
        Ok(path)
    }

    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .expect("blob store mutex poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| crate::error::CoreError::BlobStoreUnavailable(path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes() {
        let store = InMemoryBlobStore::new();
        let path = store.store(b"hello", "deposit").await.unwrap();
        assert_eq!(store.fetch(&path).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn missing_path_is_blob_store_unavailable() {
        let store = InMemoryBlobStore::new();
        let err = store.fetch("memory://nope").await.unwrap_err();
        assert!(matches!(err, crate::error::CoreError::BlobStoreUnavailable(_)));
    }
}
