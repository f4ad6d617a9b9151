//! Object store repository

use async_trait::async_trait;
use relay_client::StoreClient;
use relay_core::dto::store::ObjectMetadata;

use crate::error::Result;

/// Repository trait for the result object store
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes an object, replacing any previous version
    async fn put(
        &self,
        key: &str,
        body: String,
        content_type: &str,
        metadata: ObjectMetadata,
    ) -> Result<()>;

    /// Reads an object body, `None` when the key does not exist
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// HTTP implementation of ObjectStore
pub struct HttpObjectStore {
    client: StoreClient,
}

impl HttpObjectStore {
    pub fn new(store_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            client: StoreClient::new(store_url, bucket),
        }
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn put(
        &self,
        key: &str,
        body: String,
        content_type: &str,
        metadata: ObjectMetadata,
    ) -> Result<()> {
        Ok(self.client.put(key, body, content_type, &metadata).await?)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.client.get(key).await?)
    }
}
