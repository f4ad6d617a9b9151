//! Object store endpoints

use crate::error::{ClientError, Result};
use crate::HttpService;
use relay_core::dto::store::ObjectMetadata;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

/// Prefix of the headers that carry user metadata
const METADATA_HEADER_PREFIX: &str = "x-relay-meta-";

/// HTTP client for a bucket in the result object store
#[derive(Debug, Clone)]
pub struct StoreClient {
    http: HttpService,
    bucket: String,
}

impl StoreClient {
    /// Create a client for `bucket` on the store at `store_url`
    pub fn new(store_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self::with_client(store_url, bucket, Client::new())
    }

    /// Create a client with a preconfigured reqwest client
    pub fn with_client(
        store_url: impl Into<String>,
        bucket: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            http: HttpService::new(store_url, client),
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, key: &str) -> String {
        self.http.url(&format!("{}/{}", self.bucket, key))
    }

    /// Write an object, replacing any previous version
    pub async fn put(
        &self,
        key: &str,
        body: String,
        content_type: &str,
        metadata: &ObjectMetadata,
    ) -> Result<()> {
        check_key(key)?;
        let mut request = self
            .http
            .client
            .put(self.object_url(key))
            .header(CONTENT_TYPE, content_type)
            .body(body);

        for (name, value) in metadata {
            request = request.header(
                format!("{}{}", METADATA_HEADER_PREFIX, name),
                value.as_str(),
            );
        }

        let response = request.send().await?;
        self.http.handle_empty_response(response).await
    }

    /// Read an object body, `None` when the key does not exist
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        check_key(key)?;
        let response = self.http.client.get(self.object_url(key)).send().await?;

        match self.http.handle_text_response(response).await {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.starts_with('/') || key.contains("..") {
        return Err(ClientError::InvalidRequest(format!(
            "invalid object key: {:?}",
            key
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_url() {
        let store = StoreClient::new("http://localhost:9000/", "results");
        assert_eq!(
            store.object_url("test-results/2025/01/02/job-1.json"),
            "http://localhost:9000/results/test-results/2025/01/02/job-1.json"
        );
    }

    #[test]
    fn test_check_key() {
        assert!(check_key("test-results/2025/01/02/a.json").is_ok());
        assert!(check_key("").is_err());
        assert!(check_key("/abs").is_err());
        assert!(check_key("a/../b").is_err());
    }
}
