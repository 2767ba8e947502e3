//! Object storage access
//!
//! The agent only ever reads: two JSON documents (column schema and sample
//! column values) are fetched per invocation. `GcsObjectStore` talks to the
//! Cloud Storage JSON API; `InMemoryObjectStore` backs offline runs and tests.

use crate::{AudienceError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Read-only blob access keyed by bucket and object name
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// Google Cloud Storage over the JSON API (`alt=media` downloads)
#[derive(Clone)]
pub struct GcsObjectStore {
    http: Client,
    base_url: String,
    access_token: Option<String>,
}

impl GcsObjectStore {
    pub fn new(access_token: Option<String>, request_timeout_ms: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(request_timeout_ms))
            .build()
            .map_err(|e| {
                AudienceError::Config(format!("Failed to build storage HTTP client: {e}"))
            })?;
        Ok(Self {
            http,
            base_url: "https://storage.googleapis.com/storage/v1".to_string(),
            access_token,
        })
    }

    /// Point the client at an emulator or proxy
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn object_url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/b/{}/o/{}?alt=media",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(bucket),
            urlencoding::encode(key)
        )
    }
}

#[async_trait]
impl ObjectStore for GcsObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(bucket, key);
        debug!(target: "object_store", %bucket, %key, "GET object");

        let mut req = self.http.get(&url);
        if let Some(token) = &self.access_token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await.map_err(|e| {
            AudienceError::ContextUnavailable(format!("gs://{bucket}/{key}: request failed: {e}"))
        })?;

        match resp.status() {
            s if s.is_success() => {
                let bytes = resp.bytes().await.map_err(|e| {
                    AudienceError::ContextUnavailable(format!(
                        "gs://{bucket}/{key}: failed to read body: {e}"
                    ))
                })?;
                Ok(bytes.to_vec())
            }
            StatusCode::NOT_FOUND => Err(AudienceError::ContextUnavailable(format!(
                "gs://{bucket}/{key}: object not found"
            ))),
            status => {
                let body = resp.text().await.unwrap_or_default();
                Err(AudienceError::ContextUnavailable(format!(
                    "gs://{bucket}/{key}: status={status} body={body}"
                )))
            }
        }
    }
}

/// Blob store held in process memory
#[derive(Default)]
pub struct InMemoryObjectStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert((bucket.to_string(), key.to_string()), data.into());
        }
    }

    /// Builder-style `put` for fixtures
    pub fn with_object(self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) -> Self {
        self.put(bucket, key, data);
        self
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let objects = self
            .objects
            .read()
            .map_err(|_| AudienceError::ContextUnavailable("object store lock poisoned".into()))?;
        objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| {
                AudienceError::ContextUnavailable(format!("{bucket}/{key}: object not found"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_url_encodes_nested_keys() {
        let store = GcsObjectStore::new(None, 1_000).unwrap();
        let url = store.object_url("my-bucket", "donorai_attr_aud/context_dictionary.json");
        assert_eq!(
            url,
            "https://storage.googleapis.com/storage/v1/b/my-bucket/o/donorai_attr_aud%2Fcontext_dictionary.json?alt=media"
        );
    }

    #[tokio::test]
    async fn in_memory_store_round_trips_and_reports_missing() {
        let store = InMemoryObjectStore::new().with_object("b", "k", "{}");
        assert_eq!(store.get_object("b", "k").await.unwrap(), b"{}".to_vec());
        assert!(matches!(
            store.get_object("b", "missing").await,
            Err(AudienceError::ContextUnavailable(_))
        ));
    }
}
