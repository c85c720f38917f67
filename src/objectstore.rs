//! Object storage boundary
//!
//! One network call per upload, no internal retry; retry policy belongs to
//! the caller. The public URL is composed deterministically from the base
//! endpoint, bucket and path.

use async_trait::async_trait;
use tracing::debug;

use crate::types::{CivicError, Result};

/// Prefix under the bucket where issue images land
const ISSUE_PREFIX: &str = "issues";

/// Pushes bytes to a remote object store and returns a public URL.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, file_name: &str, content_type: &str) -> Result<String>;
}

/// Supabase Storage implementation
#[derive(Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    service_role_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, service_role_key: &str, bucket: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.to_string(),
            service_role_key: service_role_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    fn upload_endpoint(&self, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path)
    }

    /// Public URL for an object at `path` within the bucket. Derived from
    /// configuration alone; no read-back from the provider.
    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}

#[async_trait]
impl ObjectStore for SupabaseStorage {
    async fn upload(&self, bytes: Vec<u8>, file_name: &str, content_type: &str) -> Result<String> {
        let path = format!("{}/{}", ISSUE_PREFIX, file_name);
        let endpoint = self.upload_endpoint(&path);

        debug!("Uploading {} bytes to {}", bytes.len(), endpoint);

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.service_role_key)
            .header("apikey", &self.service_role_key)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await
            .map_err(|e| CivicError::Upload(format!("Storage request failed: {}", e)))?;

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CivicError::Upload(format!("Storage upload failed: {}", body)));
        }

        Ok(self.public_url(&path))
    }
}
