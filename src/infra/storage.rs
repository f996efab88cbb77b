// Object store uploads for resource authoring

use crate::config::Config;
use crate::core::errors::PortalError;
use reqwest::Client;
use std::time::Duration;
use tracing::error;

/// HTTP client for the Supabase storage API
#[derive(Clone)]
pub struct StorageClient {
    http: Client,
    base_url: String,
    anon_key: String,
    bucket: String,
}

impl StorageClient {
    pub fn new(config: &Config) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            bucket: config.storage_bucket.clone(),
        }
    }
}

#[async_trait::async_trait]
impl super::ObjectStore for StorageClient {
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
        access_token: &str,
    ) -> Result<(), PortalError> {
        let url = format!("{}/storage/v1/object/{}/{}", self.base_url, self.bucket, path);

        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Content-Type", content_type.to_string())
            .body(bytes)
            .send()
            .await
            .map_err(|e| PortalError::Upload(format!("Upload request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(path, status = %status, body = %body, "Object store upload failed");
            return Err(PortalError::Upload(format!("Upload HTTP error: {}", status)));
        }

        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, path
        )
    }
}
