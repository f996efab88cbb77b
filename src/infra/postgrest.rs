// PostgREST record store - typed selects and inserts

use crate::config::Config;
use crate::core::errors::PortalError;
use crate::core::models::{Church, EventRow, NewsRow, Profile, ResourceRow};
use crate::scope::ChurchScope;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::error;
use uuid::Uuid;

const PROFILE_COLUMNS: &str = "id,full_name,role,district_id,church_id";
const CHURCH_COLUMNS: &str = "id,name,district_id";

/// Query string for the churches table under the given scope.
///
/// `None` means the scope is empty and no request should be made at all.
pub fn churches_query(scope: &ChurchScope) -> Option<String> {
    let base = format!("select={}&order=name.asc", CHURCH_COLUMNS);
    match scope {
        ChurchScope::All => Some(base),
        ChurchScope::District(d) => Some(format!("{}&district_id=eq.{}", base, d)),
        ChurchScope::Single(c) => Some(format!("{}&id=eq.{}", base, c)),
        ChurchScope::Empty => None,
    }
}

/// HTTP client for the Supabase REST (PostgREST) API
#[derive(Clone)]
pub struct PostgrestClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

impl PostgrestClient {
    pub fn new(config: &Config) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    /// Run a select and decode the row set.
    ///
    /// Decode failures are `PortalError::Decode`: a malformed row fails fast
    /// instead of reaching the caller with undefined fields.
    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &str,
        access_token: &str,
    ) -> Result<Vec<T>, PortalError> {
        let url = format!("{}?{}", self.table_url(table), query);

        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| PortalError::RecordStore(format!("{} select failed: {}", table, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(table, status = %status, body = %body, "Record store select failed");
            return Err(PortalError::RecordStore(format!(
                "{} select HTTP error: {}",
                table, status
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PortalError::RecordStore(format!("{} select failed: {}", table, e)))?;

        serde_json::from_str(&body)
            .map_err(|e| PortalError::Decode(format!("{} row: {}", table, e)))
    }

    async fn insert<T: Serialize>(
        &self,
        table: &str,
        row: &T,
        access_token: &str,
    ) -> Result<(), PortalError> {
        let response = self
            .http
            .post(self.table_url(table))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .header("Prefer", "return=minimal")
            .json(row)
            .send()
            .await
            .map_err(|e| PortalError::RecordStore(format!("{} insert failed: {}", table, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(table, status = %status, body = %body, "Record store insert failed");
            return Err(PortalError::RecordStore(format!(
                "{} insert HTTP error: {}",
                table, status
            )));
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl super::RecordStore for PostgrestClient {
    async fn fetch_profile(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<Option<Profile>, PortalError> {
        let query = format!("id=eq.{}&select={}", user_id, PROFILE_COLUMNS);
        let rows: Vec<Profile> = self.select("profiles", &query, access_token).await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_churches(
        &self,
        scope: &ChurchScope,
        access_token: &str,
    ) -> Result<Vec<Church>, PortalError> {
        match churches_query(scope) {
            Some(query) => self.select("churches", &query, access_token).await,
            // Empty scope never reaches the network
            None => Ok(Vec::new()),
        }
    }

    async fn insert_news(&self, row: &NewsRow, access_token: &str) -> Result<(), PortalError> {
        self.insert("news", row, access_token).await
    }

    async fn insert_event(&self, row: &EventRow, access_token: &str) -> Result<(), PortalError> {
        self.insert("events", row, access_token).await
    }

    async fn insert_resource(
        &self,
        row: &ResourceRow,
        access_token: &str,
    ) -> Result<(), PortalError> {
        self.insert("resources", row, access_token).await
    }
}
