// GoTrue auth endpoints - password sign-in, token refresh, sign-out

use crate::config::Config;
use crate::core::errors::PortalError;
use crate::core::models::Session;
use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tracing::{error, info};
use uuid::Uuid;

/// Token grant response from `/auth/v1/token`
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: UserPayload,
}

#[derive(Deserialize)]
struct UserPayload {
    id: Uuid,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            user_id: self.user.id,
            expires_at: Utc::now() + Duration::seconds(self.expires_in),
        }
    }
}

/// HTTP client for the Supabase auth service
#[derive(Clone)]
pub struct GoTrueClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

impl GoTrueClient {
    pub fn new(config: &Config) -> Self {
        let http = Client::builder()
            .timeout(StdDuration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            http,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
        }
    }

    fn token_url(&self, grant_type: &str) -> String {
        format!("{}/auth/v1/token?grant_type={}", self.base_url, grant_type)
    }

    async fn grant(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, PortalError> {
        let response = self
            .http
            .post(self.token_url(grant_type))
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortalError::VerifierUnavailable(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if status.is_client_error() {
            // Wrong credentials or a revoked refresh token; body intentionally dropped
            return Err(PortalError::InvalidCredentials);
        }
        if !status.is_success() {
            error!(status = %status, grant_type, "Token grant failed");
            return Err(PortalError::VerifierUnavailable(format!(
                "Token grant HTTP error: {}",
                status
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            PortalError::VerifierUnavailable(format!("Malformed token response: {}", e))
        })?;

        Ok(token.into_session())
    }
}

#[async_trait::async_trait]
impl super::CredentialVerifier for GoTrueClient {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, PortalError> {
        let session = self
            .grant(
                "password",
                serde_json::json!({
                    "email": email,
                    "password": password.expose_secret(),
                }),
            )
            .await?;

        info!(user_id = %session.user_id, "Credential sign-in succeeded");
        Ok(session)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), PortalError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await
            .map_err(|e| PortalError::VerifierUnavailable(format!("Sign-out request failed: {}", e)))?;

        let status = response.status();
        // 401 here means the token was already revoked; sign-out is idempotent
        if !status.is_success() && status != StatusCode::UNAUTHORIZED {
            return Err(PortalError::VerifierUnavailable(format!(
                "Sign-out HTTP error: {}",
                status
            )));
        }

        Ok(())
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, PortalError> {
        self.grant(
            "refresh_token",
            serde_json::json!({ "refresh_token": refresh_token }),
        )
        .await
    }
}
