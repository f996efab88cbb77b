// External collaborators - consumed over HTTP, never implemented here

use crate::core::errors::PortalError;
use crate::core::models::{Church, EventRow, NewsRow, Profile, ResourceRow, Session};
use crate::scope::ChurchScope;
use secrecy::SecretString;
use uuid::Uuid;

pub mod gotrue;
pub mod postgrest;
pub mod storage;

pub use gotrue::GoTrueClient;
pub use postgrest::PostgrestClient;
pub use storage::StorageClient;

/// Credential verifier: validates email/password, issues and revokes sessions
#[async_trait::async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Session, PortalError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), PortalError>;
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, PortalError>;
}

/// Record store: typed reads and writes against the backend tables
///
/// Every fetched row goes through a validated decode; malformed rows fail
/// fast as `PortalError::Decode` instead of propagating undefined fields.
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    async fn fetch_profile(
        &self,
        user_id: Uuid,
        access_token: &str,
    ) -> Result<Option<Profile>, PortalError>;

    async fn fetch_churches(
        &self,
        scope: &ChurchScope,
        access_token: &str,
    ) -> Result<Vec<Church>, PortalError>;

    async fn insert_news(&self, row: &NewsRow, access_token: &str) -> Result<(), PortalError>;
    async fn insert_event(&self, row: &EventRow, access_token: &str) -> Result<(), PortalError>;
    async fn insert_resource(&self, row: &ResourceRow, access_token: &str)
        -> Result<(), PortalError>;
}

/// Object store: file uploads for resource authoring
#[async_trait::async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
        access_token: &str,
    ) -> Result<(), PortalError>;

    fn public_url(&self, path: &str) -> String;
}
