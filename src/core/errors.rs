// Domain error types - user-facing messages carry no internal detail

use thiserror::Error;

/// Main error type for the portal core
#[derive(Error, Debug)]
pub enum PortalError {
    /// Wrong email/password (retryable by the user)
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Credential verifier unreachable or misbehaving (retryable)
    #[error("Credential service unavailable: {0}")]
    VerifierUnavailable(String),

    /// An operation requiring an authenticated session was attempted without one
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Session valid but the role data could not be loaded (fail-closed)
    #[error("Profile fetch failed: {0}")]
    ProfileFetch(String),

    /// Write attempt tagged outside the profile's computed scope
    #[error("Scope violation: {0}")]
    ScopeViolation(String),

    /// Record store query or insert failed
    #[error("Record store error: {0}")]
    RecordStore(String),

    /// A fetched row did not match the expected schema
    #[error("Malformed record: {0}")]
    Decode(String),

    /// Object store upload failed; dependent inserts must not proceed
    #[error("Upload failed: {0}")]
    Upload(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PortalError {
    /// User-facing message (no URLs, tokens, or backend error bodies)
    pub fn user_message(&self) -> String {
        match self {
            PortalError::InvalidCredentials => {
                "Incorrect credentials or unauthorized user".to_string()
            }
            PortalError::VerifierUnavailable(_) => {
                "Could not reach the sign-in service, try again".to_string()
            }
            PortalError::NotAuthenticated => "Sign in to continue".to_string(),
            PortalError::ProfileFetch(_) => "Could not load your leader profile".to_string(),
            PortalError::ScopeViolation(reason) => reason.clone(),
            PortalError::RecordStore(_) => "Could not save the record, try again".to_string(),
            PortalError::Decode(_) => "Unexpected data from the server".to_string(),
            PortalError::Upload(_) => "Could not upload the file, try again".to_string(),
            PortalError::Configuration(_) => "Internal error".to_string(),
        }
    }

    /// Whether retrying the same operation can reasonably succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            PortalError::InvalidCredentials => true,
            PortalError::VerifierUnavailable(_) => true,
            PortalError::ProfileFetch(_) => true,
            PortalError::RecordStore(_) => true,
            PortalError::Upload(_) => true,
            PortalError::NotAuthenticated => false,
            PortalError::ScopeViolation(_) => false,
            PortalError::Decode(_) => false,
            PortalError::Configuration(_) => false,
        }
    }
}
