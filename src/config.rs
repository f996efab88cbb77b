// Configuration management

use crate::core::errors::PortalError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
///
/// All configuration is validated on load with clear error messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Supabase project
    pub supabase_url: String,
    pub supabase_anon_key: String,

    // Object store bucket for resource uploads
    pub storage_bucket: String,

    // Where the restored session lives between runs (optional)
    pub session_file: Option<PathBuf>,

    // HTTP client configuration
    pub request_timeout_secs: u64,

    // Profile resolver cache
    pub profile_cache_ttl_secs: u64,
    pub profile_cache_capacity: u64,

    // Login entry point the guard redirects to
    pub login_path: String,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, PortalError> {
        // Load .env file if present (development)
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok(); // Ignore errors (file may not exist)
        }

        let config = Self {
            supabase_url: Self::get_required_env("SUPABASE_URL")?,
            supabase_anon_key: Self::get_required_env("SUPABASE_ANON_KEY")?,
            storage_bucket: Self::get_env_or_default("STORAGE_BUCKET", "resources")?,
            session_file: Self::get_optional_path("SESSION_FILE")?,
            request_timeout_secs: Self::parse_u64_or_default("REQUEST_TIMEOUT_SECS", 10)?,
            profile_cache_ttl_secs: Self::parse_u64_or_default("PROFILE_CACHE_TTL_SECS", 300)?,
            profile_cache_capacity: Self::parse_u64_or_default("PROFILE_CACHE_CAPACITY", 100)?,
            login_path: Self::get_env_or_default("LOGIN_PATH", "/login")?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info")?,
            log_format: Self::get_env_or_default("LOG_FORMAT", "text")?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Get environment variable or return default value
    fn get_env_or_default(key: &str, default: &str) -> Result<String, PortalError> {
        Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
    }

    /// Get required environment variable
    fn get_required_env(key: &str) -> Result<String, PortalError> {
        let value = env::var(key)
            .map_err(|_| PortalError::Configuration(format!("{} not set", key)))?;

        if value.is_empty() {
            return Err(PortalError::Configuration(format!("{} is empty", key)));
        }

        Ok(value)
    }

    /// Get optional file path from environment variable
    fn get_optional_path(key: &str) -> Result<Option<PathBuf>, PortalError> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Ok(Some(PathBuf::from(value))),
            _ => Ok(None),
        }
    }

    /// Parse u64 from environment variable or return default
    fn parse_u64_or_default(key: &str, default: u64) -> Result<u64, PortalError> {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<u64>().map_err(|e| {
                    PortalError::Configuration(format!("Invalid {} value '{}': {}", key, value, e))
                })?;

                if parsed == 0 {
                    return Err(PortalError::Configuration(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), PortalError> {
        Self::validate_url(&self.supabase_url, "Supabase URL")?;
        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        if self.storage_bucket.is_empty() {
            return Err(PortalError::Configuration(
                "STORAGE_BUCKET must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate URL format
    fn validate_url(url: &str, description: &str) -> Result<(), PortalError> {
        url::Url::parse(url).map_err(|e| {
            PortalError::Configuration(format!("Invalid {} '{}': {}", description, url, e))
        })?;
        Ok(())
    }

    /// Validate log level
    fn validate_log_level(level: &str) -> Result<(), PortalError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(PortalError::Configuration(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate log format
    fn validate_log_format(format: &str) -> Result<(), PortalError> {
        if format != "json" && format != "text" {
            return Err(PortalError::Configuration(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }
}

impl Config {
    /// Create a test configuration for unit tests
    ///
    /// Bypasses environment variable loading for tests that don't need
    /// real configuration.
    pub fn test_config() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            storage_bucket: "resources".to_string(),
            session_file: None,
            request_timeout_secs: 10,
            profile_cache_ttl_secs: 300,
            profile_cache_capacity: 100,
            login_path: "/login".to_string(),
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}
