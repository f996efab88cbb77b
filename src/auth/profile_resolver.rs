// Profile lookup with per-identity caching

use crate::config::Config;
use crate::core::errors::PortalError;
use crate::core::models::{Profile, Session};
use crate::infra::RecordStore;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Loads the profile row for an authenticated identity, caching it for the
/// session's lifetime. Re-fetched whenever the session identity changes
/// (the cache is keyed by user id and invalidated on sign-out).
pub struct ProfileResolver {
    records: Arc<dyn RecordStore>,
    cache: Cache<Uuid, Arc<Profile>>,
}

impl ProfileResolver {
    pub fn new(records: Arc<dyn RecordStore>, config: &Config) -> Self {
        let cache = Cache::builder()
            .time_to_live(Duration::from_secs(config.profile_cache_ttl_secs))
            .max_capacity(config.profile_cache_capacity)
            .build();

        Self { records, cache }
    }

    /// Resolve the profile for a session identity.
    ///
    /// `Ok(None)` means the query succeeded but no profile row exists; the
    /// caller treats the user as roleless. Errors are reported as
    /// `ProfileFetch` regardless of the underlying cause.
    pub async fn resolve(&self, session: &Session) -> Result<Option<Profile>, PortalError> {
        if let Some(cached) = self.cache.get(&session.user_id).await {
            return Ok(Some((*cached).clone()));
        }

        let profile = self
            .records
            .fetch_profile(session.user_id, &session.access_token)
            .await
            .map_err(|e| PortalError::ProfileFetch(e.to_string()))?;

        // Cache if found
        if let Some(ref profile) = profile {
            self.cache
                .insert(session.user_id, Arc::new(profile.clone()))
                .await;
        }

        Ok(profile)
    }

    /// Resolve bypassing the cache (role changes picked up on demand).
    pub async fn resolve_fresh(&self, session: &Session) -> Result<Option<Profile>, PortalError> {
        self.cache.invalidate(&session.user_id).await;
        self.resolve(session).await
    }

    pub async fn invalidate(&self, user_id: Uuid) {
        self.cache.invalidate(&user_id).await;
    }
}
