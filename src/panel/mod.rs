// Leader panel authoring - the scope rule runs before every write

use crate::core::errors::PortalError;
use crate::core::models::{
    AuthState, Church, ChurchId, EventDraft, EventRow, NewsDraft, NewsRow, Profile,
    ResourceDraft, ResourceRow, ResourceSource, Role, Session,
};
use crate::infra::{ObjectStore, RecordStore};
use crate::scope;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// Authoring operations for the leader panel.
///
/// Every write re-derives the church tag from the profile's computed scope;
/// whatever list a UI displayed is irrelevant here.
pub struct PanelService {
    records: Arc<dyn RecordStore>,
    objects: Arc<dyn ObjectStore>,
}

impl PanelService {
    pub fn new(records: Arc<dyn RecordStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { records, objects }
    }

    /// Churches the current profile may choose from when authoring.
    ///
    /// A query failure is surfaced so the caller can show a non-fatal
    /// "could not load organizations" condition and offer a retry.
    pub async fn selectable_churches(&self, state: &AuthState) -> Result<Vec<Church>, PortalError> {
        let (session, profile) = author_identity(state)?;
        let scope = scope::church_scope(profile);
        self.records
            .fetch_churches(&scope, &session.access_token)
            .await
    }

    pub async fn create_news(&self, state: &AuthState, draft: NewsDraft) -> Result<(), PortalError> {
        let (session, profile) = author_identity(state)?;
        let church_id = self.authorize(profile, session, draft.church_id).await?;

        let row = NewsRow {
            title: draft.title,
            summary: draft.summary,
            church_id,
            created_by: session.user_id,
        };
        self.records.insert_news(&row, &session.access_token).await
    }

    pub async fn create_event(
        &self,
        state: &AuthState,
        draft: EventDraft,
    ) -> Result<(), PortalError> {
        let (session, profile) = author_identity(state)?;
        let church_id = self.authorize(profile, session, draft.church_id).await?;

        let row = EventRow {
            title: draft.title,
            description: draft.description,
            date: draft.date,
            place: draft.place,
            church_id,
            created_by: session.user_id,
        };
        self.records.insert_event(&row, &session.access_token).await
    }

    /// Publish a downloadable resource (association admin only).
    ///
    /// For uploaded files the object store write happens first; the row is
    /// inserted only once a public URL exists.
    pub async fn create_resource(
        &self,
        state: &AuthState,
        draft: ResourceDraft,
    ) -> Result<(), PortalError> {
        let (session, profile) = author_identity(state)?;
        if profile.role != Role::Admin {
            return Err(PortalError::ScopeViolation(
                "Only the association admin can publish resources".to_string(),
            ));
        }

        let url = match draft.source {
            ResourceSource::Url(url) => url,
            ResourceSource::Upload {
                file_name,
                content_type,
                bytes,
            } => {
                let path = format!("{}_{}", Uuid::new_v4(), file_name);
                self.objects
                    .upload(&path, &content_type, bytes, &session.access_token)
                    .await?;
                self.objects.public_url(&path)
            }
        };

        let row = ResourceRow {
            title: draft.title,
            description: draft.description,
            url,
            category: draft.category,
            created_by: session.user_id,
        };
        self.records
            .insert_resource(&row, &session.access_token)
            .await
    }

    /// Resolve the church tag the record must carry.
    ///
    /// Only a pastor needs the church list (district membership check); a
    /// failed list query degrades to the empty set, which blocks non-admin
    /// authoring until retried.
    async fn authorize(
        &self,
        profile: &Profile,
        session: &Session,
        requested: Option<ChurchId>,
    ) -> Result<Option<ChurchId>, PortalError> {
        let visible = match profile.role {
            Role::Pastor => {
                let scope = scope::church_scope(profile);
                match self
                    .records
                    .fetch_churches(&scope, &session.access_token)
                    .await
                {
                    Ok(churches) => churches,
                    Err(e) => {
                        warn!(error = %e, "Could not load churches for the scope check");
                        Vec::new()
                    }
                }
            }
            Role::Admin | Role::Iglesia => Vec::new(),
        };

        scope::authorize_church(profile, requested, &visible)
    }
}

/// The settled, resolved identity an authoring call runs as.
///
/// While loading nothing may write; a roleless session (profile fetch
/// failed or no row) holds no authoring capability either.
fn author_identity(state: &AuthState) -> Result<(&Session, &Profile), PortalError> {
    if state.loading {
        return Err(PortalError::NotAuthenticated);
    }
    let session = state.session.as_ref().ok_or(PortalError::NotAuthenticated)?;
    let profile = state.profile.as_ref().ok_or_else(|| {
        PortalError::ScopeViolation("Your leader profile could not be loaded".to_string())
    })?;
    Ok((session, profile))
}
