// Domain models - sessions, profiles and organizational records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Numeric key of a local church.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChurchId(pub i64);

/// Numeric key of a pastoral district.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistrictId(pub i64);

impl fmt::Display for ChurchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DistrictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Leader role stored on the profile row.
///
/// An unknown role string fails deserialization, so a malformed row is a
/// decode error at the record-store boundary rather than a profile with
/// undefined capabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Pastor,
    Iglesia,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Pastor => "pastor",
            Role::Iglesia => "iglesia",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated user's role and organizational scope.
///
/// Fetched once per session and cached for the session's lifetime.
/// `district_id` is meaningful for pastors, `church_id` for church accounts;
/// an absent scope id means "sees nothing", not "sees everything".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub role: Role,
    pub district_id: Option<DistrictId>,
    pub church_id: Option<ChurchId>,
}

/// Organization record, read-only from the core's perspective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Church {
    pub id: ChurchId,
    pub name: String,
    pub district_id: Option<DistrictId>,
}

/// A live authentication session issued by the credential verifier.
///
/// Owned by the session store: created on sign-in or silent restore,
/// replaced in place on token refresh, destroyed on sign-out.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// True when the access token is past (or within `margin_secs` of) expiry.
    pub fn expires_within(&self, margin_secs: i64) -> bool {
        let deadline = self.expires_at - chrono::Duration::seconds(margin_secs);
        Utc::now() >= deadline
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<REDACTED>")
            .field("refresh_token", &"<REDACTED>")
            .field("user_id", &self.user_id)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Composite auth state observed by the rest of the application.
///
/// Mutated only by the context (single-writer); everyone else reads
/// snapshots. `profile` must not be trusted while `loading` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthState {
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub loading: bool,
}

impl Default for AuthState {
    fn default() -> Self {
        Self {
            session: None,
            profile: None,
            loading: true,
        }
    }
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_settled(&self) -> bool {
        !self.loading
    }

    /// Role of the settled, resolved profile. None while loading or roleless.
    pub fn role(&self) -> Option<Role> {
        if self.loading {
            return None;
        }
        self.profile.as_ref().map(|p| p.role)
    }
}

/// External auth events delivered to the context in order.
#[derive(Debug, Clone)]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

/// News item as authored from the leader panel.
#[derive(Debug, Clone)]
pub struct NewsDraft {
    pub title: String,
    pub summary: String,
    /// None = general (association-wide), admin only.
    pub church_id: Option<ChurchId>,
}

/// Calendar event as authored from the leader panel.
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub place: String,
    pub church_id: Option<ChurchId>,
}

/// Where the resource content comes from.
#[derive(Debug, Clone)]
pub enum ResourceSource {
    /// Already hosted elsewhere.
    Url(String),
    /// Raw file to upload before the row is inserted.
    Upload {
        file_name: String,
        content_type: String,
        bytes: Vec<u8>,
    },
}

/// Downloadable resource as authored from the leader panel (admin only).
#[derive(Debug, Clone)]
pub struct ResourceDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub source: ResourceSource,
}

/// Row shape for `news` inserts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsRow {
    pub title: String,
    pub summary: String,
    pub church_id: Option<ChurchId>,
    pub created_by: Uuid,
}

/// Row shape for `events` inserts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub place: String,
    pub church_id: Option<ChurchId>,
    pub created_by: Uuid,
}

/// Row shape for `resources` inserts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceRow {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub category: Option<String>,
    pub created_by: Uuid,
}
