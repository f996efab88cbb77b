// Organizational scope rules - which churches a profile may act on

use crate::core::errors::PortalError;
use crate::core::models::{Church, ChurchId, DistrictId, Profile, Role};

/// The set of churches a profile may read or write, as a filter descriptor.
///
/// `Empty` is the fail-closed case: a pastor or church account whose scope id
/// is absent sees nothing, and no query is issued for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChurchScope {
    All,
    District(DistrictId),
    Single(ChurchId),
    Empty,
}

/// Compute the readable/writable church set for a profile.
pub fn church_scope(profile: &Profile) -> ChurchScope {
    match profile.role {
        Role::Admin => ChurchScope::All,
        Role::Pastor => match profile.district_id {
            Some(district) => ChurchScope::District(district),
            None => ChurchScope::Empty,
        },
        Role::Iglesia => match profile.church_id {
            Some(church) => ChurchScope::Single(church),
            None => ChurchScope::Empty,
        },
    }
}

/// Filter already-loaded church rows down to the profile's scope.
pub fn visible_churches(profile: &Profile, churches: &[Church]) -> Vec<Church> {
    let scope = church_scope(profile);
    churches
        .iter()
        .filter(|church| match scope {
            ChurchScope::All => true,
            ChurchScope::District(district) => church.district_id == Some(district),
            ChurchScope::Single(id) => church.id == id,
            ChurchScope::Empty => false,
        })
        .cloned()
        .collect()
}

/// The church tag pre-applied when the profile starts authoring.
///
/// Only a church account gets a forced default; admins default to the
/// general (association-wide) tag and pastors must pick explicitly.
pub fn default_church(profile: &Profile) -> Option<ChurchId> {
    match profile.role {
        Role::Iglesia => profile.church_id,
        Role::Admin | Role::Pastor => None,
    }
}

/// Write-time enforcement of the scope rule table.
///
/// Returns the church tag the record must carry, or a scope violation.
/// This runs before any record-store call; what a UI displayed is irrelevant.
pub fn authorize_church(
    profile: &Profile,
    requested: Option<ChurchId>,
    visible: &[Church],
) -> Result<Option<ChurchId>, PortalError> {
    match profile.role {
        // General (untagged) or any explicitly chosen church
        Role::Admin => Ok(requested),

        Role::Pastor => {
            let requested = requested.ok_or_else(|| {
                PortalError::ScopeViolation(
                    "Select one of the churches in your district".to_string(),
                )
            })?;
            if visible.iter().any(|church| church.id == requested) {
                Ok(Some(requested))
            } else {
                Err(PortalError::ScopeViolation(
                    "That church is outside your district".to_string(),
                ))
            }
        }

        Role::Iglesia => {
            let own = profile.church_id.ok_or_else(|| {
                PortalError::ScopeViolation(
                    "Your account has no church assigned".to_string(),
                )
            })?;
            match requested {
                // Absent tag is forced to the account's own church
                None => Ok(Some(own)),
                Some(id) if id == own => Ok(Some(own)),
                Some(_) => Err(PortalError::ScopeViolation(
                    "You can only publish for your local church".to_string(),
                )),
            }
        }
    }
}
