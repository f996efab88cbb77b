// Session/profile context - the auth state machine

use crate::auth::profile_resolver::ProfileResolver;
use crate::auth::session_store::SessionStore;
use crate::core::errors::PortalError;
use crate::core::models::{AuthEvent, AuthState, Session};
use crate::infra::CredentialVerifier;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Refresh the access token this long before it expires.
const REFRESH_MARGIN_SECS: i64 = 60;

/// Retry interval after a failed refresh of a not-yet-expired session.
const REFRESH_RETRY_SECS: u64 = 30;

/// Authoritative state plus the request generation.
///
/// The generation counter serializes writers and supersedes in-flight
/// profile fetches: a fetch outcome is applied only if no later transition
/// happened while it was on the wire. The lock is never held across an
/// await of network I/O.
struct Shared {
    state: watch::Sender<AuthState>,
    generation: Mutex<u64>,
}

/// The composed session/profile state machine.
///
/// Single writer of `AuthState`: every mutation happens here, driven by the
/// operations below or by external auth events applied in order. Consumers
/// read snapshots or subscribe to the watch channel.
pub struct AuthContext {
    verifier: Arc<dyn CredentialVerifier>,
    sessions: Arc<SessionStore>,
    profiles: Arc<ProfileResolver>,
    shared: Arc<Shared>,
}

impl AuthContext {
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        sessions: Arc<SessionStore>,
        profiles: Arc<ProfileResolver>,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::default());
        Self {
            verifier,
            sessions,
            profiles,
            shared: Arc::new(Shared {
                state,
                generation: Mutex::new(0),
            }),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.shared.state.borrow().clone()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.shared.state.subscribe()
    }

    /// Silent restore from the persisted session, run once at startup.
    ///
    /// Settles the state machine either way: a missing, corrupt, or
    /// unrefreshable session ends anonymous; a live one ends authenticated
    /// (possibly roleless if the profile cannot be loaded).
    pub async fn restore(&self) {
        match self.sessions.load_persisted().await {
            None => {
                self.clear_local("no persisted session").await;
            }
            Some(session) if session.expires_within(REFRESH_MARGIN_SECS) => {
                match self.verifier.refresh_session(&session.refresh_token).await {
                    Ok(fresh) => {
                        info!(user_id = %fresh.user_id, "Persisted session refreshed");
                        self.enter_session(fresh, false).await;
                    }
                    Err(e) => {
                        warn!(error = %e, "Persisted session could not be refreshed");
                        self.clear_local("refresh failed on restore").await;
                    }
                }
            }
            Some(session) => {
                self.enter_session(session, false).await;
            }
        }
    }

    /// Verify credentials and enter the resulting session.
    ///
    /// Credential errors are surfaced to the caller as retryable and leave
    /// the state untouched.
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<(), PortalError> {
        let session = self.verifier.sign_in(email, password).await?;
        self.enter_session(session, false).await;
        Ok(())
    }

    /// Sign out: local state is cleared before any network I/O, and the
    /// verifier's sign-out outcome never blocks or reverts it. Calling this
    /// while already anonymous is a no-op.
    pub async fn logout(&self) {
        let Some(session) = self.clear_local("logout").await else {
            return;
        };

        if let Err(e) = self.verifier.sign_out(&session.access_token).await {
            warn!(error = %e, "Sign-out request failed; local session already cleared");
        }
    }

    /// Re-fetch the profile for the current session, bypassing the cache.
    pub async fn refresh_profile(&self) -> Result<(), PortalError> {
        let (session, gen) = {
            let gen = self.shared.generation.lock().await;
            let state = self.shared.state.borrow().clone();
            match state.session {
                Some(session) => (session, *gen),
                None => return Err(PortalError::NotAuthenticated),
            }
        };

        let profile = self.profiles.resolve_fresh(&session).await?;

        let current = self.shared.generation.lock().await;
        if *current == gen {
            self.shared.state.send_modify(|state| state.profile = profile);
        }
        Ok(())
    }

    /// Apply one external auth event.
    pub async fn apply_event(&self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(session) => {
                // Spawned fetch: the event loop must stay free to apply a
                // superseding event while the profile is on the wire.
                self.enter_session(session, true).await;
            }
            AuthEvent::SignedOut => {
                self.clear_local("signed-out event").await;
            }
            AuthEvent::TokenRefreshed(session) => {
                self.replace_session(session).await;
            }
        }
    }

    /// Consume an ordered stream of auth events until the channel closes.
    pub async fn drive(&self, mut events: mpsc::Receiver<AuthEvent>) {
        while let Some(event) = events.recv().await {
            self.apply_event(event).await;
        }
        debug!("Auth event channel closed");
    }

    /// Background task keeping the access token fresh; applies
    /// `TokenRefreshed` near expiry and signs out locally when an expired
    /// session can no longer be refreshed.
    pub fn spawn_auto_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let context = Arc::clone(self);
        tokio::spawn(async move { context.auto_refresh_loop().await })
    }

    /// Enter an authenticated session and resolve its profile.
    ///
    /// The profile outcome is generation-guarded: it is dropped if any
    /// later transition (sign-out, another sign-in) happened meanwhile.
    async fn enter_session(&self, session: Session, spawn_fetch: bool) {
        // The generation lock also serializes session-store mutations, so
        // state and persisted session cannot diverge under concurrent
        // transitions.
        let gen = {
            let mut generation = self.shared.generation.lock().await;
            *generation += 1;
            let snapshot = session.clone();
            self.shared.state.send_modify(move |state| {
                state.loading = true;
                state.session = Some(snapshot);
                state.profile = None;
            });
            self.sessions.replace(session.clone()).await;
            *generation
        };

        if spawn_fetch {
            let shared = Arc::clone(&self.shared);
            let profiles = Arc::clone(&self.profiles);
            tokio::spawn(async move {
                resolve_and_settle(shared, profiles, session, gen).await;
            });
        } else {
            resolve_and_settle(Arc::clone(&self.shared), Arc::clone(&self.profiles), session, gen)
                .await;
        }
    }

    /// Replace the session token in place (refresh). The identity is
    /// unchanged, so the generation is not bumped and an in-flight profile
    /// fetch stays valid; the profile itself is not re-fetched.
    async fn replace_session(&self, session: Session) {
        let _generation = self.shared.generation.lock().await;
        if self.shared.state.borrow().session.is_none() {
            debug!("Token refresh with no active session ignored");
            return;
        }
        let snapshot = session.clone();
        self.shared
            .state
            .send_modify(move |state| state.session = Some(snapshot));
        self.sessions.replace(session).await;
    }

    /// Clear to anonymous and supersede any in-flight fetch. Returns the
    /// session that was active, if any. No-op on an already-settled
    /// anonymous state.
    async fn clear_local(&self, reason: &str) -> Option<Session> {
        let mut generation = self.shared.generation.lock().await;
        let current = self.shared.state.borrow().clone();
        if current.session.is_none() && !current.loading {
            debug!(reason, "Already anonymous, nothing to clear");
            return None;
        }
        *generation += 1;
        self.shared.state.send_modify(|state| {
            state.session = None;
            state.profile = None;
            state.loading = false;
        });
        info!(reason, "Auth state cleared");

        self.sessions.clear().await;
        if let Some(ref session) = current.session {
            self.profiles.invalidate(session.user_id).await;
        }
        current.session
    }

    async fn auto_refresh_loop(&self) {
        let mut rx = self.subscribe();
        loop {
            let session = rx.borrow_and_update().session.clone();
            let Some(session) = session else {
                // Anonymous; wait for a sign-in
                if rx.changed().await.is_err() {
                    return;
                }
                continue;
            };

            let delay = refresh_delay(&session, Utc::now());
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    continue;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            match self.verifier.refresh_session(&session.refresh_token).await {
                Ok(fresh) => {
                    debug!(user_id = %fresh.user_id, "Access token refreshed");
                    self.apply_event(AuthEvent::TokenRefreshed(fresh)).await;
                }
                Err(e) if session.expires_within(0) => {
                    warn!(error = %e, "Session expired and refresh failed; signing out locally");
                    self.clear_local("refresh failed past expiry").await;
                }
                Err(e) => {
                    warn!(error = %e, "Token refresh failed, retrying");
                    tokio::select! {
                        changed = rx.changed() => {
                            if changed.is_err() {
                                return;
                            }
                        }
                        _ = tokio::time::sleep(Duration::from_secs(REFRESH_RETRY_SECS)) => {}
                    }
                }
            }
        }
    }
}

/// Resolve the profile and settle the state, unless superseded.
///
/// Fetch failure and a missing row both settle as roleless (fail-closed):
/// the session stays, no privileged capability is granted, and the failure
/// is logged rather than surfaced as fatal.
async fn resolve_and_settle(
    shared: Arc<Shared>,
    profiles: Arc<ProfileResolver>,
    session: Session,
    gen: u64,
) {
    let profile = match profiles.resolve(&session).await {
        Ok(Some(profile)) => Some(profile),
        Ok(None) => {
            warn!(user_id = %session.user_id, "No profile row for this identity, treating as roleless");
            None
        }
        Err(e) => {
            warn!(error = %e, user_id = %session.user_id, "Profile fetch failed, treating as roleless");
            None
        }
    };

    let generation = shared.generation.lock().await;
    if *generation != gen {
        debug!(
            started = gen,
            current = *generation,
            "Dropping superseded profile fetch result"
        );
        return;
    }
    shared.state.send_modify(|state| {
        state.profile = profile;
        state.loading = false;
    });
}

/// How long to wait before refreshing, given the expiry margin.
fn refresh_delay(session: &Session, now: DateTime<Utc>) -> Duration {
    let due = session.expires_at - chrono::Duration::seconds(REFRESH_MARGIN_SECS);
    (due - now).to_std().unwrap_or(Duration::ZERO)
}
