// Access guard - no protected content before the session settles

use crate::core::models::AuthState;
use tokio::sync::watch;

/// What the presentation layer should do with a protected view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Still restoring; render a neutral placeholder, never the content.
    Pending,
    /// Settled anonymous; send the visitor to the login entry point.
    RedirectToLogin { login_path: String },
    /// Settled with a session; the protected view may render.
    Allow,
}

/// Gates a protected view on the auth state.
///
/// The decision is session-gated only: a roleless session is admitted, and
/// role-gated capabilities are refused further in (scope and authoring).
pub struct RouteGuard {
    login_path: String,
}

impl RouteGuard {
    pub fn new(login_path: impl Into<String>) -> Self {
        Self {
            login_path: login_path.into(),
        }
    }

    /// Decide for a state snapshot. Never `Allow` while loading, even
    /// transiently; that is the no-bypass property.
    pub fn evaluate(&self, state: &AuthState) -> GuardDecision {
        if state.loading {
            return GuardDecision::Pending;
        }
        if state.session.is_none() {
            return GuardDecision::RedirectToLogin {
                login_path: self.login_path.clone(),
            };
        }
        GuardDecision::Allow
    }

    /// Wait until the state settles and return the final decision
    /// (never `Pending`). A closed channel fails closed to the redirect.
    pub async fn wait_settled(&self, rx: &mut watch::Receiver<AuthState>) -> GuardDecision {
        loop {
            let snapshot = rx.borrow_and_update().clone();
            let decision = self.evaluate(&snapshot);
            if decision != GuardDecision::Pending {
                return decision;
            }
            if rx.changed().await.is_err() {
                return GuardDecision::RedirectToLogin {
                    login_path: self.login_path.clone(),
                };
            }
        }
    }
}
