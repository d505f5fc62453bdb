//! Route guard - the consumer contract for protected views

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::record::Principal;
use crate::session::SessionManager;

/// Outcome of a protected-view check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Proceed; `principal` is surfaced to the page shell.
    Allow { principal: Principal },
    /// Redirect to the entry view. The intended destination is kept for
    /// return after sign-in.
    Redirect { to: String },
}

/// Gate evaluated on every protected-view load.
pub struct RouteGuard {
    session: Arc<SessionManager>,
    entry_path: String,
    intended: Mutex<Option<String>>,
}

impl RouteGuard {
    pub fn new(session: Arc<SessionManager>, entry_path: impl Into<String>) -> Self {
        Self {
            session,
            entry_path: entry_path.into(),
            intended: Mutex::new(None),
        }
    }

    /// Check authorization for `destination`.
    pub async fn check(&self, destination: &str) -> GuardDecision {
        if self.session.is_authenticated().await {
            if let Some(principal) = self.session.current_principal().await {
                return GuardDecision::Allow { principal };
            }
        }

        debug!(destination, "unauthenticated; redirecting to entry view");
        *self.intended.lock() = Some(destination.to_string());
        GuardDecision::Redirect {
            to: self.entry_path.clone(),
        }
    }

    /// Destination stored by the last redirect, consumed once after a
    /// successful sign-in.
    pub fn take_intended_destination(&self) -> Option<String> {
        self.intended.lock().take()
    }

    /// The sign-out affordance wired into the page shell.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }
}
