use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::account::repo_types::{AccountStatus, Role};
use crate::authz::resolver::{AuthzResolver, Resolution};
use crate::provider::identity::{Identity, IdentityProvider};
use crate::provider::store::ProfileStore;

/// Why a guarded view turned the visitor away. The two reasons stay distinct
/// because the UI phrases them differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No identity, wrong role, or resolution failure.
    Unauthorized,
    /// Right role, but the account is not approved yet.
    ApprovalPending,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::Unauthorized => write!(f, "not authorized"),
            DenyReason::ApprovalPending => {
                write!(f, "approval required, wait for admin approval")
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardState {
    /// Resolution in flight. Only a neutral placeholder may show.
    Checking,
    Authorized,
    Denied(DenyReason),
}

/// What a guarded view presents for the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<T> {
    /// Neutral placeholder shown while checking; never protected content.
    Placeholder,
    Content(T),
    Redirect { to: &'static str, reason: DenyReason },
}

fn decide(required: Role, resolution: &Resolution) -> Result<(), DenyReason> {
    if resolution.role != Some(required) {
        return Err(DenyReason::Unauthorized);
    }
    if required == Role::Teacher && resolution.status != AccountStatus::Approved {
        return Err(DenyReason::ApprovalPending);
    }
    Ok(())
}

/// One-shot gate: resolve once, then render or redirect. Any resolution
/// failure denies; nothing ever fails open.
pub async fn guard<T>(
    resolver: &AuthzResolver,
    required: Role,
    render: impl FnOnce() -> T,
) -> GuardOutcome<T> {
    let denied = |reason| GuardOutcome::Redirect {
        to: required.login_route(),
        reason,
    };
    match resolver.resolve().await {
        Ok(resolution) => match decide(required, &resolution) {
            Ok(()) => GuardOutcome::Content(render()),
            Err(reason) => denied(reason),
        },
        Err(e) => {
            debug!(error = %e, "denying guarded view");
            denied(DenyReason::Unauthorized)
        }
    }
}

/// Stateful gate wrapping a long-lived view.
///
/// Starts in `Checking` and stays subscribed to identity transitions for its
/// whole lifetime; a transition drops it back to `Checking` so resolution
/// repeats before anything protected shows again.
pub struct RouteGuard {
    required: Role,
    resolver: AuthzResolver,
    identity_changes: watch::Receiver<Option<Identity>>,
    state: GuardState,
}

impl RouteGuard {
    pub fn new(
        required: Role,
        identity: Arc<dyn IdentityProvider>,
        store: Arc<dyn ProfileStore>,
    ) -> Self {
        let identity_changes = identity.on_identity_change();
        Self {
            required,
            resolver: AuthzResolver::new(identity, store),
            identity_changes,
            state: GuardState::Checking,
        }
    }

    pub fn state(&self) -> GuardState {
        self.state
    }

    /// Runs one resolution pass and settles the state. Identity transitions
    /// that happened before this pass are folded into its result.
    pub async fn evaluate(&mut self) -> GuardState {
        self.identity_changes.borrow_and_update();
        self.state = match self.resolver.resolve().await {
            Ok(resolution) => match decide(self.required, &resolution) {
                Ok(()) => GuardState::Authorized,
                Err(reason) => GuardState::Denied(reason),
            },
            Err(e) => {
                debug!(error = %e, "resolution incomplete, denying");
                GuardState::Denied(DenyReason::Unauthorized)
            }
        };
        self.state
    }

    /// Presents the view for the current state without resolving anything.
    /// `render` runs only when authorized.
    pub fn render<T>(&self, render: impl FnOnce() -> T) -> GuardOutcome<T> {
        match self.state {
            GuardState::Checking => GuardOutcome::Placeholder,
            GuardState::Authorized => GuardOutcome::Content(render()),
            GuardState::Denied(reason) => GuardOutcome::Redirect {
                to: self.required.login_route(),
                reason,
            },
        }
    }

    /// Waits for the next sign-in/sign-out transition, then resets to
    /// `Checking` so the caller re-evaluates.
    pub async fn identity_changed(&mut self) {
        if self.identity_changes.changed().await.is_err() {
            warn!("identity change stream closed");
        }
        self.state = GuardState::Checking;
    }
}
