use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::account::repo::USERS;
use crate::account::repo_types::{AccountStatus, Role};
use crate::error::PortalError;
use crate::provider::identity::{Identity, IdentityProvider};
use crate::provider::store::ProfileStore;

/// Outcome of one role/status resolution. `role == None` means neither the
/// claim nor the record named a usable role; callers deny in that case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub role: Option<Role>,
    pub status: AccountStatus,
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no signed-in identity")]
    Unauthenticated,
    #[error("both token fetch and record read failed")]
    Failed,
}

impl From<ResolveError> for PortalError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::Unauthenticated => PortalError::Unauthenticated,
            ResolveError::Failed => PortalError::ResolutionFailed,
        }
    }
}

fn role_from_doc(doc: &Value) -> Option<Role> {
    doc.get("role")
        .and_then(Value::as_str)
        .and_then(Role::from_str)
}

fn status_from_doc(doc: &Value) -> AccountStatus {
    doc.get("status")
        .and_then(Value::as_str)
        .and_then(AccountStatus::from_str)
        .unwrap_or_default()
}

/// Claims-first role resolution with record fallback.
///
/// The role claim on a fresh token is authoritative when present; otherwise
/// the account record's `role` field is used. Status is never carried by
/// claims and is always read from the record, defaulting to pending whenever
/// the record is missing or unreadable. Read-only apart from the token
/// refresh itself.
pub struct AuthzResolver {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn ProfileStore>,
}

impl AuthzResolver {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn ProfileStore>) -> Self {
        Self { identity, store }
    }

    /// Resolves the currently signed-in identity, if any.
    pub async fn resolve(&self) -> Result<Resolution, ResolveError> {
        let identity = self
            .identity
            .current_identity()
            .ok_or(ResolveError::Unauthenticated)?;
        self.resolve_identity(&identity).await
    }

    /// Resolves a known identity, e.g. one just returned by sign-in.
    ///
    /// Each source failing alone degrades to the other; only both failing
    /// together is a [`ResolveError::Failed`], which callers must gate
    /// exactly like [`ResolveError::Unauthenticated`].
    pub async fn resolve_identity(&self, identity: &Identity) -> Result<Resolution, ResolveError> {
        let claim_role: Result<Option<Role>, ()> = match self.identity.get_token(true).await {
            Ok(token) => Ok(token.claims.role.as_deref().and_then(Role::from_str)),
            Err(e) => {
                warn!(uid = %identity.uid, error = %e, "token fetch failed during resolution");
                Err(())
            }
        };

        let record: Result<Option<Value>, ()> = match self.store.get(USERS, &identity.uid).await {
            Ok(doc) => Ok(doc),
            Err(e) => {
                warn!(uid = %identity.uid, error = %e, "record read failed during resolution");
                Err(())
            }
        };

        if claim_role.is_err() && record.is_err() {
            return Err(ResolveError::Failed);
        }
        let claim_role = claim_role.unwrap_or(None);
        let record = record.unwrap_or(None);

        let role = claim_role.or_else(|| record.as_ref().and_then(role_from_doc));
        let status = record.as_ref().map(status_from_doc).unwrap_or_default();

        debug!(
            uid = %identity.uid,
            role = role.map(|r| r.as_str()).unwrap_or("none"),
            status = status.as_str(),
            "resolved"
        );
        Ok(Resolution { role, status })
    }
}
