use thiserror::Error;

use crate::provider::identity::IdentityError;
use crate::provider::store::StoreError;

/// Everything a portal operation can surface to the caller.
///
/// These are values the UI layer renders, not panics. Partial attendance
/// failure is deliberately absent: it is reported through
/// [`BatchOutcome`](crate::attendance::BatchOutcome), never as an error.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Input rejected before any provider call was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No signed-in identity.
    #[error("not signed in")]
    Unauthenticated,

    /// Signed in, but the resolved role does not grant access.
    #[error("not authorized for this area")]
    NotAuthorized,

    /// Right role, but the account has not been approved yet.
    #[error("approval required, wait for admin approval")]
    ApprovalPending,

    /// Role/status resolution failed on both the token and the record path.
    /// Callers must treat this exactly like [`PortalError::Unauthenticated`].
    #[error("could not resolve role and status")]
    ResolutionFailed,

    /// The email is already registered with the identity provider.
    #[error("an account with this email already exists")]
    DuplicateIdentity,

    /// Sign-in rejected by the identity provider.
    #[error("invalid email or password")]
    InvalidCredential,

    #[error("profile store error: {0}")]
    Store(#[from] StoreError),
}

impl From<IdentityError> for PortalError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::EmailInUse => PortalError::DuplicateIdentity,
            IdentityError::InvalidEmail => {
                PortalError::Validation("email address is not valid".into())
            }
            IdentityError::WeakPassword => {
                PortalError::Validation("password must be at least 6 characters".into())
            }
            IdentityError::InvalidCredential => PortalError::InvalidCredential,
            IdentityError::NoSession => PortalError::Unauthenticated,
            IdentityError::Unavailable(msg) => {
                PortalError::Store(StoreError::Unavailable(msg))
            }
        }
    }
}

pub type PortalResult<T, E = PortalError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_errors_map_onto_portal_taxonomy() {
        assert!(matches!(
            PortalError::from(IdentityError::EmailInUse),
            PortalError::DuplicateIdentity
        ));
        assert!(matches!(
            PortalError::from(IdentityError::WeakPassword),
            PortalError::Validation(_)
        ));
        assert!(matches!(
            PortalError::from(IdentityError::InvalidCredential),
            PortalError::InvalidCredential
        ));
        assert!(matches!(
            PortalError::from(IdentityError::NoSession),
            PortalError::Unauthenticated
        ));
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(
            PortalError::ApprovalPending.to_string(),
            "approval required, wait for admin approval"
        );
        assert_eq!(
            PortalError::InvalidCredential.to_string(),
            "invalid email or password"
        );
    }
}
