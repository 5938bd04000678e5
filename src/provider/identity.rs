use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

/// A signed-in principal as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
}

/// Payload of a provider-issued token. `role` is an optional custom claim
/// provisioned out-of-band; tokens never carry account status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// A raw signed token together with its decoded claims.
#[derive(Debug, Clone)]
pub struct IdentityToken {
    pub raw: String,
    pub claims: TokenClaims,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("email already in use")]
    EmailInUse,
    #[error("email address is not valid")]
    InvalidEmail,
    #[error("password too weak")]
    WeakPassword,
    #[error("invalid credentials")]
    InvalidCredential,
    #[error("no active session")]
    NoSession,
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Hosted credential service. Owns sessions and token minting; the portal
/// never sees passwords after the initial call.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates a credential and signs the new identity in.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError>;

    /// Currently signed-in identity, if any. Session state is provider-local,
    /// so this never suspends.
    fn current_identity(&self) -> Option<Identity>;

    /// Returns a token for the current identity. `force_refresh` bypasses any
    /// cached token so freshly provisioned claims become visible.
    async fn get_token(&self, force_refresh: bool) -> Result<IdentityToken, IdentityError>;

    /// Subscribes to sign-in/sign-out transitions. Dropping the receiver
    /// unsubscribes.
    fn on_identity_change(&self) -> watch::Receiver<Option<Identity>>;

    async fn sign_out(&self);
}
