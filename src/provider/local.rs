use std::collections::HashMap;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use time::{Duration as TimeDuration, OffsetDateTime};
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::TokenConfig;
use crate::provider::identity::{
    Identity, IdentityError, IdentityProvider, IdentityToken, TokenClaims,
};

const MIN_PASSWORD_LEN: usize = 6;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[derive(Clone)]
struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl_minutes: i64,
}

impl TokenKeys {
    fn new(config: &TokenConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl_minutes: config.ttl_minutes,
        }
    }

    fn sign(&self, uid: &str, role: Option<&str>) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::minutes(self.ttl_minutes);
        let claims = TokenClaims {
            sub: uid.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            role: role.map(str::to_string),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(uid = %uid, has_role_claim = role.is_some(), "token signed");
        Ok(token)
    }

    fn verify(&self, token: &str) -> anyhow::Result<TokenClaims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<TokenClaims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }
}

#[derive(Clone)]
struct CredentialRecord {
    uid: String,
    email: String,
    password_hash: String,
    role_claim: Option<String>,
}

/// In-process stand-in for the hosted identity service: argon2-hashed
/// credentials, signed short-lived tokens, a single local session slot, and
/// identity-change notifications over a watch channel.
pub struct LocalIdentityProvider {
    keys: TokenKeys,
    accounts: RwLock<HashMap<String, CredentialRecord>>,
    token_cache: Mutex<Option<IdentityToken>>,
    session: watch::Sender<Option<Identity>>,
}

impl LocalIdentityProvider {
    pub fn new(config: &TokenConfig) -> Self {
        let (session, _) = watch::channel(None);
        Self {
            keys: TokenKeys::new(config),
            accounts: RwLock::new(HashMap::new()),
            token_cache: Mutex::new(None),
            session,
        }
    }

    /// Provisions the custom role claim the way a hosted admin tool would,
    /// outside any signup flow. Deliberately leaves the token cache alone:
    /// an unforced `get_token` keeps serving the stale claims until a forced
    /// refresh, matching hosted-provider behavior.
    ///
    /// Returns `false` when no credential with that uid exists.
    pub async fn set_role_claim(&self, uid: &str, role: &str) -> bool {
        let mut accounts = self.accounts.write().await;
        match accounts.get_mut(uid) {
            Some(record) => {
                record.role_claim = Some(role.to_string());
                debug!(uid = %uid, role = %role, "role claim provisioned");
                true
            }
            None => false,
        }
    }

    async fn begin_session(&self, identity: Identity) {
        *self.token_cache.lock().await = None;
        self.session.send_replace(Some(identity));
    }
}

#[async_trait::async_trait]
impl IdentityProvider for LocalIdentityProvider {
    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(IdentityError::InvalidEmail);
        }
        if password.len() < MIN_PASSWORD_LEN {
            return Err(IdentityError::WeakPassword);
        }

        let mut accounts = self.accounts.write().await;
        if accounts.values().any(|a| a.email == email) {
            return Err(IdentityError::EmailInUse);
        }
        let password_hash =
            hash_password(password).map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        let uid = Uuid::new_v4().to_string();
        accounts.insert(
            uid.clone(),
            CredentialRecord {
                uid: uid.clone(),
                email: email.clone(),
                password_hash,
                role_claim: None,
            },
        );
        drop(accounts);

        let identity = Identity { uid, email };
        // Like the hosted service, creating a credential signs the new user in.
        self.begin_session(identity.clone()).await;
        debug!(uid = %identity.uid, "credential created");
        Ok(identity)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, IdentityError> {
        let email = email.trim().to_lowercase();
        let record = {
            let accounts = self.accounts.read().await;
            accounts.values().find(|a| a.email == email).cloned()
        };
        // Unknown email and wrong password are indistinguishable to callers.
        let record = record.ok_or(IdentityError::InvalidCredential)?;
        let ok = verify_password(password, &record.password_hash)
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        if !ok {
            return Err(IdentityError::InvalidCredential);
        }

        let identity = Identity {
            uid: record.uid,
            email: record.email,
        };
        self.begin_session(identity.clone()).await;
        debug!(uid = %identity.uid, "signed in");
        Ok(identity)
    }

    fn current_identity(&self) -> Option<Identity> {
        self.session.borrow().clone()
    }

    async fn get_token(&self, force_refresh: bool) -> Result<IdentityToken, IdentityError> {
        let identity = self.current_identity().ok_or(IdentityError::NoSession)?;

        if !force_refresh {
            let cache = self.token_cache.lock().await;
            if let Some(token) = cache.as_ref() {
                if token.claims.exp as i64 > OffsetDateTime::now_utc().unix_timestamp() {
                    return Ok(token.clone());
                }
            }
        }

        let role = {
            let accounts = self.accounts.read().await;
            accounts
                .get(&identity.uid)
                .and_then(|a| a.role_claim.clone())
        };
        let raw = self
            .keys
            .sign(&identity.uid, role.as_deref())
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;
        let claims = self
            .keys
            .verify(&raw)
            .map_err(|e| IdentityError::Unavailable(e.to_string()))?;

        let token = IdentityToken { raw, claims };
        *self.token_cache.lock().await = Some(token.clone());
        Ok(token)
    }

    fn on_identity_change(&self) -> watch::Receiver<Option<Identity>> {
        self.session.subscribe()
    }

    async fn sign_out(&self) {
        *self.token_cache.lock().await = None;
        self.session.send_replace(None);
        debug!("session cleared");
    }
}
