use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    pub token: TokenConfig,
}

impl PortalConfig {
    /// Loads configuration from the environment, reading a `.env` file first
    /// when one is present. Only the token secret is mandatory.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let token = TokenConfig {
            secret: std::env::var("PORTAL_TOKEN_SECRET")?,
            issuer: std::env::var("PORTAL_TOKEN_ISSUER")
                .unwrap_or_else(|_| "studentdiary".into()),
            audience: std::env::var("PORTAL_TOKEN_AUDIENCE")
                .unwrap_or_else(|_| "studentdiary-clients".into()),
            ttl_minutes: std::env::var("PORTAL_TOKEN_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(60),
        };
        Ok(Self { token })
    }

    /// Fixed configuration for in-process providers, no environment reads.
    pub fn local() -> Self {
        Self {
            token: TokenConfig {
                secret: "local-dev-secret-not-for-production".into(),
                issuer: "studentdiary".into(),
                audience: "studentdiary-clients".into(),
                ttl_minutes: 60,
            },
        }
    }
}
