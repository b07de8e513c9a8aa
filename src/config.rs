use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Public origin used when building verification links.
    pub base_url: String,
    /// Accounts on this email domain skip verification entirely.
    pub trusted_email_domain: Option<String>,
    pub verification_token_ttl_hours: i64,
    /// Whether login distinguishes "not verified" from bad credentials.
    pub reveal_unverified: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let auth = AuthConfig {
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".into()),
            trusted_email_domain: std::env::var("TRUSTED_EMAIL_DOMAIN")
                .ok()
                .filter(|v| !v.is_empty()),
            verification_token_ttl_hours: std::env::var("VERIFICATION_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(24),
            reveal_unverified: std::env::var("AUTH_REVEAL_UNVERIFIED")
                .map(|v| v == "true")
                .unwrap_or(false),
        };
        Ok(Self { database_url, auth })
    }
}
