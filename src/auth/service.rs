use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::{Duration, OffsetDateTime};
use tracing::{info, warn};

use crate::auth::store::{NewUser, User, UserStore};
use crate::auth::{password, token};
use crate::error::{AuthError, StoreError};
use crate::notify::Notifier;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Knobs governing registration and login behavior.
#[derive(Debug, Clone)]
pub struct VerificationPolicy {
    /// Accounts on this domain are created already verified and get no
    /// verification email.
    pub trusted_domain: Option<String>,
    /// How long an issued verification token stays redeemable.
    pub token_ttl: Duration,
    /// Prefix for verification links sent to users.
    pub base_url: String,
    /// When true, login on an unverified account reports "not verified"
    /// instead of the generic credentials failure.
    pub reveal_unverified: bool,
}

impl VerificationPolicy {
    fn requires_verification(&self, email: &str) -> bool {
        match &self.trusted_domain {
            Some(domain) => !email.ends_with(&format!("@{domain}")),
            None => true,
        }
    }

    fn verification_link(&self, token: &str) -> String {
        format!("{}/auth/verify/{}", self.base_url.trim_end_matches('/'), token)
    }
}

impl From<&crate::config::AuthConfig> for VerificationPolicy {
    fn from(cfg: &crate::config::AuthConfig) -> Self {
        Self {
            trusted_domain: cfg.trusted_email_domain.clone(),
            token_ttl: Duration::hours(cfg.verification_token_ttl_hours),
            base_url: cfg.base_url.clone(),
            reveal_unverified: cfg.reveal_unverified,
        }
    }
}

/// Outcome of a successful registration.
#[derive(Debug)]
pub struct Registration {
    pub user: User,
    /// True when the account still needs its email verified.
    pub verification_pending: bool,
}

/// Orchestrates registration, credential authentication and email
/// verification against the user store.
pub struct AuthService {
    users: Arc<dyn UserStore>,
    notifier: Arc<dyn Notifier>,
    policy: VerificationPolicy,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        notifier: Arc<dyn Notifier>,
        policy: VerificationPolicy,
    ) -> Self {
        Self {
            users,
            notifier,
            policy,
        }
    }

    /// Create an account. The email is normalized first; a duplicate fails
    /// with `EmailTaken` whether it is caught by the pre-check or by the
    /// store's unique index (two registrations racing resolve there).
    pub async fn register(&self, email: &str, plain: &str) -> Result<Registration, AuthError> {
        let email = normalize_email(email);

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = password::hash_password(plain)?;

        let needs_verification = self.policy.requires_verification(&email);
        let verification_token = if needs_verification {
            Some(token::generate()?)
        } else {
            None
        };
        let token_expiry = verification_token
            .as_ref()
            .map(|_| OffsetDateTime::now_utc() + self.policy.token_ttl);

        let user = match self
            .users
            .create(NewUser {
                email,
                password_hash,
                verified: !needs_verification,
                verification_token: verification_token.clone(),
                token_expiry,
            })
            .await
        {
            Ok(user) => user,
            Err(StoreError::UniqueViolation) => return Err(AuthError::EmailTaken),
            Err(e) => return Err(e.into()),
        };

        // Notification is best-effort: the account exists either way, the
        // user just cannot verify until a resend path is added.
        if let Some(token) = &verification_token {
            let link = self.policy.verification_link(token);
            if let Err(e) = self
                .notifier
                .send_verification_email(&user.email, &link)
                .await
            {
                warn!(error = %e, email = %user.email, "verification email not delivered");
            }
        }

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(Registration {
            verification_pending: needs_verification,
            user,
        })
    }

    /// Check credentials and return the identity. Unknown email, wrong
    /// password and (unless the policy says otherwise) unverified accounts
    /// all fail with the same `InvalidCredentials`.
    pub async fn authenticate(&self, email: &str, plain: &str) -> Result<User, AuthError> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_by_email(&email).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if !user.verified {
            if self.policy.reveal_unverified {
                return Err(AuthError::EmailUnverified);
            }
            return Err(AuthError::InvalidCredentials);
        }

        if !password::verify_password(plain, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Redeem a verification token. Absent, expired and already consumed
    /// tokens are indistinguishable to the caller.
    pub async fn verify_email(&self, token: &str) -> Result<(), AuthError> {
        let Some(user) = self.users.find_by_verification_token(token).await? else {
            return Err(AuthError::InvalidToken);
        };

        match user.token_expiry {
            Some(expiry) if OffsetDateTime::now_utc() < expiry => {}
            _ => return Err(AuthError::InvalidToken),
        }

        // mark_verified is conditional on a token still being pending, so a
        // concurrent redemption of the same token settles here.
        if !self.users.mark_verified(user.id).await? {
            return Err(AuthError::InvalidToken);
        }

        info!(user_id = %user.id, email = %user.email, "email verified");
        Ok(())
    }

    /// UX pre-check for the signup form. Deliberately leaks account
    /// existence, which is why login errors being uniform is only a partial
    /// anti-enumeration measure.
    pub async fn email_exists(&self, email: &str) -> Result<bool, AuthError> {
        let email = normalize_email(email);
        Ok(self.users.find_by_email(&email).await?.is_some())
    }
}
