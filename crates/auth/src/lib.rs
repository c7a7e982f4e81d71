use std::sync::Arc;

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::Duration;
use lectern_config::AuthConfig;
use lectern_learning::utils::validate_password;
use lectern_learning::{
    Account, AccountId, AccountStore, LearnerService, LearningError, LoginAttempt, NewAccount,
    SessionRecord, SessionStore,
};
use rand::RngCore;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

pub struct Authenticator<A, S> {
    learners: Arc<LearnerService<A>>,
    sessions: S,
    session_ttl: Duration,
    min_password_length: usize,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    /// Never says whether the rejected password would have matched.
    #[error("account is locked for another {remaining_seconds} seconds")]
    AccountLocked { remaining_seconds: i64 },
    #[error("account is disabled")]
    AccountDisabled,
    #[error("password hashing failed: {0}")]
    PasswordHash(#[from] argon2::password_hash::Error),
    #[error("session not found")]
    SessionNotFound,
    #[error("session expired")]
    SessionExpired,
    #[error("invalid session token")]
    InvalidSession,
    #[error(transparent)]
    Learning(LearningError),
}

impl From<LearningError> for AuthError {
    fn from(err: LearningError) -> Self {
        match err {
            LearningError::AccountLocked { remaining_seconds } => {
                AuthError::AccountLocked { remaining_seconds }
            }
            other => AuthError::Learning(other),
        }
    }
}

impl AuthError {
    /// Remaining lockout rounded up to whole minutes.
    pub fn lock_remaining_minutes(&self) -> Option<i64> {
        match self {
            AuthError::AccountLocked { remaining_seconds } => Some((remaining_seconds + 59) / 60),
            _ => None,
        }
    }
}

/// Token handed to the client after login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    #[serde(skip_serializing)]
    pub account_id: AccountId,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl From<SessionRecord> for AuthSession {
    fn from(record: SessionRecord) -> Self {
        Self {
            token: record.token,
            account_id: record.account_id,
            expires_at: record.expires_at,
        }
    }
}

impl<A, S> Authenticator<A, S>
where
    A: AccountStore,
    S: SessionStore,
{
    pub fn new(learners: Arc<LearnerService<A>>, sessions: S, config: &AuthConfig) -> Self {
        // chrono durations top out at i64::MAX milliseconds
        let ttl_seconds = i64::try_from(config.session_ttl_seconds)
            .unwrap_or(i64::MAX)
            .min(i64::MAX / 1_000);
        Self {
            learners,
            sessions,
            session_ttl: Duration::seconds(ttl_seconds),
            min_password_length: config.min_password_length,
        }
    }

    pub fn learners(&self) -> &Arc<LearnerService<A>> {
        &self.learners
    }

    pub async fn register_with_password(
        &self,
        request: NewAccount,
        password: &str,
    ) -> Result<Account, AuthError> {
        request.validate()?;
        validate_password(password, self.min_password_length)?;

        let password_hash = hash_password(password)?;
        let account = self.learners.register(request, password_hash).await?;

        info!(account = %account.public_id, "registered password account");
        Ok(account)
    }

    /// Lock check, then password, then the guard's bookkeeping, settled as
    /// one step per account so parallel guesses cannot outrun the lockout.
    ///
    /// A locked account is refused before the password is looked at, so the
    /// answer carries no information about the guess.
    pub async fn login_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<(Account, AuthSession), AuthError> {
        let Some(account) = self.learners.find_by_email(email).await? else {
            debug!("login attempt for unknown email");
            return Err(AuthError::InvalidCredentials);
        };

        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        let attempt = self
            .learners
            .attempt_login(account.id, |stored| {
                verify_password(password, &stored.password_hash)
            })
            .await?;

        match attempt {
            LoginAttempt::Accepted(account) => {
                let session = self.issue_session(account.id).await?;
                Ok((account, session))
            }
            LoginAttempt::Rejected { locked_until } => {
                if let Some(locked_until) = locked_until {
                    warn!(account = %account.public_id, %locked_until, "login locked out");
                }
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    pub async fn authenticate_token(&self, token: &str) -> Result<(Account, AuthSession), AuthError> {
        let Some(record) = self.sessions.find(token).await? else {
            return Err(AuthError::SessionNotFound);
        };

        if record.is_expired(self.learners.now()) {
            self.sessions.delete(token).await?;
            return Err(AuthError::SessionExpired);
        }

        let account = match self.learners.get_account(record.account_id).await {
            Ok(account) => account,
            Err(LearningError::NotFound(_)) => return Err(AuthError::InvalidSession),
            Err(err) => return Err(err.into()),
        };
        if !account.is_active {
            return Err(AuthError::AccountDisabled);
        }

        Ok((account, record.into()))
    }

    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.delete(token).await?;
        Ok(())
    }

    /// Revoke every session of an account. Returns how many were dropped.
    pub async fn logout_everywhere(&self, account_id: AccountId) -> Result<u64, AuthError> {
        Ok(self.sessions.delete_for_account(account_id).await?)
    }

    async fn issue_session(&self, account_id: AccountId) -> Result<AuthSession, AuthError> {
        let now = self.learners.now();
        let expires_at = now
            .checked_add_signed(self.session_ttl)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MAX_UTC);

        let record = SessionRecord {
            token: generate_session_token(),
            account_id,
            created_at: now,
            expires_at,
        };
        self.sessions.create(record.clone()).await?;

        Ok(record.into())
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn generate_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong horse", &hash).unwrap());
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn test_session_tokens_are_unique_and_url_safe() {
        let first = generate_session_token();
        let second = generate_session_token();
        assert_ne!(first, second);
        assert_eq!(first.len(), 43);
        assert!(first
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_locked_learning_error_becomes_auth_lock() {
        let err: AuthError = LearningError::AccountLocked {
            remaining_seconds: 90,
        }
        .into();
        assert!(matches!(err, AuthError::AccountLocked { remaining_seconds: 90 }));
        assert_eq!(err.lock_remaining_minutes(), Some(2));
    }
}
