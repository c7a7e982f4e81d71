use std::sync::Arc;

use lectern_auth::{AuthSession, Authenticator};
use lectern_database::{SqliteAccountRepository, SqliteSessionRepository};
use lectern_learning::{Account, LearnerService, Role};

use crate::ApiError;

pub type Learners = LearnerService<SqliteAccountRepository>;
pub type SessionAuthenticator = Authenticator<SqliteAccountRepository, SqliteSessionRepository>;

#[derive(Clone)]
pub struct AppState {
    learners: Arc<Learners>,
    authenticator: Arc<SessionAuthenticator>,
}

impl AppState {
    pub fn new(authenticator: Arc<SessionAuthenticator>) -> Self {
        Self {
            learners: authenticator.learners().clone(),
            authenticator,
        }
    }

    pub fn learners(&self) -> &Learners {
        &self.learners
    }

    pub fn authenticator(&self) -> &SessionAuthenticator {
        &self.authenticator
    }

    pub async fn authenticate(&self, token: &str) -> Result<(Account, AuthSession), ApiError> {
        self.authenticator
            .authenticate_token(token)
            .await
            .map_err(ApiError::from)
    }

    /// Authenticate and insist on a capability of the caller's role.
    pub async fn authenticate_with(
        &self,
        token: &str,
        allowed: fn(&Role) -> bool,
    ) -> Result<Account, ApiError> {
        let (account, _) = self.authenticate(token).await?;
        if !allowed(&account.role) {
            return Err(ApiError::forbidden(format!(
                "role '{}' may not perform this action",
                account.role
            )));
        }
        Ok(account)
    }
}
