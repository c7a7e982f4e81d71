use axum::{extract::State, http::HeaderMap, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use lectern_auth::AuthSession;
use lectern_learning::{Account, NewAccount, Role};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::{util::require_bearer, ApiError, AppState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub token: String,
    pub account: AccountResponse,
    pub expires_at: String,
}

impl SessionResponse {
    pub fn new(session: AuthSession, account: Account) -> Self {
        Self {
            token: session.token,
            account: account.into(),
            expires_at: session.expires_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccountResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(value: Account) -> Self {
        Self {
            id: value.public_id,
            name: value.name,
            email: value.email,
            role: value.role.as_str().to_string(),
            is_active: value.is_active,
            email_verified: value.email_verified,
            created_at: value.created_at,
            last_activity: value.last_activity,
        }
    }
}

/// Self-service sign-up. Always creates a learner; staff roles are assigned
/// out of band.
#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "Auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created and signed in", body = SessionResponse),
        (status = 400, description = "Invalid registration payload", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<SessionResponse>), ApiError> {
    let authenticator = state.authenticator();
    let request = NewAccount {
        name: payload.name,
        email: payload.email,
        role: Role::Learner,
    };
    let account = authenticator
        .register_with_password(request, &payload.password)
        .await?;

    let (account, session) = authenticator
        .login_with_password(&account.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(SessionResponse::new(session, account))))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Signed in", body = SessionResponse),
        (status = 401, description = "Invalid credentials", body = crate::error::ErrorResponse),
        (status = 403, description = "Account disabled", body = crate::error::ErrorResponse),
        (status = 423, description = "Account temporarily locked", body = crate::error::ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<SessionResponse>, ApiError> {
    let (account, session) = state
        .authenticator()
        .login_with_password(&payload.email, &payload.password)
        .await?;

    info!(account = %account.public_id, "signed in");
    Ok(Json(SessionResponse::new(session, account)))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "Auth",
    responses(
        (status = 204, description = "Session revoked"),
        (status = 401, description = "Missing or unknown token", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = require_bearer(&headers)?;
    state.authenticate(&token).await?;
    state.authenticator().logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "The signed-in account", body = AccountResponse),
        (status = 401, description = "Missing or invalid token", body = crate::error::ErrorResponse)
    ),
    security(("bearerAuth" = []))
)]
pub async fn me(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AccountResponse>, ApiError> {
    let token = require_bearer(&headers)?;
    let (account, _) = state.authenticate(&token).await?;
    Ok(Json(account.into()))
}
