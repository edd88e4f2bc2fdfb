//! JWT-based authentication extractors for Axum handlers.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use planpoker_core::error::CoreError;
use planpoker_core::roles::ROLE_ADMIN;
use planpoker_core::types::DbId;
use planpoker_db::models::user::UserSummary;
use serde::Deserialize;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated, active user.
///
/// The token only carries the user id; the account is re-read on every
/// request so deactivated users are rejected even with a valid token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user's internal database id (from `claims.sub`).
    pub user_id: DbId,
    /// Global role name (`"admin"` or `"user"`).
    pub role: String,
    pub name: String,
    pub email: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.user_id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

fn unauthorized(msg: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(msg.into()))
}

/// Validate a raw token and load the active user it names.
pub async fn authenticate(state: &AppState, token: &str) -> Result<AuthUser, AppError> {
    let claims = validate_token(token, &state.config.jwt)
        .map_err(|_| unauthorized("Invalid or expired token"))?;

    let user = state
        .store
        .get_user_by_id(claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| unauthorized("User not found or inactive"))?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
        name: user.name,
        email: user.email,
    })
}

fn bearer_token(parts: &Parts) -> Result<Option<&str>, AppError> {
    let Some(header) = parts.headers.get("authorization") else {
        return Ok(None);
    };
    let value = header
        .to_str()
        .map_err(|_| unauthorized("Invalid Authorization header"))?;
    value.strip_prefix("Bearer ").map(Some).ok_or_else(|| {
        unauthorized("Invalid Authorization format. Expected: Bearer <token>")
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token =
            bearer_token(parts)?.ok_or_else(|| unauthorized("Missing Authorization header"))?;
        authenticate(state, token).await
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Authenticated user for a WebSocket upgrade.
///
/// Browsers cannot set headers on WebSocket handshakes, so the token may
/// also arrive as `?token=<jwt>`. The header wins when both are present.
#[derive(Debug, Clone)]
pub struct WsAuthUser(pub AuthUser);

impl FromRequestParts<AppState> for WsAuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(token) = bearer_token(parts)? {
            return authenticate(state, token).await.map(WsAuthUser);
        }

        let query = Query::<TokenQuery>::try_from_uri(&parts.uri)
            .map_err(|_| unauthorized("Invalid query string"))?;
        let token = query
            .0
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| unauthorized("Missing access token"))?;
        authenticate(state, &token).await.map(WsAuthUser)
    }
}
