use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::{async_trait, extract::FromRequestParts};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::user::User;
use crate::state::AppState;
use crate::utils::error::AppError;

/// The caller's identity, if any. Anonymous requests are allowed on read
/// endpoints; they simply never pass the coorganizer check.
pub struct CurrentUser(pub Option<User>);

/// Identity that must be present. Rejects anonymous requests with 401.
pub struct AuthenticatedUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let Some(token) = bearer_token(&parts.headers)? else {
            return Ok(CurrentUser(None));
        };

        match lookup_token(&state.pool, token).await? {
            Some(user) => Ok(CurrentUser(Some(user))),
            None => Err(AppError::Auth("invalid or expired API token".to_string())),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        user.map(AuthenticatedUser)
            .ok_or_else(|| AppError::Auth("authentication required".to_string()))
    }
}

/// Extracts the token from `Authorization: Bearer <token>`. A missing
/// header means an anonymous caller; a malformed one is a client error.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AppError::Auth("malformed Authorization header".to_string()))?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(Some(token.trim())),
        _ => Err(AppError::Auth("expected a Bearer token".to_string())),
    }
}

async fn lookup_token(pool: &PgPool, token: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT u.id, u.name, u.email, u.created_at, u.updated_at \
         FROM users u \
         JOIN api_tokens t ON t.user_id = u.id \
         WHERE t.token = $1 AND (t.expires_at IS NULL OR t.expires_at > now())",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// True when the user holds an organizer or coorganizer role for the event.
pub async fn is_coorganizer(pool: &PgPool, user_id: Uuid, event_id: Uuid) -> Result<bool, AppError> {
    let roles: i64 = sqlx::query_scalar(
        "SELECT count(*) FROM event_roles \
         WHERE user_id = $1 AND event_id = $2 AND role IN ('organizer', 'coorganizer')",
    )
    .bind(user_id)
    .bind(event_id)
    .fetch_one(pool)
    .await?;

    Ok(roles > 0)
}

/// Coorganizer check that treats anonymous callers as unprivileged without
/// touching the database.
pub async fn can_manage(
    pool: &PgPool,
    user: Option<&User>,
    event_id: Uuid,
) -> Result<bool, AppError> {
    match user {
        Some(user) => is_coorganizer(pool, user.id, event_id).await,
        None => Ok(false),
    }
}
