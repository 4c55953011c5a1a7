//! Auth gate: resolves a bearer token to a `Caller` before protected handlers run.
//! Token issuance lives elsewhere; this module only looks tokens up.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

/// Authenticated identity attached to request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Uuid,
}

#[async_trait]
pub trait Authenticator: Send + Sync {
    /// `Ok(None)` for unknown or expired tokens.
    async fn authenticate(&self, token: &str) -> Result<Option<Caller>>;
}

/// Looks tokens up in the `auth_tokens` table.
pub struct PgAuthenticator {
    pool: PgPool,
}

impl PgAuthenticator {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Authenticator for PgAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Option<Caller>> {
        let user_id: Option<Uuid> = sqlx::query_scalar(
            r#"
            SELECT user_id FROM auth_tokens
            WHERE token = $1 AND (expires_at IS NULL OR expires_at > now())
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user_id.map(|user_id| Caller { user_id }))
    }
}

/// Fixed token table, for the in-memory backend.
#[derive(Debug, Default)]
pub struct StaticAuthenticator {
    tokens: HashMap<String, Uuid>,
}

impl StaticAuthenticator {
    pub fn new(tokens: impl IntoIterator<Item = (String, Uuid)>) -> Self {
        Self {
            tokens: tokens.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<Option<Caller>> {
        Ok(self
            .tokens
            .get(token)
            .map(|&user_id| Caller { user_id }))
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Middleware for protected routes. Inserts `Caller` into extensions or rejects with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(request.headers())
        .map(str::to_owned)
        .ok_or(AppError::Unauthorized)?;

    let caller = state
        .auth
        .authenticate(&token)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| {
            tracing::warn!("Rejected unknown bearer token");
            AppError::Unauthorized
        })?;

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}
