use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use serde::Deserialize;
use tracing::warn;

use crate::{error::AppError, AppState};

/// Identity attached to a valid api token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPayload {
    pub username: String,
}

pub struct AuthenticatedUser(pub TokenPayload);

#[derive(Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = request_token(parts).ok_or(AppError::Unauthorized)?;

        let config = state.config.read().await;
        if config.api_token.is_empty() || token != config.api_token {
            warn!("Rejected invalid api token for {}", parts.uri.path());
            return Err(AppError::Unauthorized);
        }

        Ok(AuthenticatedUser(TokenPayload {
            username: config.username.clone(),
        }))
    }
}

/// Token from `Authorization: Bearer ...`, else from the `token` query parameter.
fn request_token(parts: &Parts) -> Option<String> {
    let bearer = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            value
                .strip_prefix("Bearer ")
                .or_else(|| value.strip_prefix("bearer "))
        })
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    let query = parts.uri.query()?;
    serde_urlencoded::from_str::<TokenQuery>(query)
        .ok()?
        .token
        .filter(|token| !token.is_empty())
}
