//! Authentication context extraction
//!
//! Handlers that take an [`AuthContext`] require a valid bearer token. When
//! anonymous access is enabled, requests without one (or with an invalid or
//! expired one) act as the demo user instead of being rejected.

use crate::auth::TokenError;
use crate::error::ApiError;
use crate::server::{AnonymousAccess, CopilotServer};
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use tracing::debug;

/// The doctor a request acts for
#[derive(Debug, Clone, PartialEq)]
pub struct AuthContext {
    pub user_id: i32,
    pub email: String,
    /// Set when the request fell back to the demo user
    pub anonymous: bool,
}

impl AuthContext {
    pub fn new(user_id: i32, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
            anonymous: false,
        }
    }
}

/// Bearer token from the Authorization header
fn extract_token(parts: &Parts) -> Result<&str, ApiError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ApiError::authentication("Invalid Authorization header format. Expected: Bearer <token>")
        })
}

fn authenticate(parts: &Parts, server: &CopilotServer) -> Result<AuthContext, ApiError> {
    let token = extract_token(parts)?;
    let claims = server.tokens.validate(token).map_err(|e| match e {
        TokenError::Expired => ApiError::authentication("Token expired"),
        _ => ApiError::authentication("Invalid token"),
    })?;
    let user_id = claims
        .user_id()
        .map_err(|_| ApiError::authentication("Invalid token"))?;

    Ok(AuthContext::new(user_id, claims.email))
}

#[async_trait]
impl FromRequestParts<CopilotServer> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &CopilotServer,
    ) -> Result<Self, Self::Rejection> {
        match authenticate(parts, server) {
            Ok(context) => Ok(context),
            Err(rejection) => match &server.anonymous {
                AnonymousAccess::Allowed { user_id, email } => {
                    debug!(reason = %rejection, "Request acting as demo user");
                    Ok(AuthContext {
                        user_id: *user_id,
                        email: email.clone(),
                        anonymous: true,
                    })
                }
                AnonymousAccess::Denied => Err(rejection),
            },
        }
    }
}
