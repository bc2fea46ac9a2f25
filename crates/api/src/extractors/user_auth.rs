//! Bearer token authentication extractor.
//!
//! Tokens are issued by the hosted auth provider; this service only checks
//! the signature and expiry and reads the user ID from `sub`.

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use shared::jwt::{extract_user_id, JwtConfig};
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;

/// Authenticated user taken from a validated access token.
#[derive(Debug, Clone)]
pub struct UserAuth {
    /// User ID from the JWT subject claim.
    pub user_id: Uuid,
}

impl UserAuth {
    /// Validate an `Authorization` header value.
    pub fn from_header(header: Option<&str>, jwt: &JwtConfig) -> Result<Self, ApiError> {
        let header = header
            .ok_or_else(|| ApiError::Unauthenticated("Missing Authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ApiError::Unauthenticated("Invalid Authorization header format".to_string())
            })?;

        let claims = jwt.validate_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            ApiError::Unauthenticated("Invalid or expired token".to_string())
        })?;

        let user_id = extract_user_id(&claims)
            .map_err(|_| ApiError::Unauthenticated("Invalid or expired token".to_string()))?;

        Ok(Self { user_id })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for UserAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Already validated by the rate limit middleware
        if let Some(auth) = parts.extensions.get::<UserAuth>() {
            return Ok(auth.clone());
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let auth = Self::from_header(header, &state.jwt)?;
        parts.extensions.insert(auth.clone());
        Ok(auth)
    }
}
