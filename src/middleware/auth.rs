use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::AppError;

/// Header carrying the caller's user id
///
/// Identity is asserted by the gateway in front of this service, so the
/// value is trusted as-is here.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Caller identity for the authenticated routes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser(pub i64);

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                AppError::Unauthorized(format!("missing {} header", USER_ID_HEADER))
            })?;

        raw.parse::<i64>().map(AuthUser).map_err(|_| {
            AppError::Unauthorized(format!("malformed {} header", USER_ID_HEADER))
        })
    }
}
