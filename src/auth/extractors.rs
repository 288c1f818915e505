use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use tracing::warn;

use super::{claims::Claims, error::AuthError, jwt::JwtKeys};

/// How much a route demands of the caller's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// Any valid, unexpired token.
    Authorized,
    /// A valid token whose `isAdmin` claim is true.
    Admin,
}

/// Verifies the bearer token in `headers` against `level`.
pub fn authorize(headers: &HeaderMap, keys: &JwtKeys, level: Protection) -> Result<Claims, AuthError> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::Unauthorized)?;

    let claims = keys.verify(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        AuthError::from(e)
    })?;

    if level == Protection::Admin && !claims.identity.is_admin {
        warn!(user_id = claims.identity.id, "admin route denied");
        return Err(AuthError::Unauthorized);
    }

    Ok(claims)
}

fn guard<S>(parts: &mut Parts, state: &S, level: Protection) -> Result<Claims, AuthError>
where
    JwtKeys: FromRef<S>,
{
    let keys = JwtKeys::from_ref(state);
    let claims = authorize(&parts.headers, &keys, level)?;
    parts.extensions.insert(claims.clone());
    Ok(claims)
}

/// Caller holding any valid token.
pub struct AuthUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        guard(parts, state, Protection::Authorized).map(AuthUser)
    }
}

/// Caller holding a valid admin token.
pub struct AdminUser(pub Claims);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        guard(parts, state, Protection::Admin).map(AdminUser)
    }
}
