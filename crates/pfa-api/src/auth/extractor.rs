//! Request guards for protected routes.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use super::Claims;
use crate::api::response::{ApiError, MSG_ADMIN_REQUIRED, MSG_AUTH_MISSING};
use crate::api::AppState;

/// The caller behind a valid, unrevoked bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Claims from the token.
    pub claims: Claims,
    /// The raw token, needed to revoke it on logout.
    pub token: String,
}

/// Like [`AuthUser`], but the token must carry the admin flag.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

/// Pull the token out of `Authorization: Bearer <token>`.
pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::unauthorized(MSG_AUTH_MISSING))?
            .to_string();

        let app = AppState::from_ref(state);
        let claims = app
            .auth
            .authenticate(&token)
            .await
            .map_err(ApiError::from_bearer)?;
        Ok(Self { claims, token })
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if !user.claims.is_admin {
            tracing::debug!(username = %user.claims.sub, "admin route refused");
            return Err(ApiError::forbidden(MSG_ADMIN_REQUIRED));
        }
        Ok(Self(user))
    }
}
