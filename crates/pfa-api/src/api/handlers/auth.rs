//! Login, token verification, logout and the current-user lookup.

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;

use super::{json_object, string_field};
use crate::api::models::{LoginData, VerifyData};
use crate::api::response::{
    message, ok, ApiError, ApiResult, MSG_CREDENTIALS_REQUIRED, MSG_CREDENTIALS_TOO_LONG,
    MSG_NO_INPUT, MSG_TOKEN_REQUIRED, MSG_USER_NOT_FOUND,
};
use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::Error;
use crate::storage::{MAX_PASSWORD_LENGTH, MAX_USERNAME_LENGTH};

/// `POST /auth/login`
///
/// The body is taken raw so that malformed input gets the envelope error
/// instead of axum's plain-text JSON rejection.
pub(crate) async fn login(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let fields = json_object(&body).ok_or_else(|| ApiError::bad_request(MSG_NO_INPUT))?;

    let (Some(username), Some(password)) = (
        string_field(&fields, "username"),
        string_field(&fields, "password"),
    ) else {
        return Err(ApiError::bad_request(MSG_CREDENTIALS_REQUIRED));
    };

    if username.len() > MAX_USERNAME_LENGTH || password.len() > MAX_PASSWORD_LENGTH {
        return Err(ApiError::bad_request(MSG_CREDENTIALS_TOO_LONG));
    }

    let outcome = state.auth.login(username, password).await?;
    Ok(ok(LoginData {
        expires_at: outcome.token.claims.expires_at(),
        token: outcome.token.token,
        user: outcome.user,
    }))
}

/// `POST /auth/verify`
pub(crate) async fn verify(State(state): State<AppState>, body: Bytes) -> ApiResult<Response> {
    let token = json_object(&body)
        .as_ref()
        .and_then(|fields| string_field(fields, "token"))
        .map(str::to_string)
        .ok_or_else(|| ApiError::bad_request(MSG_TOKEN_REQUIRED))?;

    let claims = state.auth.authenticate(&token).await?;
    Ok(ok(VerifyData {
        valid: true,
        expires_at: claims.expires_at(),
        user_id: claims.sub,
        is_admin: claims.is_admin,
    }))
}

/// `POST /auth/logout`
pub(crate) async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> ApiResult<Response> {
    state.auth.logout(&user.token, &user.claims).await?;
    Ok(message("Logged out"))
}

/// `GET /auth/me`
pub(crate) async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<Response> {
    match state.auth.current_user(&user.claims).await {
        Ok(account) => Ok(ok(account)),
        Err(Error::UserNotFound { .. }) => Err(ApiError::unauthorized(MSG_USER_NOT_FOUND)),
        Err(err) => Err(err.into()),
    }
}
