//! Account administration. Every route here requires an admin token.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::response::Response;
use serde_json::Value;

use super::json_object;
use crate::api::models::CreateUserRequest;
use crate::api::response::{
    created, message, ok, ApiError, ApiResult, MSG_CREDENTIALS_REQUIRED, MSG_NO_INPUT,
};
use crate::api::AppState;
use crate::auth::AdminUser;

/// `GET /users`
pub(crate) async fn list(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Response> {
    let users = state.auth.accounts().list().await?;
    Ok(ok(users))
}

/// `POST /users`
pub(crate) async fn create(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    body: Bytes,
) -> ApiResult<Response> {
    let fields = json_object(&body).ok_or_else(|| ApiError::bad_request(MSG_NO_INPUT))?;
    let request: CreateUserRequest = serde_json::from_value(Value::Object(fields))
        .map_err(|_| ApiError::bad_request(MSG_CREDENTIALS_REQUIRED))?;

    let user = state
        .auth
        .accounts()
        .create(&request.username, &request.password, request.is_admin)
        .await?;
    tracing::info!(
        by = %admin.claims.sub,
        username = %user.username,
        is_admin = user.is_admin,
        "user created"
    );
    Ok(created(user))
}

/// `DELETE /users/{username}`
pub(crate) async fn delete(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(username): Path<String>,
) -> ApiResult<Response> {
    state.auth.accounts().delete(&username).await?;
    tracing::info!(by = %admin.claims.sub, %username, "user deleted");
    Ok(message("User deleted"))
}
