use axum::response::Response;

use crate::api::models::HealthData;
use crate::api::response::ok;

/// `GET /health`
pub(crate) async fn health() -> Response {
    ok(HealthData {
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
