//! HTTP API.
//!
//! Every route lives under [`API_PREFIX`] and answers with the JSON
//! envelope from [`models::Envelope`]:
//!
//! | Method | Path | Guard |
//! |--------|------|-------|
//! | POST | `/auth/login` | none |
//! | POST | `/auth/verify` | none |
//! | POST | `/auth/logout` | bearer |
//! | GET | `/auth/me` | bearer |
//! | GET | `/health` | none |
//! | GET, POST | `/users` | admin |
//! | DELETE | `/users/{username}` | admin |

mod handlers;
pub mod models;
pub mod rate_limit;
pub mod response;

use std::sync::Arc;

use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::AuthService;
use crate::config::{Config, CorsConfig};
use crate::error::{Error, Result};

pub use rate_limit::RateLimiter;
pub use response::{ApiError, ApiResult};

/// Path prefix of every route.
pub const API_PREFIX: &str = "/api/v1";

/// State shared by all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Authentication service.
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wrap an authentication service.
    #[must_use]
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth: Arc::new(auth),
        }
    }
}

/// Build the application router.
///
/// # Errors
///
/// Returns an error if a configured CORS origin is not a valid header value.
pub fn router(state: AppState, config: &Config) -> Result<Router> {
    let mut auth_routes = Router::new()
        .route("/auth/login", post(handlers::auth::login))
        .route("/auth/verify", post(handlers::auth::verify));

    let mut api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route("/auth/me", get(handlers::auth::me))
        .route("/auth/logout", post(handlers::auth::logout))
        .route(
            "/users",
            get(handlers::users::list).post(handlers::users::create),
        )
        .route("/users/{username}", delete(handlers::users::delete));

    if config.rate_limit.enabled {
        let auth_limiter = Arc::new(RateLimiter::per_minute(config.rate_limit.auth_per_minute));
        let api_limiter = Arc::new(RateLimiter::per_minute(config.rate_limit.api_per_minute));
        auth_routes = auth_routes.route_layer(middleware::from_fn_with_state(
            auth_limiter,
            rate_limit::enforce,
        ));
        api_routes = api_routes.route_layer(middleware::from_fn_with_state(
            api_limiter,
            rate_limit::enforce,
        ));
    }

    Ok(Router::new()
        .nest(
            API_PREFIX,
            auth_routes
                .merge(api_routes)
                .method_not_allowed_fallback(method_not_allowed),
        )
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&config.cors)?),
        )
        .with_state(state))
}

fn cors_layer(config: &CorsConfig) -> Result<CorsLayer> {
    let origin = if config.origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let origins = config
            .origins
            .iter()
            .map(|origin| {
                origin.parse::<HeaderValue>().map_err(|_| {
                    Error::config_validation(format!("invalid CORS origin: {origin}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS]))
}

async fn not_found() -> Response {
    ApiError::not_found(response::MSG_NOT_FOUND).into_response()
}

async fn method_not_allowed() -> Response {
    ApiError::new(StatusCode::METHOD_NOT_ALLOWED, response::MSG_METHOD_NOT_ALLOWED).into_response()
}
