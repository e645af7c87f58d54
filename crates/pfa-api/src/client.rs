//! HTTP client for the login contract.
//!
//! ```no_run
//! # async fn demo() -> pfa_api::Result<()> {
//! let client = pfa_api::Client::new(pfa_api::client::DEFAULT_BASE_URL)?;
//! let login = client.login("admin", "admin").await?;
//! let me = client.me(&login.token).await?;
//! assert_eq!(me.username, "admin");
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::api::models::{Envelope, HealthData, LoginData, LoginRequest, VerifyData, VerifyRequest};
use crate::error::{Error, Result};
use crate::storage::User;

/// Where a locally running server listens by default.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Client bound to one API base URL.
#[derive(Debug, Clone)]
pub struct Client {
    http: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Create a client for `base_url`, e.g. [`DEFAULT_BASE_URL`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("pfa-api/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    /// The base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] with the server's message on rejection, or a
    /// transport error.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginData> {
        let request = self.http.post(self.url("/auth/login")).json(&LoginRequest {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        });
        send(request).await
    }

    /// Ask the server whether a token is valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the token is rejected, or a transport error.
    pub async fn verify(&self, token: &str) -> Result<VerifyData> {
        let request = self.http.post(self.url("/auth/verify")).json(&VerifyRequest {
            token: Some(token.to_string()),
        });
        send(request).await
    }

    /// Fetch the account behind a token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the token is rejected, or a transport error.
    pub async fn me(&self, token: &str) -> Result<User> {
        send(self.http.get(self.url("/auth/me")).bearer_auth(token)).await
    }

    /// Revoke a token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Api`] if the token is rejected, or a transport error.
    pub async fn logout(&self, token: &str) -> Result<()> {
        let request = self.http.post(self.url("/auth/logout")).bearer_auth(token);
        send_for_envelope::<serde_json::Value>(request).await?;
        Ok(())
    }

    /// Check that the server is up.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the server is unreachable.
    pub async fn health(&self) -> Result<HealthData> {
        send(self.http.get(self.url("/health"))).await
    }
}

/// Send a request and unwrap the envelope's `data`.
async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T> {
    let (status, envelope) = send_for_envelope::<T>(request).await?;
    into_data(status, envelope)
}

async fn send_for_envelope<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<(StatusCode, Envelope<T>)> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.bytes().await?;
    Ok((status, decode_envelope(status, &body)?))
}

/// Parse a response body, turning non-2xx statuses into [`Error::Api`].
fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<Envelope<T>> {
    if !status.is_success() {
        let message = serde_json::from_slice::<Envelope<serde_json::Value>>(body)
            .map(|envelope| envelope.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        return Err(Error::Api {
            status: status.as_u16(),
            message,
        });
    }

    Ok(serde_json::from_slice(body)?)
}

fn into_data<T>(status: StatusCode, envelope: Envelope<T>) -> Result<T> {
    envelope.data.ok_or_else(|| Error::Api {
        status: status.as_u16(),
        message: "response carried no data".to_string(),
    })
}
