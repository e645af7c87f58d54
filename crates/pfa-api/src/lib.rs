//! `pfa-api` - Authentication service for the PFA counseling application
//!
//! This library implements the login contract `POST /api/v1/auth/login`:
//! a username and password are exchanged for a signed bearer token that
//! later requests present as `Authorization: Bearer <token>`. Around it sit
//! account storage, token verification and revocation, per-address rate
//! limiting, and a small client for the same contract.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod api;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod server;
pub mod storage;

pub use api::{router, AppState};
pub use auth::AuthService;
pub use client::Client;
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use server::Server;
pub use storage::{Storage, User};
