//! HTTP server lifecycle.
//!
//! Opens storage, seeds the default accounts, binds the listener, and serves
//! the router until a shutdown signal arrives. A background task prunes
//! revocations of tokens that have expired anyway.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::api::{self, AppState};
use crate::auth::AuthService;
use crate::config::Config;
use crate::error::Result;
use crate::storage::{SqliteUserRepository, Storage, UserRepository};

/// A bound, ready-to-run API server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    router: Router,
    auth: Arc<AuthService>,
    prune_interval: Duration,
}

impl Server {
    /// Open the configured database and bind the listener.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is missing, the database
    /// cannot be opened, or the address cannot be bound.
    pub async fn bind(config: &Config) -> Result<Self> {
        // Fail on a missing secret before touching the filesystem
        config.jwt_secret()?;
        let storage = Storage::open(config.database_path())?;
        Self::with_storage(config, Arc::new(storage)).await
    }

    /// Bind the listener over an already opened storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the signing secret is missing, seeding fails, or
    /// the address cannot be bound.
    pub async fn with_storage(config: &Config, storage: Arc<Storage>) -> Result<Self> {
        let repo: Arc<dyn UserRepository> = Arc::new(SqliteUserRepository::new(storage));
        let auth = AuthService::from_config(config, repo)?;

        if config.auth.seed_default_users {
            auth.accounts().seed_defaults().await?;
        }

        let state = AppState::new(auth);
        let router = api::router(state.clone(), config)?;
        let listener = TcpListener::bind(config.listen_addr()?).await?;

        Ok(Self {
            listener,
            router,
            auth: state.auth,
            prune_interval: config.prune_interval(),
        })
    }

    /// The address actually bound, useful when the configured port is 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept loop fails.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let pruner = tokio::spawn(prune_revocations(self.auth, self.prune_interval));

        info!(
            local_addr = %self.listener.local_addr()?,
            prefix = api::API_PREFIX,
            "serving API"
        );
        let result = axum::serve(
            self.listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        pruner.abort();
        result?;
        info!("server stopped");
        Ok(())
    }
}

/// Bind using `config` and serve until Ctrl-C or SIGTERM.
///
/// # Errors
///
/// Returns an error if startup or the accept loop fails.
pub async fn serve(config: &Config) -> Result<()> {
    Server::bind(config).await?.run(shutdown_signal()).await
}

/// Resolve on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received Ctrl-C, shutting down"),
        () = terminate => info!("received SIGTERM, shutting down"),
    }
}

async fn prune_revocations(auth: Arc<AuthService>, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately
    ticker.tick().await;
    loop {
        ticker.tick().await;
        match auth.prune_revocations().await {
            Ok(pruned) => debug!(pruned, "revocation prune pass"),
            Err(e) => warn!(error = %e, "failed to prune revocations"),
        }
    }
}
