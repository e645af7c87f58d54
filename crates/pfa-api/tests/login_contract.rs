//! End-to-end checks of the login contract over a real socket.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use pfa_api::{Client, Config, Error, Server};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<pfa_api::Result<()>>,
    data_dir: PathBuf,
}

impl TestServer {
    async fn start(name: &str) -> Self {
        let data_dir = std::env::temp_dir().join(format!(
            "pfa-api-contract-{name}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&data_dir);

        let mut config = Config::default();
        config.server.port = 0;
        config.auth.jwt_secret = Some("contract-test-secret-0123456789abcdef".to_string());
        config.auth.bcrypt_cost = 4;
        config.rate_limit.enabled = false;
        config.storage.database_path = Some(data_dir.join("users.db"));

        let server = Server::bind(&config).await.expect("server binds");
        let addr = server.local_addr().expect("local address");
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(server.run(async {
            let _ = rx.await;
        }));

        Self {
            addr,
            shutdown: Some(tx),
            handle,
            data_dir,
        }
    }

    fn client(&self) -> Client {
        Client::new(format!("http://{}/api/v1", self.addr)).expect("client builds")
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        tokio::time::timeout(Duration::from_secs(5), &mut self.handle)
            .await
            .expect("server stops in time")
            .expect("server task joins")
            .expect("server exits cleanly");
        let _ = std::fs::remove_dir_all(&self.data_dir);
    }
}

#[tokio::test]
async fn admin_login_returns_bearer_token() {
    let server = TestServer::start("admin").await;
    let client = server.client();

    let login = client.login("admin", "admin").await.unwrap();
    assert!(!login.token.is_empty());
    assert_eq!(login.token.split('.').count(), 3);
    assert_eq!(login.user.username, "admin");
    assert!(login.user.is_admin);

    let me = client.me(&login.token).await.unwrap();
    assert_eq!(me.username, "admin");

    let verified = client.verify(&login.token).await.unwrap();
    assert!(verified.valid);
    assert_eq!(verified.user_id, "admin");
    assert_eq!(verified.expires_at, login.expires_at);

    server.stop().await;
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let server = TestServer::start("wrong").await;

    let err = server.client().login("admin", "wrong").await.unwrap_err();
    match err {
        Error::Api { status, message } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid username or password");
        }
        other => panic!("unexpected error: {other}"),
    }

    server.stop().await;
}

#[tokio::test]
async fn logged_out_token_stops_working() {
    let server = TestServer::start("logout").await;
    let client = server.client();

    let login = client.login("user", "user").await.unwrap();
    client.logout(&login.token).await.unwrap();

    let err = client.me(&login.token).await.unwrap_err();
    assert!(matches!(err, Error::Api { status: 401, .. }));

    server.stop().await;
}

#[tokio::test]
async fn health_reports_version() {
    let server = TestServer::start("health").await;

    let health = server.client().health().await.unwrap();
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));

    server.stop().await;
}
