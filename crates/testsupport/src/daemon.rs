use anyhow::{anyhow, Result};
use hana_api::{serve, AppState};
use hana_models::{BootstrapAdmin, Config};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const TEST_ADMIN: &str = "admin";
pub const TEST_ADMIN_PASSWORD: &str = "admin-pass";

type ServerHandle = JoinHandle<Result<(), Box<dyn std::error::Error + Send + Sync>>>;

/// A real server on an ephemeral port, backed by a throwaway data directory.
pub struct TestDaemon {
    pub base_url: String,
    pub data_dir: TempDir,
    pub state: AppState,
    shutdown: Option<oneshot::Sender<()>>,
    handle: ServerHandle,
}

impl TestDaemon {
    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle
            .await?
            .map_err(|e| anyhow!("server exited with error: {e}"))
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverride {
    pub require_auth: Option<bool>,
    pub max_upload_mb: Option<u64>,
    pub token_ttl_secs: Option<u64>,
}

pub async fn spawn_daemon(config_override: Option<ConfigOverride>) -> Result<TestDaemon> {
    let data_dir = tempfile::tempdir()?;
    let data_path = data_dir.path().to_string_lossy().to_string();

    let mut config = Config::default();
    if let Some(override_config) = config_override {
        if let Some(require_auth) = override_config.require_auth {
            config.exports.require_auth = require_auth;
        }
        if let Some(max_upload_mb) = override_config.max_upload_mb {
            config.exports.max_upload_mb = max_upload_mb;
        }
        if let Some(ttl) = override_config.token_ttl_secs {
            config.auth.token_ttl_secs = ttl;
        }
    }

    config.server.bind = "127.0.0.1".to_string();
    config.data.dir = data_path.clone();
    config.data.db_url = format!("sqlite://{data_path}/users.db");
    config.auth.jwt_secret = "testsupport-secret".to_string();
    config.auth.bootstrap_admin = Some(BootstrapAdmin {
        name: TEST_ADMIN.to_string(),
        password: TEST_ADMIN_PASSWORD.to_string(),
    });
    config.release.manifest_path = format!("{data_path}/release.toml");

    let state = AppState::from_config(config).await?;

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let base_url = format!("http://{}", listener.local_addr()?);

    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(serve(listener, state.clone(), async move {
        let _ = rx.await;
    }));

    Ok(TestDaemon {
        base_url,
        data_dir,
        state,
        shutdown: Some(tx),
        handle,
    })
}
