use hana_api::{start_server, AppState};
use hana_models::Config;
use tokio::signal;
use tracing::{info, warn};

/// Builds the application from `config` and serves it until Ctrl-C or SIGTERM.
pub async fn run(config: Config) -> anyhow::Result<()> {
    info!("Starting Hana auth server");

    let bind = config.server.bind.clone();
    let port = config.server.port;
    let state = AppState::from_config(config).await?;
    info!("Hana auth server ready on {}:{}", bind, port);

    start_server(state, shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    info!("Hana auth server shutdown complete");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Unable to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Received shutdown signal");
}
