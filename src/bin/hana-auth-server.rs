use anyhow::Result;
use clap::Parser;
use hana_metrics::TracingService;
use hana_models::Config;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "hana-auth-server")]
#[command(about = "Accounts, release info and CSV exchange for the Hana tool")]
#[command(version)]
struct Args {
    /// TOML config file; defaults to configs/default.toml when present
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;

    TracingService::init(config.logging.format)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    info!(
        "Configuration loaded: bind={}:{} data_dir={} tools={:?}",
        config.server.bind, config.server.port, config.data.dir, config.exports.tools
    );

    hana_auth::run(config).await
}
