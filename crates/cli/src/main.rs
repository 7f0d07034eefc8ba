mod release;
mod users;

use clap::{Parser, Subcommand};
use hana_models::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hana-cli")]
#[command(about = "Release and user administration for Hana auth")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Server config file used for defaults (manifest path, database URL)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Advertise a new desktop release and optionally deploy it
    Release {
        /// Version in X.Y.Z form
        version: String,
        /// Changelog shown to users
        changelog: String,
        /// Release manifest to rewrite
        #[arg(long)]
        manifest: Option<PathBuf>,
        /// Commit, push and run `fly deploy` afterwards
        #[arg(long)]
        deploy: bool,
        /// Base URL whose /version is checked after deploying
        #[arg(long)]
        verify_url: Option<String>,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Manage accounts directly in the database
    #[command(subcommand)]
    User(UserCommand),
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create an account
    Add {
        name: String,
        password: String,
        /// Create the account with the admin role
        #[arg(long)]
        admin: bool,
        #[arg(long)]
        db: Option<String>,
    },
    /// Give an account the admin role
    Promote {
        name: String,
        #[arg(long)]
        db: Option<String>,
    },
    /// Remove an account
    Delete {
        name: String,
        #[arg(long)]
        db: Option<String>,
    },
    /// List accounts
    List {
        #[arg(long)]
        db: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Release {
            version,
            changelog,
            manifest,
            deploy,
            verify_url,
            yes,
        } => {
            let manifest_path = manifest.unwrap_or_else(|| config.release_manifest_path());
            release::run(
                &config,
                release::ReleaseParams {
                    version,
                    changelog,
                    manifest_path,
                    deploy,
                    verify_url,
                    assume_yes: yes,
                },
            )
            .await?;
        }
        Commands::User(command) => {
            let max_password_bytes = config.auth.max_password_bytes;
            let db_for = |db: Option<String>| db.unwrap_or_else(|| config.data.db_url.clone());
            match command {
                UserCommand::Add {
                    name,
                    password,
                    admin,
                    db,
                } => {
                    let registry = users::open(&db_for(db), max_password_bytes).await?;
                    users::add(&registry, &name, &password, admin).await?;
                }
                UserCommand::Promote { name, db } => {
                    let registry = users::open(&db_for(db), max_password_bytes).await?;
                    users::promote(&registry, &name).await?;
                }
                UserCommand::Delete { name, db } => {
                    let registry = users::open(&db_for(db), max_password_bytes).await?;
                    users::delete(&registry, &name).await?;
                }
                UserCommand::List { db } => {
                    let registry = users::open(&db_for(db), max_password_bytes).await?;
                    for line in users::list(&registry).await? {
                        println!("{line}");
                    }
                }
            }
        }
    }

    Ok(())
}
