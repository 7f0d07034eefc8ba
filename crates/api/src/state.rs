use crate::release::ReleaseCatalog;
use hana_accounts::{open_pool, Authenticator, PasswordHasher, TokenService, UserRegistry};
use hana_exports::ExportStore;
use hana_metrics::MetricsService;
use hana_models::{Config, HanaError};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub auth: Authenticator,
    pub exports: Arc<ExportStore>,
    pub releases: Arc<ReleaseCatalog>,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(
        config: Config,
        registry: Arc<UserRegistry>,
        metrics: Arc<MetricsService>,
    ) -> Result<Self, HanaError> {
        let tokens = Arc::new(TokenService::new(
            &config.auth.jwt_secret,
            config.auth.token_ttl_secs,
        )?);
        let exports = Arc::new(ExportStore::new(
            &config.data.dir,
            config.exports.tools.iter().cloned(),
            config.max_upload_bytes(),
        )?);
        let releases = Arc::new(ReleaseCatalog::new(
            config.release_manifest_path(),
            config.fallback_release(),
        ));

        Ok(Self {
            auth: Authenticator::new(registry, tokens),
            exports,
            releases,
            metrics,
            config: Arc::new(config),
        })
    }

    /// Prepares the data directory and database, seeds the configured admin and
    /// wires the services the handlers share.
    pub async fn from_config(config: Config) -> Result<Self, HanaError> {
        tokio::fs::create_dir_all(&config.data.dir).await?;
        let readonly = tokio::fs::metadata(&config.data.dir)
            .await?
            .permissions()
            .readonly();
        info!(
            dir = %config.data.dir,
            db_url = %config.data.db_url,
            writable = !readonly,
            "Data directory ready"
        );

        let pool = open_pool(&config.data.db_url).await?;
        let hasher = PasswordHasher::new(config.auth.max_password_bytes);
        let registry = Arc::new(UserRegistry::new(pool, hasher).await?);

        if let Some(admin) = &config.auth.bootstrap_admin {
            if registry.ensure_admin(&admin.name, &admin.password).await? {
                info!("Bootstrap admin {} is ready", admin.name);
            }
        }
        if config.uses_placeholder_secret() {
            warn!("auth.jwt_secret is the placeholder value; set JWT_SECRET before exposing this server");
        }

        let metrics = Arc::new(MetricsService::new()?);
        Self::new(config, registry, metrics)
    }

    pub fn registry(&self) -> Arc<UserRegistry> {
        self.auth.registry()
    }
}
