use hana_models::{LogFormat, Role, StoredExport, User};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

pub struct TracingService;

impl TracingService {
    /// `RUST_LOG` wins when set; otherwise `info`.
    pub fn init(format: LogFormat) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        match format {
            LogFormat::Plain => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .try_init(),
        }
    }

    pub fn log_user_created(user: &User, created_by: &str) {
        info!(
            user = %user.name,
            user_id = %user.id,
            role = %user.role,
            created_by = %created_by,
            "User created"
        );
    }

    pub fn log_user_promoted(user: &str, promoted_by: &str) {
        info!(
            user = %user,
            role = %Role::Admin,
            promoted_by = %promoted_by,
            "User promoted"
        );
    }

    pub fn log_user_deleted(user: &str, deleted_by: &str) {
        info!(
            user = %user,
            deleted_by = %deleted_by,
            "User deleted"
        );
    }

    pub fn log_login_rejected(user: &str) {
        warn!(
            user = %user,
            "Login rejected"
        );
    }

    pub fn log_export_stored(export: &StoredExport) {
        info!(
            tool = %export.tool,
            stored_as = %export.stored_as,
            size = export.size,
            "CSV export stored"
        );
    }
}
