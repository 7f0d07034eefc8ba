use crate::error::HanaError;
use crate::release::ReleaseManifest;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Searched in order when no explicit config file is given.
pub const DEFAULT_CONFIG_PATHS: &[&str] = &["configs/default.toml", "config/config.toml"];

/// Placeholder secret shipped in the defaults; the server warns when it is still in use.
pub const PLACEHOLDER_JWT_SECRET: &str = "CHANGE_ME";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub auth: AuthConfig,
    pub exports: ExportsConfig,
    pub release: ReleaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub max_request_body_size_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub dir: String,
    pub db_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub max_password_bytes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BootstrapAdmin {
    pub name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ExportsConfig {
    pub tools: Vec<String>,
    pub require_auth: bool,
    pub max_upload_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReleaseConfig {
    pub version: String,
    pub download_url_template: String,
    pub release_date: String,
    pub required: bool,
    pub changelog: String,
    pub manifest_path: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: "0.0.0.0".to_string(),
                port: 8080,
                max_request_body_size_mb: 50,
            },
            data: DataConfig {
                dir: "/data".to_string(),
                db_url: "sqlite:///data/users.db".to_string(),
            },
            auth: AuthConfig {
                jwt_secret: PLACEHOLDER_JWT_SECRET.to_string(),
                token_ttl_secs: 8 * 60 * 60,
                max_password_bytes: 72,
                bootstrap_admin: None,
            },
            exports: ExportsConfig {
                tools: ["wholefoods", "safeway", "harristeeter", "giantscale"]
                    .iter()
                    .map(|t| t.to_string())
                    .collect(),
                require_auth: false,
                max_upload_mb: 25,
            },
            release: ReleaseConfig {
                version: "0.1.65".to_string(),
                download_url_template:
                    "https://github.com/seyaul/Scrapling/releases/download/v{version}/HanaTool-{version}.zip"
                        .to_string(),
                release_date: "2025-11-13".to_string(),
                required: false,
                changelog: "Update: Price History Management v1".to_string(),
                manifest_path: "release.toml".to_string(),
            },
            logging: LoggingConfig {
                format: LogFormat::Plain,
            },
        }
    }
}

impl Config {
    /// Layers defaults, a TOML file, `HANA_*` environment variables
    /// (`__` separates sections) and finally `JWT_SECRET`.
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));

        let file = match path {
            Some(path) => Some(path.to_path_buf()),
            None => DEFAULT_CONFIG_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.exists()),
        };
        if let Some(file) = file {
            figment = figment.merge(Toml::file(file));
        }

        figment
            .merge(Env::prefixed("HANA_").split("__"))
            .merge(
                Env::raw()
                    .only(&["JWT_SECRET"])
                    .map(|_| "auth.jwt_secret".into()),
            )
    }

    pub fn load(path: Option<&Path>) -> Result<Self, HanaError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(HanaError::Config {
                    reason: format!("config file not found: {}", path.display()),
                });
            }
        }

        let config: Config = Self::figment(path)
            .extract()
            .map_err(|e| HanaError::Config { reason: e.to_string() })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), HanaError> {
        if self.auth.jwt_secret.is_empty() {
            return Err(HanaError::Config {
                reason: "auth.jwt_secret must not be empty".to_string(),
            });
        }
        if self.auth.token_ttl_secs == 0 {
            return Err(HanaError::Config {
                reason: "auth.token_ttl_secs must be greater than zero".to_string(),
            });
        }
        if self.exports.tools.is_empty() {
            return Err(HanaError::Config {
                reason: "exports.tools must list at least one tool".to_string(),
            });
        }
        if let Some(admin) = &self.auth.bootstrap_admin {
            if admin.name.trim().is_empty() || admin.password.is_empty() {
                return Err(HanaError::Config {
                    reason: "auth.bootstrap_admin needs a name and a password".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn uses_placeholder_secret(&self) -> bool {
        self.auth.jwt_secret == PLACEHOLDER_JWT_SECRET
    }

    pub fn max_request_body_bytes(&self) -> usize {
        (self.server.max_request_body_size_mb * 1024 * 1024) as usize
    }

    pub fn max_upload_bytes(&self) -> usize {
        (self.exports.max_upload_mb * 1024 * 1024) as usize
    }

    /// Relative manifest paths resolve against the working directory.
    pub fn release_manifest_path(&self) -> PathBuf {
        PathBuf::from(&self.release.manifest_path)
    }

    /// Release advertised when no manifest file is present.
    pub fn fallback_release(&self) -> ReleaseManifest {
        ReleaseManifest {
            version: self.release.version.clone(),
            download_url_template: self.release.download_url_template.clone(),
            release_date: self.release.release_date.clone(),
            required: self.release.required,
            changelog: self.release.changelog.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_the_deployment_contract() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.auth.token_ttl_secs, 28_800);
        assert_eq!(config.auth.max_password_bytes, 72);
        assert_eq!(config.exports.tools.len(), 4);
        assert!(config.uses_placeholder_secret());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_secret_and_tools() {
        let mut config = Config::default();
        config.auth.jwt_secret.clear();
        assert!(matches!(config.validate(), Err(HanaError::Config { .. })));

        let mut config = Config::default();
        config.exports.tools.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.auth.token_ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn file_and_env_layers_override_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "hana.toml",
                r#"
                [server]
                port = 9000

                [exports]
                tools = ["safeway"]
                "#,
            )?;
            jail.set_env("HANA_DATA__DIR", "/tmp/hana");
            jail.set_env("JWT_SECRET", "reallyrandom");

            let config = Config::load(Some(Path::new("hana.toml"))).expect("config loads");
            assert_eq!(config.server.port, 9000);
            assert_eq!(config.server.bind, "0.0.0.0");
            assert_eq!(config.exports.tools, vec!["safeway".to_string()]);
            assert_eq!(config.data.dir, "/tmp/hana");
            assert_eq!(config.auth.jwt_secret, "reallyrandom");
            Ok(())
        });
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let err = Config::load(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(err, HanaError::Config { .. }));
    }
}
