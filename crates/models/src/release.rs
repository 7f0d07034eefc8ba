use crate::error::HanaError;
use serde::{Deserialize, Serialize};

/// What `/version` advertises to desktop clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReleaseInfo {
    pub version: String,
    pub download_url: String,
    pub release_date: String,
    pub required: bool,
    pub changelog: String,
}

/// On-disk release manifest. The download URL is rendered from a template so
/// bumping the version never leaves a stale link behind.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReleaseManifest {
    pub version: String,
    pub download_url_template: String,
    pub release_date: String,
    #[serde(default)]
    pub required: bool,
    pub changelog: String,
}

impl ReleaseManifest {
    pub fn from_toml(raw: &str) -> Result<Self, HanaError> {
        toml::from_str(raw).map_err(|e| HanaError::Config {
            reason: format!("invalid release manifest: {e}"),
        })
    }

    pub fn to_toml(&self) -> Result<String, HanaError> {
        toml::to_string_pretty(self).map_err(|e| HanaError::Internal {
            reason: format!("cannot serialise release manifest: {e}"),
        })
    }

    pub fn download_url(&self) -> String {
        self.download_url_template.replace("{version}", &self.version)
    }

    pub fn to_release_info(&self) -> ReleaseInfo {
        ReleaseInfo {
            version: self.version.clone(),
            download_url: self.download_url(),
            release_date: self.release_date.clone(),
            required: self.required,
            changelog: self.changelog.clone(),
        }
    }
}

/// Release versions are dot-separated runs of ASCII digits, e.g. `1.0.1`.
pub fn is_valid_release_version(version: &str) -> bool {
    !version.is_empty()
        && version
            .split('.')
            .all(|part| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()))
}
