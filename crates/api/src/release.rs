use hana_models::{HanaError, ReleaseInfo, ReleaseManifest};
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::warn;

/// Serves the advertised desktop release. The manifest file is re-read on every
/// lookup so `hana-cli release` takes effect without a restart.
#[derive(Debug, Clone)]
pub struct ReleaseCatalog {
    manifest_path: PathBuf,
    fallback: ReleaseManifest,
}

impl ReleaseCatalog {
    pub fn new(manifest_path: impl Into<PathBuf>, fallback: ReleaseManifest) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            fallback,
        }
    }

    pub async fn current(&self) -> ReleaseInfo {
        match self.load_manifest().await {
            Ok(Some(manifest)) => manifest.to_release_info(),
            Ok(None) => self.fallback.to_release_info(),
            Err(e) => {
                warn!(
                    "Ignoring release manifest {}: {}",
                    self.manifest_path.display(),
                    e
                );
                self.fallback.to_release_info()
            }
        }
    }

    pub async fn load_manifest(&self) -> Result<Option<ReleaseManifest>, HanaError> {
        match tokio::fs::read_to_string(&self.manifest_path).await {
            Ok(raw) => ReleaseManifest::from_toml(&raw).map(Some),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fallback() -> ReleaseManifest {
        ReleaseManifest {
            version: "0.1.0".into(),
            download_url_template: "https://example.com/v{version}.zip".into(),
            release_date: "2025-01-01".into(),
            required: false,
            changelog: "initial".into(),
        }
    }

    #[tokio::test]
    async fn missing_manifest_uses_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = ReleaseCatalog::new(dir.path().join("release.toml"), fallback());
        let info = catalog.current().await;
        assert_eq!(info.version, "0.1.0");
        assert_eq!(info.download_url, "https://example.com/v0.1.0.zip");
    }

    #[tokio::test]
    async fn manifest_changes_are_picked_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");
        let catalog = ReleaseCatalog::new(&path, fallback());

        let mut next = fallback();
        next.version = "0.2.0".into();
        next.required = true;
        std::fs::write(&path, next.to_toml().unwrap()).unwrap();

        let info = catalog.current().await;
        assert_eq!(info.version, "0.2.0");
        assert!(info.required);
        assert_eq!(info.download_url, "https://example.com/v0.2.0.zip");
    }

    #[tokio::test]
    async fn broken_manifest_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("release.toml");
        std::fs::write(&path, "version = ").unwrap();
        let catalog = ReleaseCatalog::new(&path, fallback());
        assert_eq!(catalog.current().await.version, "0.1.0");
    }
}
