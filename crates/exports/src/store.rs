use hana_models::{HanaError, StoredExport};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// The newest upload for a tool, as resolved through its `latest_<tool>.csv` pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestExport {
    pub tool: String,
    pub stored_as: String,
    pub path: PathBuf,
}

/// Stores uploaded CSV files as `<tool>_<uuid>.csv` and keeps a
/// `latest_<tool>.csv` pointer aimed at the newest one.
#[derive(Debug, Clone)]
pub struct ExportStore {
    dir: PathBuf,
    tools: BTreeSet<String>,
    max_upload_bytes: usize,
}

impl ExportStore {
    pub fn new<I, S>(dir: impl Into<PathBuf>, tools: I, max_upload_bytes: usize) -> Result<Self, HanaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| HanaError::Storage {
            reason: format!("cannot create data directory {}: {e}", dir.display()),
        })?;

        Ok(Self {
            dir,
            tools: tools.into_iter().map(Into::into).collect(),
            max_upload_bytes,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn tools(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(String::as_str)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn is_known_tool(&self, tool: &str) -> bool {
        self.tools.contains(tool)
    }

    /// Tool first, then file name; lets callers reject before reading a body.
    pub fn check_upload(&self, tool: &str, file_name: &str) -> Result<(), HanaError> {
        if !self.is_known_tool(tool) {
            return Err(HanaError::UnknownTool { tool: tool.to_string() });
        }
        if !is_csv_name(file_name) {
            return Err(HanaError::NotCsv);
        }
        Ok(())
    }

    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn store(&self, tool: &str, file_name: &str, bytes: &[u8]) -> Result<StoredExport, HanaError> {
        self.check_upload(tool, file_name)?;
        if bytes.len() > self.max_upload_bytes {
            return Err(HanaError::UploadTooLarge {
                size: bytes.len(),
                max: self.max_upload_bytes,
            });
        }

        let stored_as = format!("{tool}_{}.csv", Uuid::new_v4());
        let target = self.dir.join(&stored_as);
        tokio::fs::write(&target, bytes).await?;

        if let Err(e) = self.repoint_latest(tool, &stored_as).await {
            // the upload itself is kept; only the pointer is stale
            warn!("Failed to update latest pointer for {}: {}", tool, e);
            return Err(e);
        }

        info!("Stored {} upload as {} ({} bytes)", tool, stored_as, bytes.len());
        Ok(StoredExport {
            tool: tool.to_string(),
            stored_as,
            size: bytes.len() as u64,
        })
    }

    #[instrument(skip(self))]
    pub async fn latest(&self, tool: &str) -> Result<LatestExport, HanaError> {
        let no_export = || HanaError::NoExportYet { tool: tool.to_string() };
        if !self.is_known_tool(tool) {
            return Err(no_export());
        }

        let pointer = self.pointer_path(tool);
        // follows the pointer, so a dangling link counts as missing
        match tokio::fs::metadata(&pointer).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(no_export()),
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(no_export()),
            Err(e) => return Err(e.into()),
        }

        let stored_as = self.resolve_pointer(&pointer).await?;
        Ok(LatestExport {
            tool: tool.to_string(),
            path: self.dir.join(&stored_as),
            stored_as,
        })
    }

    pub async fn read_latest(&self, tool: &str) -> Result<(LatestExport, Vec<u8>), HanaError> {
        let latest = self.latest(tool).await?;
        let bytes = tokio::fs::read(&latest.path).await?;
        Ok((latest, bytes))
    }

    fn pointer_path(&self, tool: &str) -> PathBuf {
        self.dir.join(format!("latest_{tool}.csv"))
    }

    fn temp_pointer_path(&self, tool: &str) -> PathBuf {
        self.dir.join(format!(".latest_{tool}.{}.tmp", Uuid::new_v4()))
    }

    /// Builds the new pointer under a temporary name and renames it over the old one,
    /// so readers never observe a missing pointer.
    #[cfg(unix)]
    async fn repoint_latest(&self, tool: &str, stored_as: &str) -> Result<(), HanaError> {
        let tmp = self.temp_pointer_path(tool);
        tokio::fs::symlink(stored_as, &tmp).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.pointer_path(tool)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    async fn repoint_latest(&self, tool: &str, stored_as: &str) -> Result<(), HanaError> {
        let tmp = self.temp_pointer_path(tool);
        tokio::fs::copy(self.dir.join(stored_as), &tmp).await?;
        if let Err(e) = tokio::fs::rename(&tmp, self.pointer_path(tool)).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }

    #[cfg(unix)]
    async fn resolve_pointer(&self, pointer: &Path) -> Result<String, HanaError> {
        let target = tokio::fs::read_link(pointer).await?;
        target
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| HanaError::Storage {
                reason: format!("latest pointer {} has no file name", pointer.display()),
            })
    }

    #[cfg(not(unix))]
    async fn resolve_pointer(&self, pointer: &Path) -> Result<String, HanaError> {
        pointer
            .file_name()
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| HanaError::Storage {
                reason: format!("latest pointer {} has no file name", pointer.display()),
            })
    }
}

pub fn is_csv_name(file_name: &str) -> bool {
    let lower = file_name.to_ascii_lowercase();
    lower.len() > ".csv".len() && lower.ends_with(".csv")
}
