use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredExport {
    pub tool: String,
    pub stored_as: String,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadResponse {
    pub ok: bool,
    pub stored_as: String,
}

impl From<StoredExport> for UploadResponse {
    fn from(export: StoredExport) -> Self {
        Self {
            ok: true,
            stored_as: export.stored_as,
        }
    }
}
