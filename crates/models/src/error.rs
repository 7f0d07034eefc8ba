use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body of every error response: `{"detail": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ErrorShape {
    pub detail: String,
}

#[derive(Error, Debug)]
pub enum HanaError {
    #[error("Bad creds")]
    InvalidCredentials,

    #[error("Not authenticated")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("User no longer exists")]
    UserGone,

    #[error("Admin only")]
    AdminOnly,

    #[error("Password too long (max {max} bytes)")]
    PasswordTooLong { max: usize },

    #[error("Invalid user name: {name}")]
    InvalidUserName { name: String },

    #[error("User already exists")]
    UserAlreadyExists { name: String },

    #[error("User not found: {name}")]
    UserNotFound { name: String },

    #[error("unknown tool")]
    UnknownTool { tool: String },

    #[error("CSV only")]
    NotCsv,

    #[error("No file field in upload")]
    MissingUpload,

    #[error("Upload too large: {size} bytes (max: {max} bytes)")]
    UploadTooLarge { size: usize, max: usize },

    #[error("Upload too large")]
    RequestTooLarge,

    #[error("No file yet for this tool")]
    NoExportYet { tool: String },

    #[error("{reason}")]
    InvalidRequest { reason: String },

    #[error("Storage error: {reason}")]
    Storage { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Password hashing failed: {reason}")]
    PasswordHash { reason: String },

    #[error("Failed to issue token: {reason}")]
    TokenIssue { reason: String },

    #[error("Configuration error: {reason}")]
    Config { reason: String },

    #[error("Internal server error: {reason}")]
    Internal { reason: String },
}

pub type Result<T, E = HanaError> = std::result::Result<T, E>;

impl HanaError {
    pub fn to_error_shape(&self) -> ErrorShape {
        ErrorShape {
            detail: self.to_string(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            HanaError::InvalidCredentials => 401,
            HanaError::MissingToken => 401,
            HanaError::InvalidToken => 401,
            HanaError::UserGone => 401,
            HanaError::AdminOnly => 403,
            HanaError::PasswordTooLong { .. } => 400,
            HanaError::InvalidUserName { .. } => 400,
            HanaError::UserAlreadyExists { .. } => 409,
            HanaError::UserNotFound { .. } => 404,
            HanaError::UnknownTool { .. } => 400,
            HanaError::NotCsv => 400,
            HanaError::MissingUpload => 400,
            HanaError::UploadTooLarge { .. } => 413,
            HanaError::RequestTooLarge => 413,
            HanaError::NoExportYet { .. } => 404,
            HanaError::InvalidRequest { .. } => 400,
            HanaError::Storage { .. } => 500,
            HanaError::Io(_) => 500,
            HanaError::Sqlx(_) => 500,
            HanaError::PasswordHash { .. } => 500,
            HanaError::TokenIssue { .. } => 500,
            HanaError::Config { .. } => 500,
            HanaError::Internal { .. } => 500,
        }
    }

    /// Server-side failures whose details should not reach the client.
    pub fn is_internal(&self) -> bool {
        self.http_status() >= 500
    }
}
