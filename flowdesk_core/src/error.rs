// src/error.rs

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Transport failure talking to the backend.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The worker, connector or pipeline no longer exists server-side.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Backend rejected the request: {0}")]
    Rejected(String),

    #[error("Validation failed")]
    ValidationFailure,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Editor is not ready: {0}")]
    NotReady(String),

    #[error("Busy: {0}")]
    Busy(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Editor session closed")]
    Closed,
}

impl SyncError {
    pub fn code_str(&self) -> &'static str {
        match self {
            SyncError::Io(_) => "io_error",
            SyncError::SerdeJson(_) | SyncError::Toml(_) => "parse_error",
            SyncError::Network(_) => "network_error",
            SyncError::NotFound(_) => "not_found",
            SyncError::Rejected(_) => "rejected",
            SyncError::ValidationFailure => "validation_failed",
            SyncError::InvalidInput(_) => "invalid_input",
            SyncError::NotReady(_) => "not_ready",
            SyncError::Busy(_) => "busy",
            SyncError::Config(_) => "config_error",
            SyncError::Closed => "closed",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
