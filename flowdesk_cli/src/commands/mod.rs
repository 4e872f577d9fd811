pub mod config;
pub mod edit;
pub mod lifecycle;
pub mod session;
pub mod show;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Changes to '{0}' were not saved; the backend rejected the update")]
    SaveFailed(String),

    #[error("Core library error: {0}")]
    Core(#[from] flowdesk_core::SyncError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, CommandError>;
