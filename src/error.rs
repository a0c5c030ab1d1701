//! Error handling module for the registry migrator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigratorError {
    /// Configuration could not be read, parsed or validated
    #[error("Configuration error: {0}")]
    Config(String),
    /// The engine rejected a request or reported an error in its progress stream
    #[error("Engine error: {0}")]
    Engine(String),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Encoding error: {0}")]
    Encoding(#[from] base64::DecodeError),
    /// The shared migration context was cancelled while the call was in flight
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<url::ParseError> for MigratorError {
    fn from(err: url::ParseError) -> Self {
        MigratorError::Config(format!("Invalid engine address: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, MigratorError>;
