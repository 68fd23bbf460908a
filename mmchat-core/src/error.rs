//! Error types for mmchat

use thiserror::Error;

/// The main error type for mmchat operations
#[derive(Error, Debug)]
pub enum Error {
    /// Session file (or other addressed resource) does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Session file exists but does not hold a valid message array
    #[error("Parse error in {key}: {message}")]
    Parse { key: String, message: String },

    /// Chain, transcription, image or PDF collaborator failure
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "not_found",
            Error::Parse { .. } => "parse",
            Error::Collaborator(_) => "collaborator",
            Error::Io(_) => "io",
            Error::Config(_) => "config",
            Error::Validation(_) => "validation",
        }
    }
}

/// A specialized Result type for mmchat operations
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_yaml::Error> for Error {
    fn from(e: serde_yaml::Error) -> Self {
        Error::Config(e.to_string())
    }
}
