//! Error types for the quoter

use clmm_core::ClmmCoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuoterError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Math error: {0}")]
    Core(#[from] ClmmCoreError),
}

pub type QuoterResult<T> = Result<T, QuoterError>;

impl From<std::io::Error> for QuoterError {
    fn from(err: std::io::Error) -> Self {
        QuoterError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for QuoterError {
    fn from(err: serde_json::Error) -> Self {
        QuoterError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for QuoterError {
    fn from(err: toml::de::Error) -> Self {
        QuoterError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for QuoterError {
    fn from(err: toml::ser::Error) -> Self {
        QuoterError::Serialization(err.to_string())
    }
}
