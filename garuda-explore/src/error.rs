//! Error types for the exploration engine.

use thiserror::Error;

/// Exploration engine error type.
#[derive(Error, Debug)]
pub enum ExploreError {
    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("bus publish failed: {0}")]
    Bus(String),
}

impl From<toml::de::Error> for ExploreError {
    fn from(e: toml::de::Error) -> Self {
        ExploreError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ExploreError>;
