//! Decode error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning input text into a [`crate::UnifiedConfig`]
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The input file could not be read
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input is not valid YAML or does not match the schema
    #[error("the agent config is not valid: {0}")]
    Invalid(String),
}

impl From<serde_yaml::Error> for DecodeError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::Invalid(error.to_string())
    }
}
