use std::io::ErrorKind;
use std::path::Path;

use crate::{DecodeError, UnifiedConfig};

impl UnifiedConfig {
    /// Decode a unified configuration from YAML text
    ///
    /// Decoding is strict: unknown keys and unknown component types are
    /// rejected. An empty document (or one holding only comments) decodes
    /// to an empty configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not YAML or does not match the schema
    pub fn from_yaml(input: &str) -> Result<Self, DecodeError> {
        if is_blank_document(input) {
            return Ok(Self::default());
        }

        let config: Option<Self> = serde_yaml::from_str(input)?;
        Ok(config.unwrap_or_default())
    }

    /// Read and decode a unified configuration file
    ///
    /// A missing file means the user overrides nothing and yields an empty
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, or decoding fails
    pub fn load(path: &Path) -> Result<Self, DecodeError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(config_path = %path.display(), "config file not found, using built-in defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(DecodeError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        tracing::debug!(config_path = %path.display(), bytes = raw.len(), "read unified config");

        Self::from_yaml(&raw)
    }
}

fn is_blank_document(input: &str) -> bool {
    input.lines().map(str::trim).all(|line| line.is_empty() || line.starts_with('#') || line == "---")
}
