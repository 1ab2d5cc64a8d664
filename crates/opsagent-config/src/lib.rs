//! Unified ops agent configuration
//!
//! Typed model of the user-facing YAML document, strict decoding, built-in
//! defaults, validation and the merge of user input over the defaults.

#![allow(clippy::must_use_candidate)]

pub mod builtin;
pub mod combined;
mod declared;
mod error;
mod loader;
pub mod logging;
pub mod merge;
pub mod metrics;
pub mod platform;
pub mod secret;
mod service;
pub mod validation;

use serde::{Deserialize, Serialize};

pub use builtin::*;
pub use combined::*;
pub use declared::{Declaration, Declared};
pub use error::DecodeError;
pub use logging::*;
pub use merge::{DefaultPipelineOverrides, Merged, merge};
pub use metrics::*;
pub use platform::{Os, PlatformFacts};
pub use secret::Secret;
pub use service::*;
pub use validation::{ConfigPath, ValidationError, ValidationErrors, Validator};

/// Reserved identifier prefix for built-in definitions
pub const RESERVED_PREFIX: &str = "lib:";

/// Metrics identifier owned by the collector's self-observability pipeline
pub const SELF_OBSERVABILITY_ID: &str = "agent";

/// Top-level unified configuration document
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UnifiedConfig {
    /// Log collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
    /// Metric collection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
    /// Receivers shared across signal types
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combined: Option<CombinedConfig>,
}

impl UnifiedConfig {
    /// Serialize the document back to YAML
    ///
    /// Secret values are written as the redaction placeholder.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails
    pub fn to_yaml(&self) -> Result<String, DecodeError> {
        Ok(serde_yaml::to_string(self)?)
    }
}
