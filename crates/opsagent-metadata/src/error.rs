use std::fmt;

use opsagent_config::ConfigPath;
use thiserror::Error;

/// What is wrong with a metadata document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataErrorKind {
    #[error("{0}")]
    Decode(String),

    #[error("{field:?} is a required field")]
    MissingField { field: &'static str },

    #[error("{field:?} must be one of [{}], got {value:?}", .allowed.join(" "))]
    InvalidValue {
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("exactly one expected metric must be representative, found {count}")]
    RepresentativeCount { count: usize },

    #[error("a representative metric cannot also set {field:?}")]
    RepresentativeConflict { field: &'static str },

    #[error("metric type {metric_type:?} is listed more than once")]
    DuplicateMetric { metric_type: String },

    #[error("label {label:?} is declared more than once")]
    DuplicateLabel { label: String },

    #[error("{field:?} is not a valid regular expression: {reason}")]
    InvalidRegex { field: String, reason: String },

    #[error("{field:?} must not contain curly quotes")]
    CurlyQuotes { field: &'static str },

    #[error("{field:?} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("version {version:?} is listed more than once")]
    DuplicateVersion { version: String },

    #[error("at least one of \"logs\" or \"metrics\" must be configured")]
    NoConfigurationOptions,
}

/// A problem located in a metadata document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {kind}")]
pub struct MetadataError {
    pub path: ConfigPath,
    pub kind: MetadataErrorKind,
}

impl MetadataError {
    pub(crate) fn new(path: ConfigPath, kind: MetadataErrorKind) -> Self {
        Self { path, kind }
    }

    pub(crate) fn decode(error: serde_yaml::Error) -> Self {
        Self::new(ConfigPath::root("metadata"), MetadataErrorKind::Decode(error.to_string()))
    }
}

/// Every problem found in one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct MetadataErrors(Vec<MetadataError>);

impl MetadataErrors {
    pub(crate) fn push(&mut self, path: &ConfigPath, kind: MetadataErrorKind) {
        self.0.push(MetadataError::new(path.clone(), kind));
    }

    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn errors(&self) -> &[MetadataError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn into_result(self) -> Result<(), Self> {
        if self.has_errors() { Err(self) } else { Ok(()) }
    }
}

impl fmt::Display for MetadataErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}
