use opsagent_config::{DecodeError, ValidationErrors};
use thiserror::Error;

/// Failure while rendering one engine configuration
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("{plugin:?} plugin should not have empty field: {field:?}")]
    EmptyField { plugin: &'static str, field: String },

    #[error("got invalid value {value:?} for {plugin:?} plugin's field {field:?}, should be one of [{}]", .allowed.join(", "))]
    InvalidValue {
        plugin: &'static str,
        field: &'static str,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("{plugin:?} plugin's field {field:?} must be a positive number, got {value}")]
    NonPositive {
        plugin: &'static str,
        field: &'static str,
        value: u32,
    },

    #[error("{plugin:?} plugin's field {field:?} must be an IP address, got {value:?}")]
    InvalidIp {
        plugin: &'static str,
        field: &'static str,
        value: String,
    },

    #[error("{plugin:?} plugin's field {field:?} is invalid: {reason}")]
    InvalidField {
        plugin: &'static str,
        field: &'static str,
        reason: String,
    },

    #[error("template of {plugin:?} plugin references unbound field {field:?}")]
    UnknownField { plugin: &'static str, field: String },

    #[error("failed to serialize metrics configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Failure of a whole generation run; no file is produced
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("the agent config is not valid:\n{0}")]
    Validation(#[from] ValidationErrors),

    #[error("failed to generate configuration: {0}")]
    Render(#[from] RenderError),
}

