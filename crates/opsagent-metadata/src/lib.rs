//! Integration metadata documents
//!
//! Each third-party integration ships a `metadata.yaml` describing how it is
//! configured and which metrics and log entries it is expected to produce.
//! Documents are decoded strictly and then checked by [`IntegrationMetadata::validate`],
//! which reports every problem at once.

#![allow(clippy::must_use_candidate)]

mod error;
mod validate;

use opsagent_config::Declared;
use serde::Deserialize;

pub use error::{MetadataError, MetadataErrorKind, MetadataErrors};

/// Value type of an expected metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::VariantNames)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ValueType {
    Bool,
    Int64,
    Double,
    String,
    Distribution,
}

/// Kind of an expected metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::VariantNames)]
#[strum(serialize_all = "UPPERCASE")]
pub enum MetricKind {
    Gauge,
    Delta,
    Cumulative,
}

/// Platform a metric is exclusive to
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum MetricPlatform {
    Linux,
    Windows,
}

/// Type of a field inside an expected log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::VariantNames)]
#[strum(serialize_all = "lowercase")]
pub enum LogFieldType {
    String,
    Number,
    Boolean,
    Object,
}

/// Monitored resources expected metrics may be written against
pub const MONITORED_RESOURCES: &[&str] = &["gce_instance"];

/// One metric the integration is expected to write
///
/// Enumerated fields stay as text so that an unknown value is reported by
/// validation together with every other problem.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedMetric {
    /// Full metric type, e.g. `workload.googleapis.com/apache.current_connections`
    #[serde(rename = "type", default)]
    pub metric_type: String,
    #[serde(default)]
    pub value_type: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub monitored_resource: String,
    /// Label key to value pattern
    #[serde(default)]
    pub labels: Declared<String>,
    /// Skipped by checks that assert presence
    #[serde(default)]
    pub optional: bool,
    /// Used to tell whether the integration is enabled at all
    #[serde(default)]
    pub representative: bool,
    #[serde(default)]
    pub platform: Option<String>,
}

impl ExpectedMetric {
    /// Parsed value type, if it is a known one
    pub fn value_type(&self) -> Option<ValueType> {
        self.value_type.parse().ok()
    }

    /// Parsed kind, if it is a known one
    pub fn kind(&self) -> Option<MetricKind> {
        self.kind.parse().ok()
    }

    /// Parsed platform restriction, if present and known
    pub fn platform(&self) -> Option<MetricPlatform> {
        self.platform.as_deref().and_then(|p| p.parse().ok())
    }
}

/// One field of an expected log entry
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogField {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value_regex: Option<String>,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub optional: bool,
}

/// A log entry the integration is expected to write
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedLog {
    #[serde(default)]
    pub log_name: String,
    #[serde(default)]
    pub fields: Vec<LogField>,
}

/// One configuration field a receiver or processor accepts
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationField {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub description: String,
}

/// A component type and the fields it accepts
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfiguration {
    #[serde(rename = "type", default)]
    pub component_type: String,
    #[serde(default)]
    pub fields: Vec<ConfigurationField>,
}

/// Component types the integration documents, per domain
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationOptions {
    #[serde(default)]
    pub logs: Vec<InputConfiguration>,
    #[serde(default)]
    pub metrics: Vec<InputConfiguration>,
}

/// Oldest agent versions the integration works with
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MinimumAgentVersion {
    pub logging: Option<String>,
    pub metrics: Option<String>,
}

/// Metadata of one third-party integration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationMetadata {
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub app_url: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub logo_path: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub configuration_options: Option<ConfigurationOptions>,
    #[serde(default)]
    pub configure_integration: Option<String>,
    #[serde(default)]
    pub expected_logs: Vec<ExpectedLog>,
    #[serde(default)]
    pub expected_metrics: Vec<ExpectedMetric>,
    #[serde(default)]
    pub minimum_supported_agent_version: MinimumAgentVersion,
    #[serde(default)]
    pub supported_app_version: Vec<String>,
    #[serde(default)]
    pub restart_after_install: bool,
    #[serde(default)]
    pub troubleshoot: Option<String>,
}

impl IntegrationMetadata {
    /// Decode a metadata document, rejecting unknown keys
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not YAML or does not match the schema
    pub fn from_yaml(input: &str) -> Result<Self, MetadataError> {
        serde_yaml::from_str(input).map_err(MetadataError::decode)
    }
}

/// Metrics-only document describing what the agent reports about itself
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedMetricsContainer {
    #[serde(default)]
    pub expected_metrics: Vec<ExpectedMetric>,
}

impl ExpectedMetricsContainer {
    /// Decode a metrics-only document, rejecting unknown keys
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not YAML or does not match the schema
    pub fn from_yaml(input: &str) -> Result<Self, MetadataError> {
        serde_yaml::from_str(input).map_err(MetadataError::decode)
    }
}
