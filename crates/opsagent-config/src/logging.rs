pub mod expression;
pub mod processors;
pub mod receivers;

use serde::{Deserialize, Serialize};

pub use self::expression::{Comparison, ExcludeExpression, FieldPath};
pub use self::processors::*;
pub use self::receivers::*;
use crate::Service;
use crate::declared::{Declaration, Declared, admit_typed};

/// `logging` section, rendered for the log-shipping engine
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log sources keyed by identifier
    #[serde(default)]
    pub receivers: Declared<LoggingReceiver>,
    /// Transformations keyed by identifier
    #[serde(default)]
    pub processors: Declared<LoggingProcessor>,
    /// Sinks keyed by identifier
    #[serde(default)]
    pub exporters: Declared<LoggingExporter>,
    /// Pipelines and engine settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Service>,
}

/// Log sink declaration, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoggingExporter {
    /// Ship logs to Cloud Logging
    GoogleCloudLogging(GoogleCloudLogging),
}

impl LoggingExporter {
    /// Discriminators accepted under `type`
    pub const TYPES: &'static [&'static str] = &["google_cloud_logging"];

    /// Discriminator of this declaration
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::GoogleCloudLogging(_) => "google_cloud_logging",
        }
    }
}

impl Declaration for LoggingExporter {
    const KIND: &'static str = "logging exporter";

    fn admit(id: &str, raw: serde_yaml::Value) -> Result<Self, String> {
        admit_typed(Self::KIND, Self::TYPES, id, raw)
    }
}

/// `google_cloud_logging` exporter
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleCloudLogging {}
