use serde::{Deserialize, Serialize};

use crate::declared::{Declaration, Declared, admit_plain};

/// `service` section of a domain
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Service {
    /// Log verbosity of the downstream engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    /// Pipelines keyed by name
    #[serde(default)]
    pub pipelines: Declared<Pipeline>,
}

/// Ordered wiring of receivers, processors and exporters
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Pipeline {
    /// Receiver references
    #[serde(default)]
    pub receivers: Vec<String>,
    /// Processor references, applied in this order
    #[serde(default)]
    pub processors: Vec<String>,
    /// Exporter references
    #[serde(default)]
    pub exporters: Vec<String>,
}

impl Pipeline {
    /// Build a pipeline from string slices
    pub fn new(receivers: &[&str], processors: &[&str], exporters: &[&str]) -> Self {
        let owned = |ids: &[&str]| ids.iter().map(|id| (*id).to_owned()).collect();
        Self {
            receivers: owned(receivers),
            processors: owned(processors),
            exporters: owned(exporters),
        }
    }
}

impl Declaration for Pipeline {
    const KIND: &'static str = "pipeline";

    fn admit(id: &str, raw: serde_yaml::Value) -> Result<Self, String> {
        admit_plain(Self::KIND, id, raw)
    }
}

/// Log verbosity shared by both engines
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}
