use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::declared::{Declaration, Declared, admit_typed};
use crate::{Secret, Service};

/// Shortest accepted collection or scrape interval
pub const MIN_COLLECTION_INTERVAL: Duration = Duration::from_secs(10);

/// `metrics` section, rendered for the metrics-collection engine
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Metric sources keyed by identifier
    #[serde(default)]
    pub receivers: Declared<MetricsReceiver>,
    /// Transformations keyed by identifier
    #[serde(default)]
    pub processors: Declared<MetricsProcessor>,
    /// Sinks keyed by identifier
    #[serde(default)]
    pub exporters: Declared<MetricsExporter>,
    /// Pipelines and engine settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Service>,
}

/// Metric source declaration, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricsReceiver {
    /// Host CPU, memory, disk, network and process metrics
    Hostmetrics(IntervalReceiver),
    /// IIS performance counters
    Iis(IntervalReceiver),
    /// SQL Server performance counters
    Mssql(IntervalReceiver),
    /// Scrape Prometheus endpoints
    Prometheus(PrometheusReceiver),
}

impl MetricsReceiver {
    /// Discriminators accepted under `type`
    pub const TYPES: &'static [&'static str] = &["hostmetrics", "iis", "mssql", "prometheus"];

    /// Receiver types allowed at most once per pipeline
    pub const SINGLETON_TYPES: &'static [&'static str] = &["hostmetrics", "iis", "mssql"];

    /// Discriminator of this declaration
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Hostmetrics(_) => "hostmetrics",
            Self::Iis(_) => "iis",
            Self::Mssql(_) => "mssql",
            Self::Prometheus(_) => "prometheus",
        }
    }

    /// Whether the type only runs on Windows hosts
    pub const fn is_windows_only(&self) -> bool {
        matches!(self, Self::Iis(_) | Self::Mssql(_))
    }
}

impl Declaration for MetricsReceiver {
    const KIND: &'static str = "metrics receiver";

    fn admit(id: &str, raw: serde_yaml::Value) -> Result<Self, String> {
        admit_typed(Self::KIND, Self::TYPES, id, raw)
    }
}

fn default_interval() -> String {
    "60s".to_owned()
}

/// Receiver that polls on a fixed interval
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IntervalReceiver {
    /// Duration between collections (e.g. `60s`)
    #[serde(default = "default_interval")]
    pub collection_interval: String,
}

impl Default for IntervalReceiver {
    fn default() -> Self {
        Self {
            collection_interval: default_interval(),
        }
    }
}

/// `prometheus` receiver
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusReceiver {
    /// Scrape jobs
    #[serde(default)]
    pub scrape_configs: Vec<ScrapeConfig>,
}

/// One Prometheus scrape job
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ScrapeConfig {
    /// Job name, unique within the receiver
    #[serde(default)]
    pub job_name: String,
    /// Duration between scrapes
    #[serde(default = "default_interval")]
    pub scrape_interval: String,
    /// HTTP path of the metrics endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics_path: Option<String>,
    /// `host:port` endpoints to scrape
    #[serde(default)]
    pub targets: Vec<String>,
    /// Credentials sent with each scrape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basic_auth: Option<BasicAuth>,
}

/// HTTP basic authentication
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuth {
    pub username: String,
    pub password: Secret,
}

/// Metric transformation declaration, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricsProcessor {
    /// Drop metrics by name prefix
    ExcludeMetrics(ExcludeMetrics),
}

impl MetricsProcessor {
    /// Discriminators accepted under `type`
    pub const TYPES: &'static [&'static str] = &["exclude_metrics"];

    /// Discriminator of this declaration
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::ExcludeMetrics(_) => "exclude_metrics",
        }
    }
}

impl Declaration for MetricsProcessor {
    const KIND: &'static str = "metrics processor";

    fn admit(id: &str, raw: serde_yaml::Value) -> Result<Self, String> {
        admit_typed(Self::KIND, Self::TYPES, id, raw)
    }
}

/// Prefix every excluded metric pattern starts with
pub const METRIC_DOMAIN_PREFIX: &str = "agent.googleapis.com/";

/// `exclude_metrics` processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExcludeMetrics {
    /// Patterns such as `agent.googleapis.com/processes/*`
    #[serde(default)]
    pub metrics_pattern: Vec<String>,
}

impl ExcludeMetrics {
    /// Metric name prefix selected by a pattern, if well formed
    pub fn pattern_prefix(pattern: &str) -> Option<&str> {
        pattern.strip_prefix(METRIC_DOMAIN_PREFIX)?.strip_suffix('*')
    }
}

/// Metric sink declaration, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MetricsExporter {
    /// Ship metrics to Cloud Monitoring
    GoogleCloudMonitoring(GoogleCloudMonitoring),
}

impl MetricsExporter {
    /// Discriminators accepted under `type`
    pub const TYPES: &'static [&'static str] = &["google_cloud_monitoring"];

    /// Discriminator of this declaration
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::GoogleCloudMonitoring(_) => "google_cloud_monitoring",
        }
    }
}

impl Declaration for MetricsExporter {
    const KIND: &'static str = "metrics exporter";

    fn admit(id: &str, raw: serde_yaml::Value) -> Result<Self, String> {
        admit_typed(Self::KIND, Self::TYPES, id, raw)
    }
}

/// `google_cloud_monitoring` exporter
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GoogleCloudMonitoring {}

/// Parse an interval and enforce [`MIN_COLLECTION_INTERVAL`]
///
/// # Errors
///
/// Returns a message when the value is not a duration or is too short
pub fn parse_interval(value: &str) -> Result<Duration, String> {
    let duration = duration_str::parse(value).map_err(|e| format!("invalid duration {value:?}: {e}"))?;

    if duration < MIN_COLLECTION_INTERVAL {
        return Err(format!(
            "duration {value:?} is below the minimum of {}s",
            MIN_COLLECTION_INTERVAL.as_secs()
        ));
    }

    Ok(duration)
}

/// Format a duration the way the metrics engine expects it
pub fn format_interval(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
