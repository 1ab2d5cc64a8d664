//! Metrics engine configuration
//!
//! The collector document is built from typed sections and serialized with
//! `serde_yaml`. Component names carry the receiver type as their prefix,
//! e.g. `hostmetrics/<id>` or `windowsperfcounters/iis_<id>`.

use indexmap::IndexMap;
use opsagent_config::{
    CombinedConfig, CombinedReceiver, ExcludeMetrics, IntervalReceiver, METRIC_DOMAIN_PREFIX, MetricsConfig,
    MetricsProcessor, MetricsReceiver, PrometheusReceiver, SELF_OBSERVABILITY_ID, format_interval, parse_interval,
};
use serde::Serialize;

use crate::{RenderContext, RenderError};

/// File name of the collector configuration
pub const OTEL_CONFIG_FILE: &str = "otel.yaml";

/// Processor appended to every pipeline
const RESOURCE_DETECTION: &str = "resourcedetection";

/// Collector metrics scraped by the self-observability pipeline
const AGENT_METRICS: &[&str] = &[
    "otelcol_process_uptime",
    "otelcol_process_memory_rss",
    "otelcol_grpc_io_client_completed_rpcs",
    "otelcol_googlecloudmonitoring_point_count",
];

const HOSTMETRICS_SCRAPERS: &[&str] = &[
    "cpu",
    "load",
    "memory",
    "disk",
    "filesystem",
    "network",
    "paging",
    "process",
    "processes",
];

const IIS_COUNTERS: &[&str] = &[
    "Current Connections",
    "Total Bytes Received",
    "Total Bytes Sent",
    "Total Connection Attempts (all instances)",
    "Total Delete Requests",
    "Total Get Requests",
    "Total Head Requests",
    "Total Options Requests",
    "Total Post Requests",
    "Total Put Requests",
    "Total Trace Requests",
];

#[derive(Debug, Serialize)]
struct Collector {
    receivers: IndexMap<String, Receiver>,
    processors: IndexMap<String, Processor>,
    exporters: IndexMap<String, Exporter>,
    service: Service,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Receiver {
    Hostmetrics {
        collection_interval: String,
        scrapers: IndexMap<&'static str, Empty>,
    },
    PerfCounters {
        collection_interval: String,
        perfcounters: Vec<PerfCounter>,
    },
    Prometheus {
        config: ScrapeSettings,
    },
    Otlp {
        protocols: OtlpProtocols,
    },
}

#[derive(Debug, Serialize)]
struct Empty {}

#[derive(Debug, Serialize)]
struct PerfCounter {
    object: &'static str,
    instances: Vec<&'static str>,
    counters: Vec<&'static str>,
}

impl PerfCounter {
    fn total(object: &'static str, counters: &[&'static str]) -> Self {
        Self {
            object,
            instances: vec!["_Total"],
            counters: counters.to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ScrapeSettings {
    scrape_configs: Vec<ScrapeJob>,
}

#[derive(Debug, Serialize)]
struct ScrapeJob {
    job_name: String,
    scrape_interval: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    metrics_path: Option<String>,
    static_configs: Vec<StaticConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    basic_auth: Option<BasicAuth>,
}

#[derive(Debug, Serialize)]
struct StaticConfig {
    targets: Vec<String>,
}

/// Credentials as the collector needs them, in clear text
#[derive(Debug, Serialize)]
struct BasicAuth {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct OtlpProtocols {
    grpc: OtlpGrpc,
}

#[derive(Debug, Serialize)]
struct OtlpGrpc {
    endpoint: String,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Processor {
    ResourceDetection { detectors: Vec<&'static str> },
    Filter { metrics: FilterMetrics },
}

#[derive(Debug, Serialize)]
struct FilterMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    include: Option<MetricMatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exclude: Option<MetricMatch>,
}

#[derive(Debug, Serialize)]
struct MetricMatch {
    match_type: &'static str,
    metric_names: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Exporter {
    user_agent: String,
    metric: MetricSettings,
}

#[derive(Debug, Serialize)]
struct MetricSettings {
    prefix: &'static str,
}

#[derive(Debug, Serialize)]
struct Service {
    pipelines: IndexMap<String, Pipeline>,
    telemetry: Telemetry,
}

#[derive(Debug, Default, Serialize)]
struct Pipeline {
    receivers: Vec<String>,
    processors: Vec<String>,
    exporters: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Telemetry {
    logs: TelemetryLogs,
}

#[derive(Debug, Serialize)]
struct TelemetryLogs {
    level: String,
}

/// Render the collector YAML from the merged `metrics` and `combined` sections
///
/// Only components some pipeline references are emitted. Secret values
/// are written in clear text here, since the collector needs them.
///
/// # Errors
///
/// Returns an error when an interval does not parse or serialization fails
pub fn render(
    ctx: &RenderContext<'_>,
    metrics: Option<&MetricsConfig>,
    combined: Option<&CombinedConfig>,
) -> Result<String, RenderError> {
    let user_agent = ctx.user_agent("Metrics");
    let mut collector = Collector {
        receivers: IndexMap::new(),
        processors: IndexMap::new(),
        exporters: IndexMap::new(),
        service: Service {
            pipelines: IndexMap::new(),
            telemetry: Telemetry {
                logs: TelemetryLogs {
                    level: metrics
                        .and_then(|metrics| metrics.service.as_ref())
                        .and_then(|service| service.log_level)
                        .unwrap_or_default()
                        .to_string(),
                },
            },
        },
    };

    add_agent_pipeline(&mut collector, &user_agent);

    let pipelines = metrics
        .and_then(|metrics| metrics.service.as_ref())
        .into_iter()
        .flat_map(|service| service.pipelines.iter());

    for (name, pipeline) in pipelines {
        let mut rendered = Pipeline::default();

        for id in &pipeline.receivers {
            let combined_receiver = combined.and_then(|combined| combined.receivers.get(id));
            let (component, receiver) = match (metrics.and_then(|metrics| metrics.receivers.get(id)), combined_receiver) {
                (Some(receiver), _) => metrics_receiver(id, receiver)?,
                (None, Some(CombinedReceiver::Otlp(otlp))) => (
                    format!("otlp/{id}"),
                    Receiver::Otlp {
                        protocols: OtlpProtocols {
                            grpc: OtlpGrpc {
                                endpoint: otlp.grpc_endpoint.clone(),
                            },
                        },
                    },
                ),
                (None, None) => continue,
            };
            rendered.receivers.push(component.clone());
            collector.receivers.entry(component).or_insert(receiver);
        }

        for id in &pipeline.processors {
            let Some(MetricsProcessor::ExcludeMetrics(exclude)) =
                metrics.and_then(|metrics| metrics.processors.get(id))
            else {
                continue;
            };
            let Some(filter) = exclude_filter(exclude) else {
                continue;
            };
            let component = format!("filter/{id}");
            rendered.processors.push(component.clone());
            collector.processors.entry(component).or_insert(filter);
        }
        rendered.processors.push(RESOURCE_DETECTION.to_owned());

        for id in &pipeline.exporters {
            if !metrics.is_some_and(|metrics| metrics.exporters.contains(id)) {
                continue;
            }
            let component = format!("googlecloud/{id}");
            rendered.exporters.push(component.clone());
            collector
                .exporters
                .entry(component)
                .or_insert_with(|| google_cloud(&user_agent));
        }

        collector.service.pipelines.insert(format!("metrics/{name}"), rendered);
    }

    tracing::debug!(
        receivers = collector.receivers.len(),
        pipelines = collector.service.pipelines.len(),
        "rendered metrics collector configuration"
    );

    Ok(serde_yaml::to_string(&collector)?)
}

fn add_agent_pipeline(collector: &mut Collector, user_agent: &str) {
    let receiver = format!("prometheus/{SELF_OBSERVABILITY_ID}");
    let filter = format!("filter/{SELF_OBSERVABILITY_ID}");
    let exporter = format!("googlecloud/{SELF_OBSERVABILITY_ID}");

    collector.receivers.insert(
        receiver.clone(),
        Receiver::Prometheus {
            config: ScrapeSettings {
                scrape_configs: vec![ScrapeJob {
                    job_name: "otel-collector".to_owned(),
                    scrape_interval: "1m".to_owned(),
                    metrics_path: None,
                    static_configs: vec![StaticConfig {
                        targets: vec!["0.0.0.0:8888".to_owned()],
                    }],
                    basic_auth: None,
                }],
            },
        },
    );
    collector.processors.insert(
        RESOURCE_DETECTION.to_owned(),
        Processor::ResourceDetection { detectors: vec!["gce"] },
    );
    collector.processors.insert(
        filter.clone(),
        Processor::Filter {
            metrics: FilterMetrics {
                include: Some(MetricMatch {
                    match_type: "strict",
                    metric_names: AGENT_METRICS.iter().map(|name| (*name).to_owned()).collect(),
                }),
                exclude: None,
            },
        },
    );
    collector.exporters.insert(exporter.clone(), google_cloud(user_agent));

    collector.service.pipelines.insert(
        format!("metrics/{SELF_OBSERVABILITY_ID}"),
        Pipeline {
            receivers: vec![receiver],
            processors: vec![filter, RESOURCE_DETECTION.to_owned()],
            exporters: vec![exporter],
        },
    );
}

fn google_cloud(user_agent: &str) -> Exporter {
    Exporter {
        user_agent: user_agent.to_owned(),
        metric: MetricSettings {
            prefix: METRIC_DOMAIN_PREFIX,
        },
    }
}

fn interval(field: &'static str, value: &str) -> Result<String, RenderError> {
    parse_interval(value)
        .map(format_interval)
        .map_err(|reason| RenderError::InvalidField {
            plugin: "metrics receiver",
            field,
            reason,
        })
}

fn metrics_receiver(id: &str, receiver: &MetricsReceiver) -> Result<(String, Receiver), RenderError> {
    let perf_counters = |interval_receiver: &IntervalReceiver, counters: Vec<PerfCounter>| -> Result<Receiver, RenderError> {
        Ok(Receiver::PerfCounters {
            collection_interval: interval("collection_interval", &interval_receiver.collection_interval)?,
            perfcounters: counters,
        })
    };

    Ok(match receiver {
        MetricsReceiver::Hostmetrics(hostmetrics) => (
            format!("hostmetrics/{id}"),
            Receiver::Hostmetrics {
                collection_interval: interval("collection_interval", &hostmetrics.collection_interval)?,
                scrapers: HOSTMETRICS_SCRAPERS.iter().map(|scraper| (*scraper, Empty {})).collect(),
            },
        ),
        MetricsReceiver::Iis(iis) => (
            format!("windowsperfcounters/iis_{id}"),
            perf_counters(iis, vec![PerfCounter::total("Web Service", IIS_COUNTERS)])?,
        ),
        MetricsReceiver::Mssql(mssql) => (
            format!("windowsperfcounters/mssql_{id}"),
            perf_counters(
                mssql,
                vec![
                    PerfCounter::total("SQLServer:General Statistics", &["User Connections"]),
                    PerfCounter::total("SQLServer:Databases", &["Transactions/sec", "Write Transactions/sec"]),
                ],
            )?,
        ),
        MetricsReceiver::Prometheus(prometheus) => (format!("prometheus/{id}"), prometheus_receiver(prometheus)?),
    })
}

fn prometheus_receiver(prometheus: &PrometheusReceiver) -> Result<Receiver, RenderError> {
    let scrape_configs = prometheus
        .scrape_configs
        .iter()
        .map(|scrape| -> Result<ScrapeJob, RenderError> {
            Ok(ScrapeJob {
                job_name: scrape.job_name.clone(),
                scrape_interval: interval("scrape_interval", &scrape.scrape_interval)?,
                metrics_path: scrape.metrics_path.clone(),
                static_configs: vec![StaticConfig {
                    targets: scrape.targets.clone(),
                }],
                basic_auth: scrape.basic_auth.as_ref().map(|auth| BasicAuth {
                    username: auth.username.clone(),
                    password: auth.password.expose().to_owned(),
                }),
            })
        })
        .collect::<Result<_, _>>()?;

    Ok(Receiver::Prometheus {
        config: ScrapeSettings { scrape_configs },
    })
}

/// Filter dropping metrics by prefix; `None` when there is nothing to drop
fn exclude_filter(exclude: &ExcludeMetrics) -> Option<Processor> {
    let metric_names: Vec<String> = exclude
        .metrics_pattern
        .iter()
        .filter_map(|pattern| ExcludeMetrics::pattern_prefix(pattern))
        .map(|prefix| format!("^{}.*", regex::escape(prefix)))
        .collect();

    if metric_names.is_empty() {
        return None;
    }

    Some(Processor::Filter {
        metrics: FilterMetrics {
            include: None,
            exclude: Some(MetricMatch {
                match_type: "regexp",
                metric_names,
            }),
        },
    })
}
