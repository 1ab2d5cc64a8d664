//! Built-in defaults merged underneath user configuration

use crate::{
    Declared, ExcludeMetrics, FilesReceiver, GoogleCloudLogging, GoogleCloudMonitoring, IntervalReceiver, LogLevel,
    LoggingConfig, LoggingExporter, LoggingReceiver, MetricsConfig, MetricsExporter, MetricsProcessor, MetricsReceiver,
    Pipeline, PlatformFacts, Service, UnifiedConfig, WindowsEventLogReceiver,
};

/// Name of the pipeline every built-in domain declares
pub const DEFAULT_PIPELINE: &str = "default_pipeline";

/// Parser that keeps the whole line under `message`
pub const DEFAULT_MESSAGE_PARSER: &str = "lib:default_message_parser";

/// Parser definition shipped with the agent under the reserved prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryParser {
    pub name: &'static str,
    pub regex: &'static str,
    pub time_key: Option<&'static str>,
    pub time_format: Option<&'static str>,
}

impl LibraryParser {
    /// Whether pipelines may reference this parser as a processor
    pub fn is_processor(&self) -> bool {
        self.name != DEFAULT_MESSAGE_PARSER
    }
}

/// Parsers available to every generated log-shipping configuration
pub const LIBRARY_PARSERS: &[LibraryParser] = &[
    LibraryParser {
        name: DEFAULT_MESSAGE_PARSER,
        regex: r"^(?<message>.*)$",
        time_key: None,
        time_format: None,
    },
    LibraryParser {
        name: "lib:apache",
        regex: r#"^(?<host>[^ ]*) [^ ]* (?<user>[^ ]*) \[(?<time>[^\]]*)\] "(?<method>\S+)(?: +(?<path>[^\"]*?)(?: +\S*)?)?" (?<code>[^ ]*) (?<size>[^ ]*)(?: "(?<referer>[^\"]*)" "(?<agent>[^\"]*)")?$"#,
        time_key: Some("time"),
        time_format: Some("%d/%b/%Y:%H:%M:%S %z"),
    },
    LibraryParser {
        name: "lib:apache2",
        regex: r#"^(?<host>[^ ]*) [^ ]* (?<user>[^ ]*) \[(?<time>[^\]]*)\] "(?<method>\S+)(?: +(?<path>[^ ]*) +\S*)?" (?<code>[^ ]*) (?<size>[^ ]*)(?: "(?<referer>[^\"]*)" "(?<agent>.*)")?$"#,
        time_key: Some("time"),
        time_format: Some("%d/%b/%Y:%H:%M:%S %z"),
    },
    LibraryParser {
        name: "lib:apache_error",
        regex: r"^\[[^ ]* (?<time>[^\]]*)\] \[(?<level>[^\]]*)\](?: \[pid (?<pid>[^\]]*)\])?( \[client (?<client>[^\]]*)\])? (?<message>.*)$",
        time_key: None,
        time_format: None,
    },
    LibraryParser {
        name: "lib:mongodb",
        regex: r"^(?<time>[^ ]*)\s+(?<severity>\w)\s+(?<component>[^ ]+)\s+\[(?<context>[^\]]+)]\s+(?<message>.*?) *(?<ms>(\d+))?(:?ms)?$",
        time_key: Some("time"),
        time_format: Some("%Y-%m-%dT%H:%M:%S.%L"),
    },
    LibraryParser {
        name: "lib:nginx",
        regex: r#"^(?<remote>[^ ]*) (?<host>[^ ]*) (?<user>[^ ]*) \[(?<time>[^\]]*)\] "(?<method>\S+)(?: +(?<path>[^\"]*?)(?: +\S*)?)?" (?<code>[^ ]*) (?<size>[^ ]*)(?: "(?<referer>[^\"]*)" "(?<agent>[^\"]*)")"#,
        time_key: Some("time"),
        time_format: Some("%d/%b/%Y:%H:%M:%S %z"),
    },
    LibraryParser {
        name: "lib:syslog-rfc5424",
        regex: r"^\<(?<pri>[0-9]{1,5})\>1 (?<time>[^ ]+) (?<host>[^ ]+) (?<ident>[^ ]+) (?<pid>[-0-9]+) (?<msgid>[^ ]+) (?<extradata>(\[(.*?)\]|-)) (?<message>.+)$",
        time_key: Some("time"),
        time_format: Some("%Y-%m-%dT%H:%M:%S.%L%Z"),
    },
    LibraryParser {
        name: "lib:syslog-rfc3164",
        regex: r"/^\<(?<pri>[0-9]+)\>(?<time>[^ ]* {1,2}[^ ]* [^ ]*) (?<host>[^ ]*) (?<ident>[a-zA-Z0-9_\/\.\-]*)(?:\[(?<pid>[0-9]+)\])?(?:[^\:]*\:)? *(?<message>.*)$/",
        time_key: Some("time"),
        time_format: Some("%b %d %H:%M:%S"),
    },
];

/// Built-in configuration and parser library for one platform
///
/// Passed explicitly to the merger and renderers; nothing here is global
/// mutable state, so tests can substitute their own defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltinConfig {
    /// Default receivers, processors, exporters and pipelines
    pub config: UnifiedConfig,
    /// Parsers addressable under the reserved prefix
    pub library: Vec<LibraryParser>,
}

impl BuiltinConfig {
    /// Defaults for the given platform
    pub fn for_platform(platform: &PlatformFacts) -> Self {
        Self {
            config: UnifiedConfig {
                logging: Some(builtin_logging(platform)),
                metrics: Some(builtin_metrics(platform)),
                combined: None,
            },
            library: LIBRARY_PARSERS.to_vec(),
        }
    }

    /// Defaults without any built-in pipelines, keeping the parser library
    pub fn empty() -> Self {
        Self {
            config: UnifiedConfig::default(),
            library: LIBRARY_PARSERS.to_vec(),
        }
    }

    /// Library parser that pipelines may reference as a processor
    pub fn library_processor(&self, id: &str) -> Option<&LibraryParser> {
        self.library.iter().find(|parser| parser.is_processor() && parser.name == id)
    }

    /// Library parser by name
    pub fn library_parser(&self, name: &str) -> Option<&LibraryParser> {
        self.library.iter().find(|parser| parser.name == name)
    }
}

fn builtin_service(pipeline: Pipeline) -> Service {
    let mut pipelines = Declared::new();
    pipelines.insert(DEFAULT_PIPELINE, pipeline);
    Service {
        log_level: Some(LogLevel::Info),
        pipelines,
    }
}

fn builtin_logging(platform: &PlatformFacts) -> LoggingConfig {
    let mut receivers = Declared::new();
    let receiver_id = if platform.is_windows() {
        receivers.insert(
            "windows_event_log",
            LoggingReceiver::WindowsEventLog(WindowsEventLogReceiver {
                channels: ["System", "Application", "Security"].map(str::to_owned).to_vec(),
            }),
        );
        "windows_event_log"
    } else {
        receivers.insert(
            "syslog",
            LoggingReceiver::Files(FilesReceiver {
                include_paths: ["/var/log/messages", "/var/log/syslog"].map(str::to_owned).to_vec(),
                exclude_paths: Vec::new(),
            }),
        );
        "syslog"
    };

    let mut exporters = Declared::new();
    exporters.insert("google", LoggingExporter::GoogleCloudLogging(GoogleCloudLogging {}));

    LoggingConfig {
        receivers,
        processors: Declared::new(),
        exporters,
        service: Some(builtin_service(Pipeline::new(&[receiver_id], &[], &["google"]))),
    }
}

fn builtin_metrics(platform: &PlatformFacts) -> MetricsConfig {
    let mut receivers = Declared::new();
    receivers.insert("hostmetrics", MetricsReceiver::Hostmetrics(IntervalReceiver::default()));

    let mut receiver_ids = vec!["hostmetrics"];
    if platform.is_windows() {
        receivers.insert("iis", MetricsReceiver::Iis(IntervalReceiver::default()));
        receivers.insert("mssql", MetricsReceiver::Mssql(IntervalReceiver::default()));
        receiver_ids.extend(["iis", "mssql"]);
    }

    let mut processors = Declared::new();
    processors.insert("metrics_filter", MetricsProcessor::ExcludeMetrics(ExcludeMetrics::default()));

    let mut exporters = Declared::new();
    exporters.insert("google", MetricsExporter::GoogleCloudMonitoring(GoogleCloudMonitoring {}));

    MetricsConfig {
        receivers,
        processors,
        exporters,
        service: Some(builtin_service(Pipeline::new(&receiver_ids, &["metrics_filter"], &["google"]))),
    }
}
