//! Programmatic unified configuration builder for integration tests

use indexmap::IndexMap;
use opsagent_config::{
    FilesReceiver, GoogleCloudLogging, GoogleCloudMonitoring, IntervalReceiver, LogLevel, LoggingConfig,
    LoggingExporter, LoggingProcessor, LoggingReceiver, MetricsConfig, MetricsExporter, MetricsReceiver, ModifyField,
    ModifyFields, ParseJson, Pipeline, Service, SyslogReceiver, UnifiedConfig,
};

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: UnifiedConfig,
}

impl ConfigBuilder {
    /// Start from an empty document
    pub fn new() -> Self {
        Self {
            config: UnifiedConfig::default(),
        }
    }

    fn logging(&mut self) -> &mut LoggingConfig {
        self.config.logging.get_or_insert_with(LoggingConfig::default)
    }

    fn metrics(&mut self) -> &mut MetricsConfig {
        self.config.metrics.get_or_insert_with(MetricsConfig::default)
    }

    /// Add a `files` receiver
    pub fn with_files_receiver(mut self, id: &str, include: &[&str], exclude: &[&str]) -> Self {
        let receiver = FilesReceiver {
            include_paths: include.iter().map(ToString::to_string).collect(),
            exclude_paths: exclude.iter().map(ToString::to_string).collect(),
        };
        self.logging().receivers.insert(id, LoggingReceiver::Files(receiver));
        self
    }

    /// Add a `syslog` receiver
    pub fn with_syslog_receiver(mut self, id: &str, protocol: &str, host: &str, port: u32, parser: Option<&str>) -> Self {
        let receiver = SyslogReceiver {
            transport_protocol: Some(protocol.to_owned()),
            listen_host: Some(host.to_owned()),
            listen_port: Some(port),
            parser: parser.map(str::to_owned),
        };
        self.logging().receivers.insert(id, LoggingReceiver::Syslog(receiver));
        self
    }

    /// Add a `parse_json` processor
    pub fn with_parse_json(mut self, id: &str, time_key: Option<&str>, time_format: Option<&str>) -> Self {
        let processor = ParseJson {
            field: None,
            time_key: time_key.map(str::to_owned),
            time_format: time_format.map(str::to_owned),
        };
        self.logging().processors.insert(id, LoggingProcessor::ParseJson(processor));
        self
    }

    /// Add a `modify_fields` processor setting static values
    pub fn with_static_fields(mut self, id: &str, fields: &[(&str, &str)]) -> Self {
        let fields: IndexMap<_, _> = fields
            .iter()
            .map(|(name, value)| {
                let field = ModifyField {
                    static_value: Some((*value).to_owned()),
                    ..ModifyField::default()
                };
                ((*name).to_owned(), field)
            })
            .collect();
        self.logging()
            .processors
            .insert(id, LoggingProcessor::ModifyFields(ModifyFields { fields }));
        self
    }

    /// Add a `google_cloud_logging` exporter
    pub fn with_logging_exporter(mut self, id: &str) -> Self {
        self.logging()
            .exporters
            .insert(id, LoggingExporter::GoogleCloudLogging(GoogleCloudLogging {}));
        self
    }

    /// Add a logging pipeline
    pub fn with_logging_pipeline(mut self, name: &str, receivers: &[&str], processors: &[&str], exporters: &[&str]) -> Self {
        let service = self.logging().service.get_or_insert_with(Service::default);
        service.pipelines.insert(name, Pipeline::new(receivers, processors, exporters));
        self
    }

    /// Set the log-shipping engine's log level
    pub fn with_logging_level(mut self, level: LogLevel) -> Self {
        self.logging().service.get_or_insert_with(Service::default).log_level = Some(level);
        self
    }

    /// Add a `hostmetrics` receiver
    pub fn with_hostmetrics(mut self, id: &str, interval: &str) -> Self {
        let receiver = IntervalReceiver {
            collection_interval: interval.to_owned(),
        };
        self.metrics().receivers.insert(id, MetricsReceiver::Hostmetrics(receiver));
        self
    }

    /// Add a `google_cloud_monitoring` exporter
    pub fn with_metrics_exporter(mut self, id: &str) -> Self {
        self.metrics()
            .exporters
            .insert(id, MetricsExporter::GoogleCloudMonitoring(GoogleCloudMonitoring {}));
        self
    }

    /// Add a metrics pipeline
    pub fn with_metrics_pipeline(mut self, name: &str, receivers: &[&str], processors: &[&str], exporters: &[&str]) -> Self {
        let service = self.metrics().service.get_or_insert_with(Service::default);
        service.pipelines.insert(name, Pipeline::new(receivers, processors, exporters));
        self
    }

    /// Build the final config
    pub fn build(self) -> UnifiedConfig {
        self.config
    }
}
