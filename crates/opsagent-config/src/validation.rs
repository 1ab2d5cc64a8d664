//! Structural and referential validation of a unified configuration
//!
//! Every problem found is collected; nothing stops at the first failure.
//! Each error carries the [`ConfigPath`] of the YAML node it refers to.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::net::IpAddr;

use regex::Regex;
use thiserror::Error;

use crate::logging::{ExcludeExpression, FieldPath, SYSLOG_PARSERS, TRANSPORT_PROTOCOLS};
use crate::metrics::{ExcludeMetrics, METRIC_DOMAIN_PREFIX, parse_interval};
use crate::{
    BuiltinConfig, CombinedConfig, CombinedReceiver, Declared, LogLevel, LoggingConfig, LoggingProcessor,
    LoggingReceiver, MetricsConfig, MetricsProcessor, MetricsReceiver, Os, Pipeline, PlatformFacts,
    PrometheusReceiver, RESERVED_PREFIX, SELF_OBSERVABILITY_ID, Service, UnifiedConfig, parse_key,
};

/// Log levels the metrics engine understands
const METRICS_LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug"];

/// Dotted location of a node in the unified document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfigPath(Vec<String>);

impl ConfigPath {
    /// Path of a top-level section
    pub fn root(section: &str) -> Self {
        Self(vec![section.to_owned()])
    }

    /// Child path
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Path segments from the root
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for ConfigPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// What is wrong at a [`ConfigPath`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationErrorKind {
    /// User identifiers must not use the built-in namespace
    #[error("{kind} {id:?} must not start with {RESERVED_PREFIX:?}")]
    ReservedPrefix { kind: &'static str, id: String },

    /// The identifier names a component the agent generates itself
    #[error("{kind} {id:?} is reserved for the agent's own metrics")]
    ReservedName { kind: &'static str, id: String },

    /// The same identifier was declared again
    #[error("{kind} {id:?} is declared more than once")]
    Duplicate { kind: &'static str, id: String },

    /// A pipeline names something that does not exist
    #[error("{kind} {id:?} from pipeline {pipeline:?} is not defined")]
    UndefinedReference {
        pipeline: String,
        kind: &'static str,
        id: String,
    },

    /// A pipeline lists the same identifier twice
    #[error("{kind} {id:?} is listed more than once in pipeline {pipeline:?}")]
    DuplicateReference {
        pipeline: String,
        kind: &'static str,
        id: String,
    },

    /// A pipeline lacks a mandatory stage
    #[error("pipeline {pipeline:?} must have at least one {kind}")]
    EmptyPipeline { pipeline: String, kind: &'static str },

    /// A field required by the component type is absent or empty
    #[error("{field:?} is a required field")]
    MissingField { field: String },

    /// A field holds a value outside its enumeration
    #[error("{field:?} must be one of [{}], got {value:?}", .allowed.join(" "))]
    InvalidValue {
        field: String,
        value: String,
        allowed: &'static [&'static str],
    },

    /// A field is present but malformed
    #[error("{field:?} {reason}")]
    InvalidField { field: String, reason: String },

    /// The component type cannot run on this host
    #[error("{kind} type {type_name:?} is not supported on {os}")]
    UnsupportedPlatform {
        kind: &'static str,
        type_name: &'static str,
        os: Os,
    },

    /// A singleton receiver type is used twice in one pipeline
    #[error("at most one {kind} with type {type_name:?} is allowed per pipeline, pipeline {pipeline:?} has several")]
    TooManyOfType {
        pipeline: String,
        kind: &'static str,
        type_name: &'static str,
    },

    /// Two network receivers bind the same port
    #[error("port {port} is already used by receiver {other:?}")]
    PortConflict { port: u32, other: String },

    /// A network receiver can only feed one pipeline
    #[error("network receiver {id:?} is used by pipeline {first:?} and pipeline {second:?}")]
    SharedNetworkReceiver { id: String, first: String, second: String },

    /// A section another section depends on is missing
    #[error("{kind} {id:?} requires a {section:?} section")]
    MissingSection {
        kind: &'static str,
        id: String,
        section: &'static str,
    },

    /// Two namespaces that are resolved together share an identifier
    #[error("metrics receiver {id:?} has the same name as combined receiver {id:?}")]
    NameCollision { id: String },
}

/// A single validation problem
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{path}: {kind}")]
pub struct ValidationError {
    /// Where the problem is
    pub path: ConfigPath,
    /// What the problem is
    pub kind: ValidationErrorKind,
}

/// Every problem found in one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    /// Whether any problem was found
    pub fn has_errors(&self) -> bool {
        !self.0.is_empty()
    }

    /// All problems in discovery order
    pub fn errors(&self) -> &[ValidationError] {
        &self.0
    }

    /// Number of problems
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no problem was found
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn push(&mut self, path: ConfigPath, kind: ValidationErrorKind) {
        self.0.push(ValidationError { path, kind });
    }

    /// `Ok` when empty, the collected errors otherwise
    ///
    /// # Errors
    ///
    /// Returns `self` when at least one problem was recorded
    pub fn into_result(self) -> Result<(), Self> {
        if self.has_errors() { Err(self) } else { Ok(()) }
    }
}

impl fmt::Display for ValidationErrors {
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

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Validates unified configurations for one platform
///
/// Holds only borrowed, immutable context; every call builds its own error
/// list, so one validator can serve concurrent callers.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    platform: &'a PlatformFacts,
    builtin: &'a BuiltinConfig,
}

impl<'a> Validator<'a> {
    /// Create a validator for a platform and its built-in library
    pub const fn new(platform: &'a PlatformFacts, builtin: &'a BuiltinConfig) -> Self {
        Self { platform, builtin }
    }

    /// Check identifiers and per-component fields only
    ///
    /// Suitable for a user document before merging, whose pipelines may
    /// still reference built-in components.
    ///
    /// # Errors
    ///
    /// Returns every declaration problem found
    pub fn validate_declarations(&self, config: &UnifiedConfig) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        self.check_declarations(config, &mut errors);
        errors.into_result()
    }

    /// Check declarations and pipeline wiring
    ///
    /// # Errors
    ///
    /// Returns every problem found
    pub fn validate(&self, config: &UnifiedConfig) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();
        self.check_declarations(config, &mut errors);
        self.check_wiring(config, &mut errors);
        errors.into_result()
    }

    fn check_declarations(&self, config: &UnifiedConfig, errors: &mut ValidationErrors) {
        if let Some(logging) = &config.logging {
            self.check_logging_declarations(logging, errors);
        }
        if let Some(metrics) = &config.metrics {
            self.check_metrics_declarations(metrics, errors);
        }
        if let Some(combined) = &config.combined {
            check_combined_declarations(combined, config.metrics.as_ref(), errors);
        }
    }

    fn check_wiring(&self, config: &UnifiedConfig, errors: &mut ValidationErrors) {
        if let Some(logging) = &config.logging {
            self.check_logging_wiring(logging, errors);
        }
        if let Some(metrics) = &config.metrics {
            check_metrics_wiring(metrics, config.combined.as_ref(), errors);
        }
        check_ports(config, errors);
    }

    fn check_logging_declarations(&self, logging: &LoggingConfig, errors: &mut ValidationErrors) {
        let root = ConfigPath::root("logging");

        check_identifiers(&root.join("receivers"), "logging receiver", &logging.receivers, errors);
        check_identifiers(&root.join("processors"), "logging processor", &logging.processors, errors);
        check_identifiers(&root.join("exporters"), "logging exporter", &logging.exporters, errors);
        if let Some(service) = &logging.service {
            check_identifiers(&pipelines_path(&root), "pipeline", &service.pipelines, errors);
        }

        for (id, receiver) in &logging.receivers {
            let path = root.join("receivers").join(id);
            self.check_logging_receiver(&path, receiver, errors);
        }
        for (id, processor) in &logging.processors {
            check_logging_processor(&root.join("processors").join(id), processor, errors);
        }
    }

    fn check_logging_receiver(&self, path: &ConfigPath, receiver: &LoggingReceiver, errors: &mut ValidationErrors) {
        match receiver {
            LoggingReceiver::Files(files) => {
                if files.include_paths.is_empty() {
                    errors.push(path.clone(), missing("include_paths"));
                }
            }
            LoggingReceiver::Syslog(syslog) => {
                check_enum(path, "transport_protocol", syslog.transport_protocol.as_deref(), TRANSPORT_PROTOCOLS, true, errors);
                match syslog.listen_host.as_deref() {
                    None | Some("") => errors.push(path.clone(), missing("listen_host")),
                    Some(host) if host.parse::<IpAddr>().is_err() => {
                        errors.push(path.clone(), invalid("listen_host", "must be an IP address"));
                    }
                    Some(_) => {}
                }
                match syslog.listen_port {
                    None => errors.push(path.clone(), missing("listen_port")),
                    Some(port) if port == 0 || port > u32::from(u16::MAX) => {
                        errors.push(path.clone(), invalid("listen_port", "must be between 1 and 65535"));
                    }
                    Some(_) => {}
                }
                check_enum(path, "parser", syslog.parser.as_deref(), SYSLOG_PARSERS, false, errors);
            }
            LoggingReceiver::WindowsEventLog(winlog) => {
                if winlog.channels.is_empty() {
                    errors.push(path.clone(), missing("channels"));
                }
                if !self.platform.is_windows() {
                    errors.push(
                        path.clone(),
                        ValidationErrorKind::UnsupportedPlatform {
                            kind: "logging receiver",
                            type_name: receiver.type_name(),
                            os: self.platform.os,
                        },
                    );
                }
            }
        }
    }

    fn check_logging_wiring(&self, logging: &LoggingConfig, errors: &mut ValidationErrors) {
        let Some(service) = &logging.service else {
            return;
        };
        let root = pipelines_path(&ConfigPath::root("logging"));

        for (name, pipeline) in &service.pipelines {
            let path = root.join(name);
            if pipeline.receivers.is_empty() {
                errors.push(path.clone(), empty_pipeline(name, "receiver"));
            }

            check_references(&path, name, "receivers", "logging receiver", &pipeline.receivers, errors, |id| {
                logging.receivers.contains(id)
            });
            check_references(&path, name, "processors", "logging processor", &pipeline.processors, errors, |id| {
                logging.processors.contains(id) || self.builtin.library_processor(id).is_some()
            });
            check_references(&path, name, "exporters", "logging exporter", &pipeline.exporters, errors, |id| {
                logging.exporters.contains(id)
            });
        }

        // A network receiver can only be bound once
        let mut owners: HashMap<&str, &str> = HashMap::new();
        for (name, pipeline) in &service.pipelines {
            for id in unique(&pipeline.receivers) {
                let Some(receiver) = logging.receivers.get(id) else {
                    continue;
                };
                if !receiver.is_network() {
                    continue;
                }
                match owners.get(id) {
                    Some(first) if *first != name.as_str() => errors.push(
                        root.join(name).join("receivers"),
                        ValidationErrorKind::SharedNetworkReceiver {
                            id: id.to_owned(),
                            first: (*first).to_owned(),
                            second: name.clone(),
                        },
                    ),
                    Some(_) => {}
                    None => {
                        owners.insert(id, name);
                    }
                }
            }
        }
    }

    fn check_metrics_declarations(&self, metrics: &MetricsConfig, errors: &mut ValidationErrors) {
        let root = ConfigPath::root("metrics");

        check_identifiers(&root.join("receivers"), "metrics receiver", &metrics.receivers, errors);
        check_identifiers(&root.join("processors"), "metrics processor", &metrics.processors, errors);
        check_identifiers(&root.join("exporters"), "metrics exporter", &metrics.exporters, errors);
        check_reserved_name(&root.join("receivers"), "metrics receiver", &metrics.receivers, errors);
        check_reserved_name(&root.join("processors"), "metrics processor", &metrics.processors, errors);
        check_reserved_name(&root.join("exporters"), "metrics exporter", &metrics.exporters, errors);
        if let Some(service) = &metrics.service {
            check_identifiers(&pipelines_path(&root), "pipeline", &service.pipelines, errors);
            check_reserved_name(&pipelines_path(&root), "pipeline", &service.pipelines, errors);
            check_metrics_log_level(&root.join("service"), service, errors);
        }

        for (id, receiver) in &metrics.receivers {
            let path = root.join("receivers").join(id);
            match receiver {
                MetricsReceiver::Hostmetrics(interval) | MetricsReceiver::Iis(interval) | MetricsReceiver::Mssql(interval) => {
                    if let Err(reason) = parse_interval(&interval.collection_interval) {
                        errors.push(path.clone(), invalid("collection_interval", reason));
                    }
                }
                MetricsReceiver::Prometheus(prometheus) => check_prometheus(&path, prometheus, errors),
            }
            if receiver.is_windows_only() && !self.platform.is_windows() {
                errors.push(
                    path,
                    ValidationErrorKind::UnsupportedPlatform {
                        kind: "metrics receiver",
                        type_name: receiver.type_name(),
                        os: self.platform.os,
                    },
                );
            }
        }

        for (id, processor) in &metrics.processors {
            let path = root.join("processors").join(id);
            let MetricsProcessor::ExcludeMetrics(exclude) = processor;
            for pattern in &exclude.metrics_pattern {
                if ExcludeMetrics::pattern_prefix(pattern).is_none() {
                    errors.push(
                        path.clone(),
                        invalid(
                            "metrics_pattern",
                            format!("entry {pattern:?} must start with {METRIC_DOMAIN_PREFIX:?} and end with \"*\""),
                        ),
                    );
                }
            }
        }
    }
}

/// User-declared components that no pipeline of the resolved document uses
///
/// Unreferenced components are not rendered. They are reported so callers
/// can warn about them; they are not validation errors.
pub fn unreferenced(user: &UnifiedConfig, resolved: &UnifiedConfig) -> Vec<ConfigPath> {
    fn referenced<'p>(service: Option<&'p Service>, pick: fn(&Pipeline) -> &Vec<String>) -> HashSet<&'p str> {
        service
            .map(|service| {
                service
                    .pipelines
                    .iter()
                    .flat_map(|(_, pipeline)| pick(pipeline).iter().map(String::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn report<T>(root: &ConfigPath, section: &str, declared: &Declared<T>, used: &HashSet<&str>, out: &mut Vec<ConfigPath>) {
        for id in declared.ids() {
            if !used.contains(id) {
                out.push(root.join(section).join(id));
            }
        }
    }

    let mut unused = Vec::new();

    if let (Some(user), Some(resolved)) = (&user.logging, &resolved.logging) {
        let root = ConfigPath::root("logging");
        let service = resolved.service.as_ref();
        report(&root, "receivers", &user.receivers, &referenced(service, |p| &p.receivers), &mut unused);
        report(&root, "processors", &user.processors, &referenced(service, |p| &p.processors), &mut unused);
        report(&root, "exporters", &user.exporters, &referenced(service, |p| &p.exporters), &mut unused);
    }

    let metrics_service = resolved.metrics.as_ref().and_then(|metrics| metrics.service.as_ref());
    let metrics_receivers = referenced(metrics_service, |p| &p.receivers);

    if let (Some(user), Some(_)) = (&user.metrics, &resolved.metrics) {
        let root = ConfigPath::root("metrics");
        report(&root, "receivers", &user.receivers, &metrics_receivers, &mut unused);
        report(&root, "processors", &user.processors, &referenced(metrics_service, |p| &p.processors), &mut unused);
        report(&root, "exporters", &user.exporters, &referenced(metrics_service, |p| &p.exporters), &mut unused);
    }

    if let Some(combined) = &user.combined {
        report(&ConfigPath::root("combined"), "receivers", &combined.receivers, &metrics_receivers, &mut unused);
    }

    unused
}

fn pipelines_path(root: &ConfigPath) -> ConfigPath {
    root.join("service").join("pipelines")
}

fn missing(field: &str) -> ValidationErrorKind {
    ValidationErrorKind::MissingField { field: field.to_owned() }
}

fn invalid(field: &str, reason: impl Into<String>) -> ValidationErrorKind {
    ValidationErrorKind::InvalidField {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

fn empty_pipeline(pipeline: &str, kind: &'static str) -> ValidationErrorKind {
    ValidationErrorKind::EmptyPipeline {
        pipeline: pipeline.to_owned(),
        kind,
    }
}

/// Distinct identifiers of a reference list, first occurrence order
fn unique(ids: &[String]) -> impl Iterator<Item = &str> {
    let mut seen = HashSet::new();
    ids.iter().map(String::as_str).filter(move |id| seen.insert(*id))
}

fn check_identifiers<T>(path: &ConfigPath, kind: &'static str, declared: &Declared<T>, errors: &mut ValidationErrors) {
    for id in declared.ids() {
        if id.starts_with(RESERVED_PREFIX) {
            errors.push(
                path.join(id),
                ValidationErrorKind::ReservedPrefix {
                    kind,
                    id: id.to_owned(),
                },
            );
        }
    }
    for id in declared.duplicates() {
        errors.push(
            path.join(id),
            ValidationErrorKind::Duplicate {
                kind,
                id: id.clone(),
            },
        );
    }
}

/// Metrics components share their rendered names with the self-observability pipeline
fn check_reserved_name<T>(path: &ConfigPath, kind: &'static str, declared: &Declared<T>, errors: &mut ValidationErrors) {
    if declared.contains(SELF_OBSERVABILITY_ID) {
        errors.push(
            path.join(SELF_OBSERVABILITY_ID),
            ValidationErrorKind::ReservedName {
                kind,
                id: SELF_OBSERVABILITY_ID.to_owned(),
            },
        );
    }
}

fn check_enum(
    path: &ConfigPath,
    field: &str,
    value: Option<&str>,
    allowed: &'static [&'static str],
    required: bool,
    errors: &mut ValidationErrors,
) {
    match value {
        None if required => errors.push(path.clone(), missing(field)),
        None => {}
        Some(value) if !allowed.contains(&value) => errors.push(
            path.clone(),
            ValidationErrorKind::InvalidValue {
                field: field.to_owned(),
                value: value.to_owned(),
                allowed,
            },
        ),
        Some(_) => {}
    }
}

fn check_time_fields(path: &ConfigPath, time_key: Option<&String>, time_format: Option<&String>, errors: &mut ValidationErrors) {
    if time_format.is_some() && time_key.is_none() {
        errors.push(path.clone(), invalid("time_format", "requires \"time_key\" to be set"));
    }
}

fn check_logging_processor(path: &ConfigPath, processor: &LoggingProcessor, errors: &mut ValidationErrors) {
    match processor {
        LoggingProcessor::ParseJson(parse) => {
            check_parse_field(path, parse.field.as_deref(), errors);
            check_time_fields(path, parse.time_key.as_ref(), parse.time_format.as_ref(), errors);
        }
        LoggingProcessor::ParseRegex(parse) => {
            check_parse_field(path, parse.field.as_deref(), errors);
            if parse.regex.as_deref().is_none_or(str::is_empty) {
                errors.push(path.clone(), missing("regex"));
            }
            check_time_fields(path, parse.time_key.as_ref(), parse.time_format.as_ref(), errors);
        }
        LoggingProcessor::ExcludeLogs(exclude) => {
            if exclude.match_any.is_empty() {
                errors.push(path.clone(), missing("match_any"));
            }
            for (i, expression) in exclude.match_any.iter().enumerate() {
                let field = format!("match_any[{i}]");
                match ExcludeExpression::parse(expression) {
                    Ok(parsed) => {
                        if let Err(e) = Regex::new(&parsed.pattern()) {
                            errors.push(
                                path.clone(),
                                invalid(&field, format!("is not a valid regular expression: {e}")),
                            );
                        }
                    }
                    Err(reason) => errors.push(path.clone(), invalid(&field, reason)),
                }
            }
        }
        LoggingProcessor::ModifyFields(modify) => {
            if modify.fields.is_empty() {
                errors.push(path.clone(), missing("fields"));
            }
            for (destination, field) in &modify.fields {
                let field_path = path.join("fields").join(destination);
                check_top_level_field(&field_path, "destination", destination, errors);

                if field.source_count() != 1 {
                    errors.push(
                        field_path.clone(),
                        invalid(
                            destination,
                            "needs exactly one of \"move_from\", \"copy_from\" or \"static_value\"",
                        ),
                    );
                }
                for (name, source) in [("move_from", &field.move_from), ("copy_from", &field.copy_from)] {
                    if let Some(source) = source {
                        check_top_level_field(&field_path, name, source, errors);
                    }
                }
            }
        }
    }
}

fn check_parse_field(path: &ConfigPath, field: Option<&str>, errors: &mut ValidationErrors) {
    if let Err(reason) = parse_key(field) {
        errors.push(path.clone(), invalid("field", reason));
    }
}

fn check_top_level_field(path: &ConfigPath, field: &str, value: &str, errors: &mut ValidationErrors) {
    match FieldPath::parse(value) {
        Ok(parsed) if parsed.is_top_level() => {}
        Ok(_) => errors.push(
            path.clone(),
            invalid(field, format!("{value:?} must name a top-level field")),
        ),
        Err(reason) => errors.push(path.clone(), invalid(field, reason)),
    }
}

fn check_metrics_log_level(path: &ConfigPath, service: &Service, errors: &mut ValidationErrors) {
    if service.log_level == Some(LogLevel::Trace) {
        errors.push(
            path.clone(),
            ValidationErrorKind::InvalidValue {
                field: "log_level".to_owned(),
                value: LogLevel::Trace.to_string(),
                allowed: METRICS_LOG_LEVELS,
            },
        );
    }
}

fn check_prometheus(path: &ConfigPath, prometheus: &PrometheusReceiver, errors: &mut ValidationErrors) {
    if prometheus.scrape_configs.is_empty() {
        errors.push(path.clone(), missing("scrape_configs"));
    }

    let mut jobs = HashSet::new();
    for (i, scrape) in prometheus.scrape_configs.iter().enumerate() {
        let field = |name: &str| format!("scrape_configs[{i}].{name}");

        if scrape.job_name.is_empty() {
            errors.push(path.clone(), missing(&field("job_name")));
        } else if !jobs.insert(scrape.job_name.as_str()) {
            errors.push(
                path.clone(),
                invalid(&field("job_name"), format!("{:?} is used by another scrape config", scrape.job_name)),
            );
        }
        if let Err(reason) = parse_interval(&scrape.scrape_interval) {
            errors.push(path.clone(), invalid(&field("scrape_interval"), reason));
        }
        if scrape.targets.is_empty() {
            errors.push(path.clone(), missing(&field("targets")));
        }
        for target in &scrape.targets {
            let valid = target
                .rsplit_once(':')
                .is_some_and(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok_and(|port| port > 0));
            if !valid {
                errors.push(
                    path.clone(),
                    invalid(&field("targets"), format!("entry {target:?} must be a host:port pair")),
                );
            }
        }
        if let Some(auth) = &scrape.basic_auth
            && auth.password.is_empty()
        {
            errors.push(path.clone(), missing(&field("basic_auth.password")));
        }
    }
}

fn check_combined_declarations(combined: &CombinedConfig, metrics: Option<&MetricsConfig>, errors: &mut ValidationErrors) {
    let root = ConfigPath::root("combined").join("receivers");
    check_identifiers(&root, "combined receiver", &combined.receivers, errors);

    for (id, receiver) in &combined.receivers {
        let path = root.join(id);
        let CombinedReceiver::Otlp(otlp) = receiver;
        if otlp.port().is_none_or(|port| port == 0 || port > u32::from(u16::MAX)) {
            errors.push(path.clone(), invalid("grpc_endpoint", "must be a host:port pair"));
        }

        match metrics {
            None => errors.push(
                path,
                ValidationErrorKind::MissingSection {
                    kind: "combined receiver",
                    id: id.clone(),
                    section: "metrics",
                },
            ),
            Some(metrics) if metrics.receivers.contains(id) => {
                errors.push(path, ValidationErrorKind::NameCollision { id: id.clone() });
            }
            Some(_) => {}
        }
    }
}

fn check_metrics_wiring(metrics: &MetricsConfig, combined: Option<&CombinedConfig>, errors: &mut ValidationErrors) {
    let Some(service) = &metrics.service else {
        return;
    };
    let root = pipelines_path(&ConfigPath::root("metrics"));
    let combined_receiver = |id: &str| combined.is_some_and(|combined| combined.receivers.contains(id));

    for (name, pipeline) in &service.pipelines {
        let path = root.join(name);
        if pipeline.receivers.is_empty() {
            errors.push(path.clone(), empty_pipeline(name, "receiver"));
        }
        if pipeline.exporters.is_empty() {
            errors.push(path.clone(), empty_pipeline(name, "exporter"));
        }

        check_references(&path, name, "receivers", "metrics receiver", &pipeline.receivers, errors, |id| {
            metrics.receivers.contains(id) || combined_receiver(id)
        });
        check_references(&path, name, "processors", "metrics processor", &pipeline.processors, errors, |id| {
            metrics.processors.contains(id)
        });
        check_references(&path, name, "exporters", "metrics exporter", &pipeline.exporters, errors, |id| {
            metrics.exporters.contains(id)
        });

        let mut seen_types = HashSet::new();
        let mut reported = HashSet::new();
        for id in unique(&pipeline.receivers) {
            let Some(receiver) = metrics.receivers.get(id) else {
                continue;
            };
            let type_name = receiver.type_name();
            if MetricsReceiver::SINGLETON_TYPES.contains(&type_name)
                && !seen_types.insert(type_name)
                && reported.insert(type_name)
            {
                errors.push(
                    path.join("receivers"),
                    ValidationErrorKind::TooManyOfType {
                        pipeline: name.clone(),
                        kind: "metrics receiver",
                        type_name,
                    },
                );
            }
        }
    }
}

/// Report dangling and repeated references of one pipeline stage
fn check_references(
    pipeline_path: &ConfigPath,
    pipeline: &str,
    stage: &str,
    kind: &'static str,
    ids: &[String],
    errors: &mut ValidationErrors,
    exists: impl Fn(&str) -> bool,
) {
    let path = pipeline_path.join(stage);
    let mut seen = HashSet::new();

    for id in ids {
        if !seen.insert(id.as_str()) {
            errors.push(
                path.clone(),
                ValidationErrorKind::DuplicateReference {
                    pipeline: pipeline.to_owned(),
                    kind,
                    id: id.clone(),
                },
            );
            continue;
        }
        if !exists(id) {
            errors.push(
                path.clone(),
                ValidationErrorKind::UndefinedReference {
                    pipeline: pipeline.to_owned(),
                    kind,
                    id: id.clone(),
                },
            );
        }
    }
}

/// Network receivers in use must not share a listening port
fn check_ports(config: &UnifiedConfig, errors: &mut ValidationErrors) {
    let mut listeners: Vec<(ConfigPath, &str, u32)> = Vec::new();

    if let Some(logging) = &config.logging
        && let Some(service) = &logging.service
    {
        let mut used = HashSet::new();
        for (_, pipeline) in &service.pipelines {
            for id in &pipeline.receivers {
                if !used.insert(id.as_str()) {
                    continue;
                }
                if let Some(port) = logging.receivers.get(id).and_then(LoggingReceiver::listen_port) {
                    listeners.push((ConfigPath::root("logging").join("receivers").join(id), id.as_str(), port));
                }
            }
        }
    }

    if let Some(combined) = &config.combined {
        for (id, receiver) in &combined.receivers {
            let CombinedReceiver::Otlp(otlp) = receiver;
            if let Some(port) = otlp.port() {
                listeners.push((ConfigPath::root("combined").join("receivers").join(id), id.as_str(), port));
            }
        }
    }

    let mut taken: HashMap<u32, &str> = HashMap::new();
    for (path, id, port) in listeners {
        match taken.get(&port) {
            Some(other) => errors.push(
                path,
                ValidationErrorKind::PortConflict {
                    port,
                    other: (*other).to_owned(),
                },
            ),
            None => {
                taken.insert(port, id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    fn linux() -> PlatformFacts {
        PlatformFacts::new(Os::Linux)
    }

    fn validate(yaml: &str) -> Result<(), ValidationErrors> {
        let platform = linux();
        let builtin = BuiltinConfig::empty();
        let config = UnifiedConfig::from_yaml(yaml).unwrap();
        Validator::new(&platform, &builtin).validate(&config)
    }

    fn messages(result: Result<(), ValidationErrors>) -> Vec<String> {
        result.unwrap_err().errors().iter().map(ToString::to_string).collect()
    }

    #[test]
    fn valid_logging_pipeline_passes() {
        validate(indoc! {"
            logging:
              receivers:
                app:
                  type: files
                  include_paths: [/var/log/app.log]
              processors:
                json:
                  type: parse_json
                nginx_access:
                  type: parse_regex
                  regex: ^(?<line>.*)$
              exporters:
                google:
                  type: google_cloud_logging
              service:
                pipelines:
                  p:
                    receivers: [app]
                    processors: [json, nginx_access, lib:nginx]
                    exporters: [google]
        "})
        .unwrap();
    }

    #[test]
    fn reports_every_missing_reference() {
        let errors = messages(validate(indoc! {"
            logging:
              receivers:
                app:
                  type: files
                  include_paths: [/a]
              service:
                pipelines:
                  p1:
                    receivers: [app, ghost]
                    processors: [missing_json]
                    exporters: [nowhere]
        "}));
        assert_eq!(
            errors,
            [
                "logging.service.pipelines.p1.receivers: logging receiver \"ghost\" from pipeline \"p1\" is not defined",
                "logging.service.pipelines.p1.processors: logging processor \"missing_json\" from pipeline \"p1\" is not defined",
                "logging.service.pipelines.p1.exporters: logging exporter \"nowhere\" from pipeline \"p1\" is not defined",
            ]
        );
    }

    #[test]
    fn rejects_reserved_prefix_and_duplicates() {
        let errors = messages(validate(indoc! {"
            logging:
              receivers:
                lib:mine:
                  type: files
                  include_paths: [/a]
                dup:
                  type: files
                  include_paths: [/a]
                dup:
                  type: files
                  include_paths: [/b]
        "}));
        assert_eq!(
            errors,
            [
                "logging.receivers.lib:mine: logging receiver \"lib:mine\" must not start with \"lib:\"",
                "logging.receivers.dup: logging receiver \"dup\" is declared more than once",
            ]
        );
    }

    #[test]
    fn syslog_fields_are_checked_together() {
        let errors = messages(validate(indoc! {"
            logging:
              receivers:
                net:
                  type: syslog
                  transport_protocol: invalid_mode
                  listen_host: not-an-ip
                  listen_port: 0
                  parser: json
        "}));
        assert_eq!(
            errors,
            [
                "logging.receivers.net: \"transport_protocol\" must be one of [tcp udp], got \"invalid_mode\"",
                "logging.receivers.net: \"listen_host\" must be an IP address",
                "logging.receivers.net: \"listen_port\" must be between 1 and 65535",
                "logging.receivers.net: \"parser\" must be one of [default rfc5424 rfc3164], got \"json\"",
            ]
        );
    }

    #[test]
    fn empty_pipeline_is_rejected() {
        let errors = messages(validate(indoc! {"
            logging:
              service:
                pipelines:
                  hollow: {}
        "}));
        assert_eq!(
            errors,
            ["logging.service.pipelines.hollow: pipeline \"hollow\" must have at least one receiver"]
        );
    }

    #[test]
    fn repeated_reference_is_reported_per_repeat() {
        let errors = messages(validate(indoc! {"
            logging:
              receivers:
                app:
                  type: files
                  include_paths: [/a]
              service:
                pipelines:
                  p:
                    receivers: [app, app, app]
        "}));
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("is listed more than once in pipeline \"p\""));
    }

    #[test]
    fn windows_only_types_fail_on_linux() {
        let errors = messages(validate(indoc! {"
            logging:
              receivers:
                events:
                  type: windows_event_log
                  channels: [System]
            metrics:
              receivers:
                web:
                  type: iis
        "}));
        assert_eq!(
            errors,
            [
                "logging.receivers.events: logging receiver type \"windows_event_log\" is not supported on linux",
                "metrics.receivers.web: metrics receiver type \"iis\" is not supported on linux",
            ]
        );
    }

    #[test]
    fn network_receivers_cannot_share_ports_or_pipelines() {
        let errors = messages(validate(indoc! {"
            logging:
              receivers:
                a:
                  type: syslog
                  transport_protocol: tcp
                  listen_host: 0.0.0.0
                  listen_port: 5140
                b:
                  type: syslog
                  transport_protocol: udp
                  listen_host: 0.0.0.0
                  listen_port: 5140
              service:
                pipelines:
                  p1:
                    receivers: [a, b]
                  p2:
                    receivers: [a]
        "}));
        assert_eq!(
            errors,
            [
                "logging.service.pipelines.p2.receivers: network receiver \"a\" is used by pipeline \"p1\" and pipeline \"p2\"",
                "logging.receivers.b: port 5140 is already used by receiver \"a\"",
            ]
        );
    }

    #[test]
    fn processors_validate_their_fields() {
        let errors = messages(validate(indoc! {r#"
            logging:
              processors:
                regex_without_pattern:
                  type: parse_regex
                  time_format: "%s"
                bad_exclude:
                  type: exclude_logs
                  match_any:
                  - severity = "x"
                bad_modify:
                  type: modify_fields
                  fields:
                    jsonPayload.a.b:
                      copy_from: jsonPayload.c
                      static_value: d
        "#}));
        assert_eq!(
            errors,
            [
                "logging.processors.regex_without_pattern: \"regex\" is a required field",
                "logging.processors.regex_without_pattern: \"time_format\" requires \"time_key\" to be set",
                "logging.processors.bad_exclude: \"match_any[0]\" field \"severity\" must start with \"jsonPayload.\"",
                "logging.processors.bad_modify.fields.jsonPayload.a.b: \"destination\" \"jsonPayload.a.b\" must name a top-level field",
                "logging.processors.bad_modify.fields.jsonPayload.a.b: \"jsonPayload.a.b\" needs exactly one of \"move_from\", \"copy_from\" or \"static_value\"",
            ]
        );
    }

    #[test]
    fn metrics_rules() {
        let errors = messages(validate(indoc! {"
            metrics:
              receivers:
                fast:
                  type: hostmetrics
                  collection_interval: 5s
                host2:
                  type: hostmetrics
                prom:
                  type: prometheus
                  scrape_configs:
                  - job_name: app
                    targets: [localhost]
              processors:
                filter:
                  type: exclude_metrics
                  metrics_pattern: [processes/*]
              exporters:
                google:
                  type: google_cloud_monitoring
              service:
                log_level: trace
                pipelines:
                  p:
                    receivers: [fast, host2, prom]
                    processors: [filter]
        "}));
        assert_eq!(
            errors,
            [
                "metrics.service: \"log_level\" must be one of [error warn info debug], got \"trace\"",
                "metrics.receivers.fast: \"collection_interval\" duration \"5s\" is below the minimum of 10s",
                "metrics.receivers.prom: \"scrape_configs[0].targets\" entry \"localhost\" must be a host:port pair",
                "metrics.processors.filter: \"metrics_pattern\" entry \"processes/*\" must start with \"agent.googleapis.com/\" and end with \"*\"",
                "metrics.service.pipelines.p: pipeline \"p\" must have at least one exporter",
                "metrics.service.pipelines.p.receivers: at most one metrics receiver with type \"hostmetrics\" is allowed per pipeline, pipeline \"p\" has several",
            ]
        );
    }

    #[test]
    fn self_observability_name_is_reserved_in_metrics() {
        let errors = messages(validate(indoc! {"
            metrics:
              receivers:
                agent:
                  type: prometheus
                  scrape_configs:
                  - job_name: myapp
                    targets: [localhost:9999]
              exporters:
                google:
                  type: google_cloud_monitoring
              service:
                pipelines:
                  agent:
                    receivers: [agent]
                    exporters: [google]
        "}));
        assert_eq!(
            errors,
            [
                "metrics.receivers.agent: metrics receiver \"agent\" is reserved for the agent's own metrics",
                "metrics.service.pipelines.agent: pipeline \"agent\" is reserved for the agent's own metrics",
            ]
        );

        // Logging has no self-observability components of that name
        validate(indoc! {"
            logging:
              receivers:
                agent:
                  type: files
                  include_paths: [/var/log/agent.log]
              service:
                pipelines:
                  agent:
                    receivers: [agent]
        "})
        .unwrap();
    }

    #[test]
    fn exclude_patterns_must_compile() {
        let errors = messages(validate(indoc! {r#"
            logging:
              processors:
                bad_regex:
                  type: exclude_logs
                  match_any:
                  - 'jsonPayload.message =~ "(unclosed"'
                  - 'jsonPayload.level = "(literal"'
        "#}));
        assert_eq!(errors.len(), 1, "{errors:#?}");
        assert!(
            errors[0].starts_with("logging.processors.bad_regex: \"match_any[0]\" is not a valid regular expression: "),
            "{}",
            errors[0]
        );
    }

    #[test]
    fn parse_field_must_be_a_top_level_key() {
        let errors = messages(validate(indoc! {"
            logging:
              processors:
                nested:
                  type: parse_json
                  field: jsonPayload.http.body
                spaced:
                  type: parse_regex
                  field: two words
                  regex: ^(?<x>.*)$
                top:
                  type: parse_json
                  field: jsonPayload.raw
                bare:
                  type: parse_json
                  field: log
        "}));
        assert_eq!(
            errors,
            [
                "logging.processors.nested: \"field\" \"jsonPayload.http.body\" must name a top-level field",
                "logging.processors.spaced: \"field\" \"two words\" is not a valid record key",
            ]
        );
    }

    #[test]
    fn combined_receivers_need_metrics_and_unique_names() {
        let errors = messages(validate(indoc! {"
            combined:
              receivers:
                otlp:
                  type: otlp
        "}));
        assert_eq!(
            errors,
            ["combined.receivers.otlp: combined receiver \"otlp\" requires a \"metrics\" section"]
        );

        let errors = messages(validate(indoc! {"
            metrics:
              receivers:
                otlp:
                  type: hostmetrics
            combined:
              receivers:
                otlp:
                  type: otlp
        "}));
        assert_eq!(
            errors,
            ["combined.receivers.otlp: metrics receiver \"otlp\" has the same name as combined receiver \"otlp\""]
        );
    }

    #[test]
    fn combined_receivers_resolve_in_metrics_pipelines() {
        validate(indoc! {"
            metrics:
              exporters:
                google:
                  type: google_cloud_monitoring
              service:
                pipelines:
                  otlp_pipeline:
                    receivers: [otlp]
                    exporters: [google]
            combined:
              receivers:
                otlp:
                  type: otlp
        "})
        .unwrap();
    }

    #[test]
    fn declarations_pass_skips_wiring() {
        let platform = linux();
        let builtin = BuiltinConfig::empty();
        let config = UnifiedConfig::from_yaml(indoc! {"
            logging:
              service:
                pipelines:
                  p:
                    receivers: [defined_elsewhere]
        "})
        .unwrap();
        let validator = Validator::new(&platform, &builtin);
        validator.validate_declarations(&config).unwrap();
        assert!(validator.validate(&config).is_err());
    }

    #[test]
    fn error_list_exposes_queries() {
        let errors = validate("logging:\n  receivers:\n    f:\n      type: files\n").unwrap_err();
        assert!(errors.has_errors());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.errors()[0].path.to_string(), "logging.receivers.f");
        assert_eq!(errors.to_string(), "logging.receivers.f: \"include_paths\" is a required field");
    }

    #[test]
    fn finds_unreferenced_user_components() {
        let user = UnifiedConfig::from_yaml(indoc! {"
            logging:
              receivers:
                unused_tail:
                  type: files
                  include_paths: [/a]
        "})
        .unwrap();
        let builtin = BuiltinConfig::for_platform(&linux());
        let merged = crate::merge(&user, &builtin).config;

        let unused = unreferenced(&user, &merged);
        assert_eq!(unused, [ConfigPath::root("logging").join("receivers").join("unused_tail")]);
    }
}
