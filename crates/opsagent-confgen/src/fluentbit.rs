//! Log-shipping engine configuration
//!
//! Every section is rendered from a plugin template (see [`template`]).
//! Sections of the main file are emitted in a fixed order: service, agent
//! self-log inputs, pipeline inputs, processor filters, log-name filters,
//! the self-log output and finally one output per exporter.

pub mod filters;
pub mod inputs;
pub mod outputs;
pub mod parsers;
pub mod template;

use indexmap::{IndexMap, IndexSet};
use opsagent_config::{
    DEFAULT_PARSE_FIELD, ExcludeExpression, FieldPath, LoggingConfig, LoggingProcessor, LoggingReceiver, ModifyField,
    ModifyFields, Pipeline, parse_key,
};

use self::filters::{GrepExclude, Modify, ModifyOperation, ParserFilter, RewriteTag};
use self::inputs::{Syslog, Tail, Winlog};
use self::outputs::{Service, Stackdriver};
use self::parsers::{JsonParser, RegexParser};
pub use self::template::Fields;
use crate::{RenderContext, RenderError};

/// File name of the main configuration
pub const MAIN_CONFIG_FILE: &str = "fluent_bit_main.conf";

/// File name of the parser configuration
pub const PARSER_CONFIG_FILE: &str = "fluent_bit_parser.conf";

/// Tag of the log-shipping engine's own log
pub const SELF_LOG_TAG: &str = "ops-agent-fluent-bit";

/// Tag of the metrics engine's log
pub const METRICS_LOG_TAG: &str = "ops-agent-metrics";

/// A section type of the engine configuration
pub trait Plugin {
    /// Plugin name used in error messages
    const NAME: &'static str;
    /// Section template, see [`template::render`]
    const TEMPLATE: &'static str;

    /// Values bound to the template placeholders
    ///
    /// # Errors
    ///
    /// Returns an error when a value is outside what the plugin accepts
    fn fields(&self) -> Result<Fields, RenderError>;

    /// Render the section
    ///
    /// # Errors
    ///
    /// Returns an error when a field is invalid or a required one is empty
    fn render(&self) -> Result<String, RenderError> {
        template::render(Self::NAME, Self::TEMPLATE, &self.fields()?)
    }
}

/// Rendered log-shipping configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluentBitConfig {
    pub main: String,
    pub parsers: String,
}

/// Render both log-shipping files from the merged `logging` section
///
/// # Errors
///
/// Returns the first section that fails to render
pub fn render(ctx: &RenderContext<'_>, logging: Option<&LoggingConfig>) -> Result<FluentBitConfig, RenderError> {
    let empty = LoggingConfig::default();
    let logging = logging.unwrap_or(&empty);
    let pipelines: Vec<_> = logging
        .service
        .iter()
        .flat_map(|service| service.pipelines.iter())
        .collect();

    let mut sections = Vec::new();

    let log_level = logging
        .service
        .as_ref()
        .and_then(|service| service.log_level)
        .unwrap_or_default();
    sections.push(Service { log_level }.render()?);

    for (tag, file) in [(SELF_LOG_TAG, "logging-module.log"), (METRICS_LOG_TAG, "metrics-module.log")] {
        let tail = Tail {
            tag: tag.to_owned(),
            include_paths: vec![ctx.paths.subagent_log(file)],
            exclude_paths: Vec::new(),
            db: ctx.paths.buffer(tag),
        };
        sections.push(tail.render()?);
    }

    for (name, pipeline) in &pipelines {
        for receiver_id in distinct(&pipeline.receivers) {
            if let Some(receiver) = logging.receivers.get(receiver_id) {
                sections.push(render_input(ctx, name, receiver_id, receiver)?);
            }
        }
    }

    for (name, pipeline) in &pipelines {
        for processor_id in distinct(&pipeline.processors) {
            // Input tags are `<pipeline>.<receiver>`, so `a.*` also matches the
            // inputs of a pipeline named `a.b`
            let match_tag = format!("{name}.*");
            if let Some(processor) = logging.processors.get(processor_id) {
                sections.push(render_processor(match_tag, processor_id, processor)?);
            } else if ctx.builtin.library_processor(processor_id).is_some() {
                let filter = ParserFilter {
                    match_tag,
                    key_name: DEFAULT_PARSE_FIELD.to_owned(),
                    parser: processor_id.to_owned(),
                };
                sections.push(filter.render()?);
            }
        }
    }

    // Log names of every exported pipeline input, grouped by exporter
    let mut exported: IndexMap<&str, IndexSet<&str>> = IndexMap::new();
    let mut tagged: Vec<(String, &str)> = Vec::new();
    for (name, pipeline) in &pipelines {
        let exporters: Vec<_> = distinct(&pipeline.exporters)
            .filter(|id| logging.exporters.contains(id))
            .collect();
        if exporters.is_empty() {
            continue;
        }
        for receiver_id in distinct(&pipeline.receivers) {
            tagged.push((format!("{name}.{receiver_id}"), receiver_id));
            for exporter_id in &exporters {
                exported.entry(*exporter_id).or_default().insert(receiver_id);
            }
        }
    }

    for (tag, log_name) in &tagged {
        sections.push(Modify::add_log_name(tag, *log_name).render()?);
    }
    for (tag, _) in &tagged {
        sections.push(RewriteTag { match_tag: tag.clone() }.render()?);
    }
    let log_names: IndexSet<&str> = tagged.iter().map(|(_, log_name)| *log_name).collect();
    for log_name in &log_names {
        sections.push(Modify::remove_log_name(*log_name).render()?);
    }

    let workers = if ctx.platform.is_windows() { 1 } else { 8 };
    let user_agent = ctx.user_agent("Logging");

    let self_output = Stackdriver {
        log_names: vec![SELF_LOG_TAG.to_owned(), METRICS_LOG_TAG.to_owned()],
        user_agent: user_agent.clone(),
        workers,
    };
    sections.push(self_output.render()?);

    for log_names in exported.values() {
        let output = Stackdriver {
            log_names: log_names.iter().map(|name| (*name).to_owned()).collect(),
            user_agent: user_agent.clone(),
            workers,
        };
        sections.push(output.render()?);
    }

    tracing::debug!(sections = sections.len(), "rendered log-shipping main configuration");

    Ok(FluentBitConfig {
        main: sections.join("\n"),
        parsers: render_parsers(ctx, logging, &pipelines)?,
    })
}

fn render_input(
    ctx: &RenderContext<'_>,
    pipeline: &str,
    receiver_id: &str,
    receiver: &LoggingReceiver,
) -> Result<String, RenderError> {
    let tag = format!("{pipeline}.{receiver_id}");
    let db = ctx.paths.buffer(&format!("{pipeline}_{receiver_id}"));

    match receiver {
        LoggingReceiver::Files(files) => Tail {
            tag,
            include_paths: files.include_paths.clone(),
            exclude_paths: files.exclude_paths.clone(),
            db,
        }
        .render(),
        LoggingReceiver::Syslog(syslog) => Syslog {
            tag,
            mode: syslog.transport_protocol.clone().unwrap_or_default(),
            listen: syslog.listen_host.clone().unwrap_or_default(),
            port: syslog.listen_port.unwrap_or_default(),
            parser: syslog.library_parser().to_owned(),
        }
        .render(),
        LoggingReceiver::WindowsEventLog(winlog) => Winlog {
            tag,
            channels: winlog.channels.clone(),
            db,
        }
        .render(),
    }
}

fn render_processor(match_tag: String, id: &str, processor: &LoggingProcessor) -> Result<String, RenderError> {
    match processor {
        LoggingProcessor::ParseJson(parse) => ParserFilter {
            match_tag,
            key_name: key_name(parse.field.as_deref())?,
            parser: id.to_owned(),
        }
        .render(),
        LoggingProcessor::ParseRegex(parse) => ParserFilter {
            match_tag,
            key_name: key_name(parse.field.as_deref())?,
            parser: id.to_owned(),
        }
        .render(),
        LoggingProcessor::ExcludeLogs(exclude) => {
            let rules = exclude
                .match_any
                .iter()
                .map(String::as_str)
                .map(exclude_rule)
                .collect::<Result<Vec<_>, _>>()?;
            GrepExclude { match_tag, rules }.render()
        }
        LoggingProcessor::ModifyFields(modify) => Modify {
            match_tag,
            operations: modify_operations(modify)?,
        }
        .render(),
    }
}

/// Record key a parse processor reads
fn key_name(field: Option<&str>) -> Result<String, RenderError> {
    parse_key(field).map_err(|reason| RenderError::InvalidField {
        plugin: ParserFilter::NAME,
        field: "Key_Name",
        reason,
    })
}

fn exclude_rule(expression: &str) -> Result<String, RenderError> {
    let parsed = ExcludeExpression::parse(expression).map_err(|reason| RenderError::InvalidField {
        plugin: GrepExclude::NAME,
        field: "Exclude",
        reason,
    })?;

    Ok(format!("{} {}", parsed.field.record_accessor(), parsed.pattern()))
}

fn modify_operations(modify: &ModifyFields) -> Result<Vec<ModifyOperation>, RenderError> {
    let top_level = |value: &str| {
        FieldPath::parse(value)
            .ok()
            .filter(FieldPath::is_top_level)
            .map(|path| path.record_accessor())
            .ok_or_else(|| RenderError::InvalidField {
                plugin: Modify::NAME,
                field: "Operation",
                reason: format!("{value:?} is not a top-level field"),
            })
    };

    let mut operations = Vec::with_capacity(modify.fields.len());
    for (destination, field) in &modify.fields {
        let to = top_level(destination)?;
        let operation = match field {
            ModifyField {
                move_from: Some(from), ..
            } => ModifyOperation::Rename {
                from: top_level(from)?,
                to,
            },
            ModifyField {
                copy_from: Some(from), ..
            } => ModifyOperation::Copy {
                from: top_level(from)?,
                to,
            },
            ModifyField {
                static_value: Some(value),
                ..
            } => ModifyOperation::Set {
                key: to,
                value: value.clone(),
            },
            ModifyField { .. } => {
                return Err(RenderError::InvalidField {
                    plugin: Modify::NAME,
                    field: "Operation",
                    reason: format!("{destination:?} has no source"),
                });
            }
        };
        operations.push(operation);
    }
    Ok(operations)
}

/// Library parsers first, then the parse processors pipelines use, in declaration order
fn render_parsers(
    ctx: &RenderContext<'_>,
    logging: &LoggingConfig,
    pipelines: &[(&String, &Pipeline)],
) -> Result<String, RenderError> {
    let mut sections = Vec::new();

    for parser in &ctx.builtin.library {
        sections.push(RegexParser::from(parser).render()?);
    }

    let referenced: IndexSet<&str> = pipelines
        .iter()
        .flat_map(|(_, pipeline)| pipeline.processors.iter().map(String::as_str))
        .collect();

    for (id, processor) in &logging.processors {
        if !referenced.contains(id.as_str()) {
            continue;
        }
        match processor {
            LoggingProcessor::ParseJson(parse) => sections.push(
                JsonParser {
                    name: id.clone(),
                    time_key: parse.time_key.clone(),
                    time_format: parse.time_format.clone(),
                }
                .render()?,
            ),
            LoggingProcessor::ParseRegex(parse) => sections.push(
                RegexParser {
                    name: id.clone(),
                    regex: parse.regex.clone().unwrap_or_default(),
                    time_key: parse.time_key.clone(),
                    time_format: parse.time_format.clone(),
                }
                .render()?,
            ),
            LoggingProcessor::ExcludeLogs(_) | LoggingProcessor::ModifyFields(_) => {}
        }
    }

    Ok(sections.join("\n"))
}

/// Distinct identifiers of a reference list, first occurrence order
fn distinct(ids: &[String]) -> impl Iterator<Item = &str> {
    let unique: IndexSet<&str> = ids.iter().map(String::as_str).collect();
    unique.into_iter()
}
