//! Accumulating checks over decoded metadata documents

use std::collections::HashSet;

use opsagent_config::{ConfigPath, Declared};
use regex::Regex;
use strum::VariantNames;

use crate::{
    ExpectedLog, ExpectedMetric, ExpectedMetricsContainer, IntegrationMetadata, LogFieldType, MONITORED_RESOURCES,
    MetadataErrorKind, MetadataErrors, MetricKind, MetricPlatform, ValueType,
};

const CURLY_QUOTES: &[char] = &['\u{2018}', '\u{2019}', '\u{201c}', '\u{201d}'];

impl IntegrationMetadata {
    /// Check the document, collecting every problem
    ///
    /// # Errors
    ///
    /// Returns all problems found, each with the path of the offending node
    pub fn validate(&self) -> Result<(), MetadataErrors> {
        let mut errors = MetadataErrors::default();
        let root = ConfigPath::root("metadata");

        required(&mut errors, &root, "app_url", &self.app_url);
        if !self.app_url.is_empty()
            && let Err(e) = url::Url::parse(&self.app_url)
        {
            errors.push(&root.join("app_url"), MetadataErrorKind::InvalidUrl {
                field: "app_url",
                reason: e.to_string(),
            });
        }

        for (field, value) in [
            ("short_name", self.short_name.as_str()),
            ("long_name", self.long_name.as_str()),
            ("description", self.description.as_str()),
        ] {
            required(&mut errors, &root, field, value);
            no_curly_quotes(&mut errors, &root, field, value);
        }
        if let Some(troubleshoot) = &self.troubleshoot {
            no_curly_quotes(&mut errors, &root, "troubleshoot", troubleshoot);
        }

        self.validate_configuration_options(&mut errors, &root);
        validate_versions(&mut errors, &root, &self.supported_app_version);
        validate_metrics(&mut errors, &root, &self.expected_metrics);

        for (i, log) in self.expected_logs.iter().enumerate() {
            validate_log(&mut errors, &root.join(format!("expected_logs[{i}]")), log);
        }

        errors.into_result()
    }

    fn validate_configuration_options(&self, errors: &mut MetadataErrors, root: &ConfigPath) {
        let path = root.join("configuration_options");
        let Some(options) = &self.configuration_options else {
            errors.push(&path, MetadataErrorKind::MissingField {
                field: "configuration_options",
            });
            return;
        };

        if options.logs.is_empty() && options.metrics.is_empty() {
            errors.push(&path, MetadataErrorKind::NoConfigurationOptions);
        }

        for (domain, inputs) in [("logs", &options.logs), ("metrics", &options.metrics)] {
            for (i, input) in inputs.iter().enumerate() {
                let input_path = path.join(format!("{domain}[{i}]"));
                required(errors, &input_path, "type", &input.component_type);
                if input.fields.is_empty() {
                    errors.push(&input_path, MetadataErrorKind::MissingField { field: "fields" });
                }
                for (j, field) in input.fields.iter().enumerate() {
                    let field_path = input_path.join(format!("fields[{j}]"));
                    required(errors, &field_path, "name", &field.name);
                    required(errors, &field_path, "description", &field.description);
                    no_curly_quotes(errors, &field_path, "description", &field.description);
                }
            }
        }
    }
}

impl ExpectedMetricsContainer {
    /// Check the expected metrics, collecting every problem
    ///
    /// # Errors
    ///
    /// Returns all problems found
    pub fn validate(&self) -> Result<(), MetadataErrors> {
        let mut errors = MetadataErrors::default();
        validate_metrics(&mut errors, &ConfigPath::root("metadata"), &self.expected_metrics);
        errors.into_result()
    }
}

fn validate_versions(errors: &mut MetadataErrors, root: &ConfigPath, versions: &[String]) {
    let path = root.join("supported_app_version");
    if versions.is_empty() {
        errors.push(&path, MetadataErrorKind::MissingField {
            field: "supported_app_version",
        });
    }

    let mut seen = HashSet::new();
    for version in versions {
        if !seen.insert(version) {
            errors.push(&path, MetadataErrorKind::DuplicateVersion {
                version: version.clone(),
            });
        }
    }
}

fn validate_metrics(errors: &mut MetadataErrors, root: &ConfigPath, metrics: &[ExpectedMetric]) {
    if metrics.is_empty() {
        return;
    }

    let path = root.join("expected_metrics");
    let representatives = metrics.iter().filter(|m| m.representative).count();
    if representatives != 1 {
        errors.push(&path, MetadataErrorKind::RepresentativeCount { count: representatives });
    }

    let mut seen = HashSet::new();
    for (i, metric) in metrics.iter().enumerate() {
        let metric_path = root.join(format!("expected_metrics[{i}]"));
        if !metric.metric_type.is_empty() && !seen.insert(metric.metric_type.as_str()) {
            errors.push(&metric_path, MetadataErrorKind::DuplicateMetric {
                metric_type: metric.metric_type.clone(),
            });
        }
        validate_metric(errors, &metric_path, metric);
    }
}

fn validate_metric(errors: &mut MetadataErrors, path: &ConfigPath, metric: &ExpectedMetric) {
    required(errors, path, "type", &metric.metric_type);

    if metric.value_type().is_none() {
        one_of(errors, path, "value_type", &metric.value_type, ValueType::VARIANTS);
    }
    if metric.kind().is_none() {
        one_of(errors, path, "kind", &metric.kind, MetricKind::VARIANTS);
    }
    if !MONITORED_RESOURCES.contains(&metric.monitored_resource.as_str()) {
        one_of(errors, path, "monitored_resource", &metric.monitored_resource, MONITORED_RESOURCES);
    }
    if let Some(platform) = &metric.platform
        && metric.platform().is_none()
    {
        one_of(errors, path, "platform", platform, MetricPlatform::VARIANTS);
    }

    if metric.representative {
        if metric.optional {
            errors.push(path, MetadataErrorKind::RepresentativeConflict { field: "optional" });
        }
        if metric.platform.is_some() {
            errors.push(path, MetadataErrorKind::RepresentativeConflict { field: "platform" });
        }
    }

    validate_labels(errors, &path.join("labels"), &metric.labels);
}

fn validate_labels(errors: &mut MetadataErrors, path: &ConfigPath, labels: &Declared<String>) {
    for label in labels.duplicates() {
        errors.push(path, MetadataErrorKind::DuplicateLabel { label: label.clone() });
    }
    for (key, pattern) in labels {
        compiles(errors, path, key, pattern);
    }
}

fn validate_log(errors: &mut MetadataErrors, path: &ConfigPath, log: &ExpectedLog) {
    required(errors, path, "log_name", &log.log_name);
    if log.fields.is_empty() {
        errors.push(path, MetadataErrorKind::MissingField { field: "fields" });
    }

    for (i, field) in log.fields.iter().enumerate() {
        let field_path = path.join(format!("fields[{i}]"));
        required(errors, &field_path, "name", &field.name);
        no_curly_quotes(errors, &field_path, "description", &field.description);

        if field.field_type.parse::<LogFieldType>().is_err() {
            if field.field_type.is_empty() {
                errors.push(&field_path, MetadataErrorKind::MissingField { field: "type" });
            } else {
                one_of(errors, &field_path, "type", &field.field_type, LogFieldType::VARIANTS);
            }
        }

        if let Some(pattern) = &field.value_regex {
            compiles(errors, &field_path, "value_regex", pattern);
        }
    }
}

fn required(errors: &mut MetadataErrors, path: &ConfigPath, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.push(path, MetadataErrorKind::MissingField { field });
    }
}

fn one_of(errors: &mut MetadataErrors, path: &ConfigPath, field: &'static str, value: &str, allowed: &'static [&'static str]) {
    if value.is_empty() {
        errors.push(path, MetadataErrorKind::MissingField { field });
    } else {
        errors.push(path, MetadataErrorKind::InvalidValue {
            field,
            value: value.to_owned(),
            allowed,
        });
    }
}

fn no_curly_quotes(errors: &mut MetadataErrors, path: &ConfigPath, field: &'static str, value: &str) {
    if value.contains(CURLY_QUOTES) {
        errors.push(path, MetadataErrorKind::CurlyQuotes { field });
    }
}

fn compiles(errors: &mut MetadataErrors, path: &ConfigPath, field: &str, pattern: &str) {
    if let Err(e) = Regex::new(pattern) {
        errors.push(path, MetadataErrorKind::InvalidRegex {
            field: field.to_owned(),
            reason: e.to_string(),
        });
    }
}
