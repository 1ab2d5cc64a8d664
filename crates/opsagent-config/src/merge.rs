//! Overlay of user configuration onto the built-in defaults

use crate::{BuiltinConfig, Declared, LoggingConfig, MetricsConfig, Service, UnifiedConfig};

/// Which domains had their built-in pipelines replaced by user pipelines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultPipelineOverrides {
    pub logging: bool,
    pub metrics: bool,
}

/// Result of [`merge`]
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    /// Effective configuration
    pub config: UnifiedConfig,
    /// Built-in pipelines that were dropped
    pub overrides: DefaultPipelineOverrides,
}

/// Merge a user document over the built-in configuration
///
/// Components are unioned: built-in entries come first and a user entry
/// with the same identifier replaces the built-in one in place. Pipelines
/// are all-or-nothing per domain: once the user declares any pipeline, none
/// of the built-in pipelines of that domain survive. The log level is taken
/// from the user when set.
///
/// Neither input is modified.
pub fn merge(user: &UnifiedConfig, builtin: &BuiltinConfig) -> Merged {
    let defaults = &builtin.config;

    let (logging, logging_overridden) = merge_domain(
        defaults.logging.as_ref(),
        user.logging.as_ref(),
        |domain| domain.service.as_ref(),
        merge_logging,
    );
    let (metrics, metrics_overridden) = merge_domain(
        defaults.metrics.as_ref(),
        user.metrics.as_ref(),
        |domain| domain.service.as_ref(),
        merge_metrics,
    );

    tracing::debug!(
        logging_overridden,
        metrics_overridden,
        "merged user configuration over built-in defaults"
    );

    Merged {
        config: UnifiedConfig {
            logging,
            metrics,
            combined: user.combined.clone(),
        },
        overrides: DefaultPipelineOverrides {
            logging: logging_overridden,
            metrics: metrics_overridden,
        },
    }
}

fn merge_domain<T: Clone>(
    builtin: Option<&T>,
    user: Option<&T>,
    service: fn(&T) -> Option<&Service>,
    combine: fn(&T, &T) -> T,
) -> (Option<T>, bool) {
    let overridden = user
        .and_then(service)
        .is_some_and(|service| !service.pipelines.is_empty());

    let merged = match (builtin, user) {
        (Some(builtin), Some(user)) => Some(combine(builtin, user)),
        (Some(only), None) | (None, Some(only)) => Some(only.clone()),
        (None, None) => None,
    };

    (merged, overridden)
}

fn union<T: Clone>(builtin: &Declared<T>, user: &Declared<T>) -> Declared<T> {
    let mut merged = builtin.clone();
    for (id, value) in user {
        merged.insert(id.clone(), value.clone());
    }
    merged
}

fn merge_service(builtin: Option<&Service>, user: Option<&Service>) -> Option<Service> {
    match (builtin, user) {
        (None, None) => None,
        (builtin, user) => {
            let user_pipelines = user.filter(|service| !service.pipelines.is_empty());
            let pipelines = user_pipelines
                .or(builtin)
                .map(|service| service.pipelines.clone())
                .unwrap_or_default();
            let log_level = user.and_then(|service| service.log_level).or_else(|| builtin.and_then(|service| service.log_level));

            Some(Service { log_level, pipelines })
        }
    }
}

fn merge_logging(builtin: &LoggingConfig, user: &LoggingConfig) -> LoggingConfig {
    LoggingConfig {
        receivers: union(&builtin.receivers, &user.receivers),
        processors: union(&builtin.processors, &user.processors),
        exporters: union(&builtin.exporters, &user.exporters),
        service: merge_service(builtin.service.as_ref(), user.service.as_ref()),
    }
}

fn merge_metrics(builtin: &MetricsConfig, user: &MetricsConfig) -> MetricsConfig {
    MetricsConfig {
        receivers: union(&builtin.receivers, &user.receivers),
        processors: union(&builtin.processors, &user.processors),
        exporters: union(&builtin.exporters, &user.exporters),
        service: merge_service(builtin.service.as_ref(), user.service.as_ref()),
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::{DEFAULT_PIPELINE, IntervalReceiver, LogLevel, MetricsReceiver, Os, Pipeline, PlatformFacts};

    fn builtin() -> BuiltinConfig {
        BuiltinConfig::for_platform(&PlatformFacts::new(Os::Linux))
    }

    fn user(yaml: &str) -> UnifiedConfig {
        UnifiedConfig::from_yaml(yaml).unwrap()
    }

    #[test]
    fn empty_document_yields_defaults() {
        let builtin = builtin();
        let merged = merge(&UnifiedConfig::default(), &builtin);

        assert_eq!(merged.config.logging, builtin.config.logging);
        assert_eq!(merged.config.metrics, builtin.config.metrics);
        assert_eq!(merged.overrides, DefaultPipelineOverrides::default());
    }

    #[test]
    fn user_pipeline_replaces_every_default_pipeline() {
        let merged = merge(
            &user(indoc! {"
                logging:
                  receivers:
                    app:
                      type: files
                      include_paths: [/var/log/app.log]
                  service:
                    pipelines:
                      mine:
                        receivers: [app]
                        exporters: [google]
            "}),
            &builtin(),
        );

        let logging = merged.config.logging.unwrap();
        let pipelines: Vec<_> = logging.service.as_ref().unwrap().pipelines.ids().collect();
        assert_eq!(pipelines, ["mine"]);
        assert!(merged.overrides.logging);
        assert!(!merged.overrides.metrics);

        // Built-in components stay declared even when their pipeline is gone
        let receivers: Vec<_> = logging.receivers.ids().collect();
        assert_eq!(receivers, ["syslog", "app"]);
    }

    #[test]
    fn user_component_replaces_builtin_in_place() {
        let merged = merge(
            &user(indoc! {"
                metrics:
                  receivers:
                    hostmetrics:
                      type: hostmetrics
                      collection_interval: 30s
            "}),
            &builtin(),
        );

        let metrics = merged.config.metrics.unwrap();
        assert_eq!(
            metrics.receivers.get("hostmetrics"),
            Some(&MetricsReceiver::Hostmetrics(IntervalReceiver {
                collection_interval: "30s".to_owned(),
            }))
        );
        let pipeline = metrics.service.unwrap().pipelines.get(DEFAULT_PIPELINE).cloned();
        assert_eq!(pipeline, Some(Pipeline::new(&["hostmetrics"], &["metrics_filter"], &["google"])));
        assert!(!merged.overrides.metrics);
    }

    #[test]
    fn log_level_without_pipelines_keeps_defaults() {
        let merged = merge(
            &user(indoc! {"
                logging:
                  service:
                    log_level: debug
            "}),
            &builtin(),
        );

        let service = merged.config.logging.unwrap().service.unwrap();
        assert_eq!(service.log_level, Some(LogLevel::Debug));
        assert!(service.pipelines.contains(DEFAULT_PIPELINE));
        assert!(!merged.overrides.logging);
    }

    #[test]
    fn combined_comes_from_user_only() {
        let merged = merge(
            &user(indoc! {"
                combined:
                  receivers:
                    otlp:
                      type: otlp
            "}),
            &builtin(),
        );
        assert!(merged.config.combined.unwrap().receivers.contains("otlp"));
    }

    #[test]
    fn domains_without_defaults_take_user_values() {
        let user = user(indoc! {"
            logging:
              receivers:
                app:
                  type: files
                  include_paths: [/a]
              service:
                pipelines:
                  p:
                    receivers: [app]
        "});
        let merged = merge(&user, &BuiltinConfig::empty());

        assert_eq!(merged.config.logging, user.logging);
        assert!(merged.config.metrics.is_none());
        assert!(merged.overrides.logging);
    }

    #[test]
    fn merge_leaves_inputs_untouched() {
        let builtin = builtin();
        let before = builtin.clone();
        let doc = user("logging:\n  service:\n    pipelines:\n      p:\n        receivers: [syslog]\n");
        let _ = merge(&doc, &builtin);
        assert_eq!(builtin, before);
    }
}
