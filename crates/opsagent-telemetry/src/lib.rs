//! Process logging for the opsagent tools
//!
//! Installs a `tracing-subscriber` registry with an [`EnvFilter`] and a
//! human-readable or JSON formatting layer. Output goes to stderr so that
//! anything a tool prints to stdout stays machine readable.
//!
//! [`EnvFilter`]: tracing_subscriber::EnvFilter

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Format of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Filter used when the given directive does not parse
const FALLBACK_FILTER: &str = "info";

fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
}

/// Initialize process logging
///
/// `log_filter` takes `EnvFilter` directives such as `info` or
/// `opsagent_config=debug,warn`; an invalid directive falls back to `info`.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(format: LogFormat, log_filter: &str) -> anyhow::Result<()> {
    let filter = env_filter(log_filter);

    match format {
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);

            tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_current_span(false);

            tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()?;
        }
    }

    Ok(())
}
