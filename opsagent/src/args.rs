use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use opsagent_confgen::fluentbit::{MAIN_CONFIG_FILE, PARSER_CONFIG_FILE};
use opsagent_confgen::otel::OTEL_CONFIG_FILE;
use opsagent_config::PlatformFacts;
use opsagent_telemetry::LogFormat;

/// Ops agent configuration generator
#[derive(Debug, Parser)]
#[command(
    name = "opsagent",
    about = "Generate fluent-bit and OpenTelemetry collector configuration from the unified ops agent config"
)]
pub struct Args {
    /// Path to the unified configuration file
    #[arg(short, long = "in", default_value = "/etc/google-cloud-ops-agent/config.yaml", env = "OPSAGENT_CONFIG")]
    pub input: PathBuf,

    /// Directory the generated files are written to
    #[arg(short, long = "out", env = "OPSAGENT_OUT", required_unless_present = "print_effective_config")]
    pub output: Option<PathBuf>,

    /// Only write the files of one engine
    #[arg(long, value_enum, env = "OPSAGENT_SERVICE")]
    pub service: Option<Service>,

    /// Directory the agent writes its own logs to
    #[arg(long, default_value = "/var/log/google-cloud-ops-agent", env = "OPSAGENT_LOGS_DIR")]
    pub logs: PathBuf,

    /// Directory the log-shipping engine keeps its state in
    #[arg(long, default_value = "/var/lib/google-cloud-ops-agent/fluent-bit", env = "OPSAGENT_STATE_DIR")]
    pub state: PathBuf,

    /// Platform to generate for (`linux`, `linux_gpu` or `windows`); defaults to the current host
    #[arg(long, env = "OPSAGENT_PLATFORM")]
    pub platform: Option<PlatformFacts>,

    /// Format of this tool's own log lines (`text` or `json`)
    #[arg(long, default_value = "text", env = "OPSAGENT_LOG_FORMAT")]
    pub log_format: LogFormat,

    /// Filter directives for this tool's own log lines
    #[arg(long, default_value = "info", env = "OPSAGENT_LOG")]
    pub log_filter: String,

    /// Print the merged configuration with secrets redacted instead of generating files
    #[arg(long)]
    pub print_effective_config: bool,
}

/// Engine whose files should be written
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Service {
    Fluentbit,
    Otel,
}

impl Service {
    /// Names of the files this engine reads
    pub const fn files(self) -> &'static [&'static str] {
        match self {
            Self::Fluentbit => &[MAIN_CONFIG_FILE, PARSER_CONFIG_FILE],
            Self::Otel => &[OTEL_CONFIG_FILE],
        }
    }
}
