//! Engine configuration generation
//!
//! Renders a merged unified configuration into the log-shipping engine's
//! main and parser files and the metrics engine's collector YAML. The
//! [`Generator`] ties decoding, validation, merging and rendering together.

#![allow(clippy::must_use_candidate)]

mod error;
pub mod fluentbit;
mod generator;
pub mod otel;

use std::path::{Path, PathBuf};

use opsagent_config::{BuiltinConfig, PlatformFacts};

pub use error::{GenerateError, RenderError};
pub use generator::{Generated, Generator};

/// Directories the engines write logs and state to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paths {
    /// Where the agent's own log files live
    pub logs_dir: PathBuf,
    /// Where the log-shipping engine keeps buffers and offsets
    pub state_dir: PathBuf,
}

impl Paths {
    pub fn new(logs_dir: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            logs_dir: logs_dir.into(),
            state_dir: state_dir.into(),
        }
    }

    /// Buffer or offset database for one input
    pub fn buffer(&self, name: &str) -> String {
        display(&self.state_dir.join("buffers").join(name))
    }

    /// Log file written by one of the agent's engines
    pub fn subagent_log(&self, file: &str) -> String {
        display(&self.logs_dir.join("subagents").join(file))
    }
}

impl Default for Paths {
    fn default() -> Self {
        Self::new("/var/log/google-cloud-ops-agent", "/var/lib/google-cloud-ops-agent/fluent-bit")
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}

/// Everything besides the configuration itself that rendering depends on
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub platform: &'a PlatformFacts,
    pub builtin: &'a BuiltinConfig,
    pub paths: &'a Paths,
    /// Version reported in user agents
    pub version: &'a str,
}

impl RenderContext<'_> {
    /// User agent string sent by an engine
    pub fn user_agent(&self, product: &str) -> String {
        format!(
            "Google-Cloud-Ops-Agent-{product}/{} (BuildDistro={};Platform={};ShortName={};ShortVersion={})",
            self.version,
            self.platform.build_distro,
            self.platform.os,
            self.platform.short_name,
            self.platform.short_version,
        )
    }
}
