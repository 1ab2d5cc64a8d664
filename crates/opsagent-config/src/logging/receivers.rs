use serde::{Deserialize, Serialize};

use crate::declared::{Declaration, admit_typed};

/// Log source declaration, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoggingReceiver {
    /// Tail local files
    Files(FilesReceiver),
    /// Listen for syslog messages over the network
    Syslog(SyslogReceiver),
    /// Read Windows event log channels
    WindowsEventLog(WindowsEventLogReceiver),
}

impl LoggingReceiver {
    /// Discriminators accepted under `type`
    pub const TYPES: &'static [&'static str] = &["files", "syslog", "windows_event_log"];

    /// Discriminator of this declaration
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Files(_) => "files",
            Self::Syslog(_) => "syslog",
            Self::WindowsEventLog(_) => "windows_event_log",
        }
    }

    /// Port this receiver listens on, for network receivers
    pub const fn listen_port(&self) -> Option<u32> {
        match self {
            Self::Syslog(syslog) => syslog.listen_port,
            Self::Files(_) | Self::WindowsEventLog(_) => None,
        }
    }

    /// Whether the receiver accepts data over the network
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Syslog(_))
    }
}

impl Declaration for LoggingReceiver {
    const KIND: &'static str = "logging receiver";

    fn admit(id: &str, raw: serde_yaml::Value) -> Result<Self, String> {
        admit_typed(Self::KIND, Self::TYPES, id, raw)
    }
}

/// `files` receiver
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilesReceiver {
    /// Glob patterns of files to tail
    #[serde(default)]
    pub include_paths: Vec<String>,
    /// Glob patterns of files to skip
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_paths: Vec<String>,
}

/// `syslog` receiver
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SyslogReceiver {
    /// `tcp` or `udp`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transport_protocol: Option<String>,
    /// IP address to bind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_host: Option<String>,
    /// Port to bind
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<u32>,
    /// Message format: `default`, `rfc5424` or `rfc3164`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parser: Option<String>,
}

/// Accepted `transport_protocol` values
pub const TRANSPORT_PROTOCOLS: &[&str] = &["tcp", "udp"];

/// Accepted syslog `parser` values
pub const SYSLOG_PARSERS: &[&str] = &["default", "rfc5424", "rfc3164"];

impl SyslogReceiver {
    /// Library parser applied to incoming messages
    pub fn library_parser(&self) -> &'static str {
        match self.parser.as_deref() {
            Some("rfc5424") => "lib:syslog-rfc5424",
            Some("rfc3164") => "lib:syslog-rfc3164",
            _ => "lib:default_message_parser",
        }
    }
}

/// `windows_event_log` receiver
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WindowsEventLogReceiver {
    /// Event log channels to read
    #[serde(default)]
    pub channels: Vec<String>,
}
