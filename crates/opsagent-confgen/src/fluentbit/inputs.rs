use std::net::IpAddr;

use opsagent_config::{DEFAULT_MESSAGE_PARSER, TRANSPORT_PROTOCOLS};

use super::{Fields, Plugin};
use crate::RenderError;

/// Library parsers a syslog input may decode messages with
pub const SYSLOG_LIBRARY_PARSERS: &[&str] = &[DEFAULT_MESSAGE_PARSER, "lib:syslog-rfc5424", "lib:syslog-rfc3164"];

/// `tail` input following a set of files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tail {
    pub tag: String,
    pub include_paths: Vec<String>,
    pub exclude_paths: Vec<String>,
    /// Offset database path
    pub db: String,
}

impl Plugin for Tail {
    const NAME: &'static str = "tail";
    const TEMPLATE: &'static str = r"[INPUT]
    Name              tail
    DB                {{ DB }}
    Path              {{ Path }}
    Tag               {{ Tag }}
    Read_from_Head    True
    Buffer_Chunk_Size 512k
    Buffer_Max_Size   5M
    Key               message
    Rotate_Wait       30
    Skip_Long_Lines   On
    Exclude_Path      {{ ExcludePath | optional }}
    storage.type      filesystem
    Mem_Buf_Limit     10M";

    fn fields(&self) -> Result<Fields, RenderError> {
        Ok(Fields::new()
            .text("DB", &self.db)
            .list("Path", &self.include_paths)
            .text("Tag", &self.tag)
            .list("ExcludePath", &self.exclude_paths))
    }
}

/// `syslog` input listening on a socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Syslog {
    pub tag: String,
    /// `tcp` or `udp`
    pub mode: String,
    pub listen: String,
    pub port: u32,
    pub parser: String,
}

impl Plugin for Syslog {
    const NAME: &'static str = "syslog";
    const TEMPLATE: &'static str = r"[INPUT]
    Name          syslog
    Mode          {{ Mode }}
    Listen        {{ Listen }}
    Tag           {{ Tag }}
    Port          {{ Port }}
    Parser        {{ Parser }}
    storage.type  filesystem
    Mem_Buf_Limit 10M";

    fn fields(&self) -> Result<Fields, RenderError> {
        if !TRANSPORT_PROTOCOLS.contains(&self.mode.as_str()) {
            return Err(RenderError::InvalidValue {
                plugin: Self::NAME,
                field: "Mode",
                value: self.mode.clone(),
                allowed: TRANSPORT_PROTOCOLS,
            });
        }
        if self.listen.parse::<IpAddr>().is_err() {
            return Err(RenderError::InvalidIp {
                plugin: Self::NAME,
                field: "Listen",
                value: self.listen.clone(),
            });
        }
        if self.port == 0 {
            return Err(RenderError::NonPositive {
                plugin: Self::NAME,
                field: "Port",
                value: self.port,
            });
        }
        if !SYSLOG_LIBRARY_PARSERS.contains(&self.parser.as_str()) {
            return Err(RenderError::InvalidValue {
                plugin: Self::NAME,
                field: "Parser",
                value: self.parser.clone(),
                allowed: SYSLOG_LIBRARY_PARSERS,
            });
        }

        Ok(Fields::new()
            .text("Mode", &self.mode)
            .text("Listen", &self.listen)
            .text("Tag", &self.tag)
            .text("Port", self.port.to_string())
            .text("Parser", &self.parser))
    }
}

/// `winlog` input reading Windows event log channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Winlog {
    pub tag: String,
    pub channels: Vec<String>,
    pub db: String,
}

impl Plugin for Winlog {
    const NAME: &'static str = "winlog";
    const TEMPLATE: &'static str = r"[INPUT]
    Name         winlog
    Tag          {{ Tag }}
    Channels     {{ Channels }}
    Interval_Sec 1
    DB           {{ DB }}";

    fn fields(&self) -> Result<Fields, RenderError> {
        Ok(Fields::new()
            .text("Tag", &self.tag)
            .list("Channels", &self.channels)
            .text("DB", &self.db))
    }
}
