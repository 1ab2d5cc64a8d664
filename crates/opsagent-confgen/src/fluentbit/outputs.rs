use opsagent_config::LogLevel;

use super::{Fields, Plugin};
use crate::RenderError;

/// Engine-wide `[SERVICE]` section
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Service {
    pub log_level: LogLevel,
}

impl Plugin for Service {
    const NAME: &'static str = "service";
    const TEMPLATE: &'static str = r"[SERVICE]
    Flush                     1
    Daemon                    off
    Log_Level                 {{ LogLevel }}
    HTTP_Server               On
    HTTP_Listen               0.0.0.0
    HTTP_PORT                 2020
    storage.sync              normal
    storage.checksum          on
    storage.backlog.mem_limit 50M
    storage.metrics           on
    storage.max_chunks_up     128";

    fn fields(&self) -> Result<Fields, RenderError> {
        Ok(Fields::new().text("LogLevel", self.log_level.to_string()))
    }
}

/// `stackdriver` output shipping records whose tag is one of `log_names`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stackdriver {
    pub log_names: Vec<String>,
    pub user_agent: String,
    pub workers: u32,
}

impl Stackdriver {
    /// Anchored alternation over the escaped log names
    pub fn match_regex(&self) -> String {
        let names: Vec<String> = self.log_names.iter().map(|name| regex::escape(name)).collect();
        format!("^({})$", names.join("|"))
    }
}

impl Plugin for Stackdriver {
    const NAME: &'static str = "stackdriver";
    const TEMPLATE: &'static str = r"[OUTPUT]
    Name              stackdriver
    Match_Regex       {{ MatchRegex }}
    resource          gce_instance
    stackdriver_agent {{ UserAgent }}
    workers           {{ Workers }}
    Retry_Limit       3
    tls               On
    tls.verify        Off";

    fn fields(&self) -> Result<Fields, RenderError> {
        if self.log_names.is_empty() {
            return Err(RenderError::EmptyField {
                plugin: Self::NAME,
                field: "MatchRegex".to_owned(),
            });
        }
        if self.workers == 0 {
            return Err(RenderError::NonPositive {
                plugin: Self::NAME,
                field: "Workers",
                value: self.workers,
            });
        }

        Ok(Fields::new()
            .text("MatchRegex", self.match_regex())
            .text("UserAgent", &self.user_agent)
            .text("Workers", self.workers.to_string()))
    }
}
