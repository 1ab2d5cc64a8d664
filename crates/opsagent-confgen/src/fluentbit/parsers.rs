use opsagent_config::LibraryParser;

use super::{Fields, Plugin};
use crate::RenderError;

/// `[PARSER]` decoding a JSON string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonParser {
    pub name: String,
    pub time_key: Option<String>,
    pub time_format: Option<String>,
}

impl Plugin for JsonParser {
    const NAME: &'static str = "json parser";
    const TEMPLATE: &'static str = r"[PARSER]
    Name        {{ Name }}
    Format      json
    Time_Key    {{ TimeKey | optional }}
    Time_Format {{ TimeFormat | optional }}";

    fn fields(&self) -> Result<Fields, RenderError> {
        Ok(Fields::new()
            .text("Name", &self.name)
            .maybe("TimeKey", self.time_key.as_deref())
            .maybe("TimeFormat", self.time_format.as_deref()))
    }
}

/// `[PARSER]` matching a regular expression with named captures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegexParser {
    pub name: String,
    pub regex: String,
    pub time_key: Option<String>,
    pub time_format: Option<String>,
}

impl From<&LibraryParser> for RegexParser {
    fn from(parser: &LibraryParser) -> Self {
        Self {
            name: parser.name.to_owned(),
            regex: parser.regex.to_owned(),
            time_key: parser.time_key.map(str::to_owned),
            time_format: parser.time_format.map(str::to_owned),
        }
    }
}

impl Plugin for RegexParser {
    const NAME: &'static str = "regex parser";
    const TEMPLATE: &'static str = r"[PARSER]
    Name        {{ Name }}
    Format      regex
    Regex       {{ Regex }}
    Time_Key    {{ TimeKey | optional }}
    Time_Format {{ TimeFormat | optional }}";

    fn fields(&self) -> Result<Fields, RenderError> {
        Ok(Fields::new()
            .text("Name", &self.name)
            .text("Regex", &self.regex)
            .maybe("TimeKey", self.time_key.as_deref())
            .maybe("TimeFormat", self.time_format.as_deref()))
    }
}
