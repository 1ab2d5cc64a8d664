use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::expression::FieldPath;
use crate::declared::{Declaration, admit_typed};

/// Log transformation declaration, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoggingProcessor {
    /// Parse a field as JSON
    ParseJson(ParseJson),
    /// Parse a field with a regular expression
    ParseRegex(ParseRegex),
    /// Drop records matching any expression
    ExcludeLogs(ExcludeLogs),
    /// Rename, copy or set fields
    ModifyFields(ModifyFields),
}

impl LoggingProcessor {
    /// Discriminators accepted under `type`
    pub const TYPES: &'static [&'static str] = &["parse_json", "parse_regex", "exclude_logs", "modify_fields"];

    /// Discriminator of this declaration
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::ParseJson(_) => "parse_json",
            Self::ParseRegex(_) => "parse_regex",
            Self::ExcludeLogs(_) => "exclude_logs",
            Self::ModifyFields(_) => "modify_fields",
        }
    }
}

impl Declaration for LoggingProcessor {
    const KIND: &'static str = "logging processor";

    fn admit(id: &str, raw: serde_yaml::Value) -> Result<Self, String> {
        admit_typed(Self::KIND, Self::TYPES, id, raw)
    }
}

/// Field parsed when a parser does not name one
pub const DEFAULT_PARSE_FIELD: &str = "message";

/// Record key a parse processor reads
///
/// `field` is either a bare record key or a top-level `jsonPayload.<name>`
/// path; the engine's `Key_Name` cannot address nested fields.
///
/// # Errors
///
/// Returns a message for nested paths and for keys with characters other
/// than letters, digits, `_` and `-`
pub fn parse_key(field: Option<&str>) -> Result<String, String> {
    let field = field.unwrap_or(DEFAULT_PARSE_FIELD);

    if field.contains('.') {
        let path = FieldPath::parse(field)?;
        if !path.is_top_level() {
            return Err(format!("{field:?} must name a top-level field"));
        }
        return Ok(path.record_accessor());
    }

    if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(format!("{field:?} is not a valid record key"));
    }
    Ok(field.to_owned())
}

/// `parse_json` processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParseJson {
    /// Field holding the text to parse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Parsed field holding the record timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_key: Option<String>,
    /// strptime format of the timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
}

/// `parse_regex` processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParseRegex {
    /// Field holding the text to parse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Pattern with named capture groups
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Parsed field holding the record timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_key: Option<String>,
    /// strptime format of the timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_format: Option<String>,
}

/// `exclude_logs` processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExcludeLogs {
    /// Expressions, any of which excludes a record
    #[serde(default)]
    pub match_any: Vec<String>,
}

/// `modify_fields` processor
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModifyFields {
    /// Destination field to its source, applied in declaration order
    #[serde(default)]
    pub fields: IndexMap<String, ModifyField>,
}

/// Source of a single `modify_fields` destination
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModifyField {
    /// Move the value of another field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub move_from: Option<String>,
    /// Copy the value of another field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copy_from: Option<String>,
    /// Set a literal value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_value: Option<String>,
}

impl ModifyField {
    /// Number of value sources that are set
    pub fn source_count(&self) -> usize {
        [&self.move_from, &self.copy_from, &self.static_value]
            .iter()
            .filter(|source| source.is_some())
            .count()
    }
}
