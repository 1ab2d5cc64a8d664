//! Field paths and match expressions used by logging processors

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

/// Prefix every user-visible field path starts with
pub const PAYLOAD_PREFIX: &str = "jsonPayload";

/// Field of a log record, written as `jsonPayload.a.b`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    /// Parse a `jsonPayload.`-rooted path
    ///
    /// # Errors
    ///
    /// Returns a message when the path is not rooted at `jsonPayload` or a
    /// segment contains characters other than letters, digits, `_` and `-`
    pub fn parse(path: &str) -> Result<Self, String> {
        let mut segments = path.split('.');
        if segments.next() != Some(PAYLOAD_PREFIX) {
            return Err(format!("field {path:?} must start with \"{PAYLOAD_PREFIX}.\""));
        }

        let segments: Vec<String> = segments.map(str::to_owned).collect();
        if segments.is_empty() {
            return Err(format!("field {path:?} must name a field inside {PAYLOAD_PREFIX}"));
        }
        for segment in &segments {
            if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                return Err(format!("field {path:?} has an invalid segment {segment:?}"));
            }
        }

        Ok(Self(segments))
    }

    /// Path segments below `jsonPayload`
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Whether the path names a field directly under `jsonPayload`
    pub fn is_top_level(&self) -> bool {
        self.0.len() == 1
    }

    /// Key form understood by the log-shipping engine
    ///
    /// Top-level fields are plain keys; nested fields use the record
    /// accessor syntax `$a['b']`.
    pub fn record_accessor(&self) -> String {
        match self.0.as_slice() {
            [single] => single.clone(),
            [first, rest @ ..] => {
                let mut accessor = format!("${first}");
                for segment in rest {
                    accessor.push_str(&format!("['{segment}']"));
                }
                accessor
            }
            [] => String::new(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PAYLOAD_PREFIX}.{}", self.0.join("."))
    }
}

/// Comparison operator of an exclusion expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `=`: exact string equality
    Equals,
    /// `=~`: regular expression match
    Matches,
}

/// One `match_any` entry of an `exclude_logs` processor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeExpression {
    pub field: FieldPath,
    pub comparison: Comparison,
    pub value: String,
}

impl ExcludeExpression {
    /// Parse `jsonPayload.<field> = "<value>"` or `jsonPayload.<field> =~ "<regex>"`
    ///
    /// # Errors
    ///
    /// Returns a message when the expression does not follow that grammar
    pub fn parse(expression: &str) -> Result<Self, String> {
        fn re() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            // Group 1: field path, group 2: operator, group 3: quoted value body
            RE.get_or_init(|| {
                Regex::new(r#"^\s*([A-Za-z0-9_.\-]+)\s*(=~|=)\s*"((?:[^"\\]|\\.)*)"\s*$"#).expect("must be valid regex")
            })
        }

        let captures = re().captures(expression).ok_or_else(|| {
            format!("expression {expression:?} must have the form {PAYLOAD_PREFIX}.<field> =~ \"<regex>\" or = \"<value>\"")
        })?;

        let field = FieldPath::parse(&captures[1])?;
        let comparison = if &captures[2] == "=~" {
            Comparison::Matches
        } else {
            Comparison::Equals
        };

        Ok(Self {
            field,
            comparison,
            value: unescape(&captures[3]),
        })
    }

    /// Regular expression equivalent to the comparison
    pub fn pattern(&self) -> String {
        match self.comparison {
            Comparison::Equals => format!("^{}$", regex::escape(&self.value)),
            Comparison::Matches => self.value.clone(),
        }
    }
}

/// Resolve `\"` and `\\`, leaving every other escape for the regex engine
fn unescape(quoted: &str) -> String {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped @ ('"' | '\\')) => out.push(escaped),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}
