use std::sync::OnceLock;

use indexmap::IndexMap;
use regex::Regex;

use crate::RenderError;

/// Value bound to a template placeholder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Text(String),
    List(Vec<String>),
}

impl Value {
    fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::List(items) => items.is_empty(),
        }
    }

    /// Single-line form; lists are comma joined
    fn joined(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::List(items) => items.join(","),
        }
    }
}

/// Named values substituted into a plugin template
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(IndexMap<&'static str, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a text value
    #[must_use]
    pub fn text(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.0.insert(name, Value::Text(value.into()));
        self
    }

    /// Bind a text value when present; absent values render as empty
    #[must_use]
    pub fn maybe(self, name: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.text(name, value),
            None => self.text(name, String::new()),
        }
    }

    /// Bind a list value
    #[must_use]
    pub fn list(mut self, name: &'static str, values: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.0
            .insert(name, Value::List(values.into_iter().map(Into::into).collect()));
        self
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}

/// How a placeholder treats its value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Required,
    Optional,
    Each,
}

/// Make a value safe to embed in a single line of a section
///
/// Line feeds and carriage returns become the two-character sequences `\n`
/// and `\r`, so a value can never start a new key or section.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Expand `{{ Field }}` placeholders in a plugin template
///
/// Placeholders take an optional modifier:
///
/// - `{{ Field }}` must be non-empty, otherwise rendering fails
/// - `{{ Field | optional }}` drops the whole line when the value is empty
/// - `{{ Field | each }}` repeats the line once per list element and fails
///   on an empty list
///
/// Expansion is line oriented and every substituted value is passed through
/// [`escape`]. The output ends with a newline.
///
/// # Errors
///
/// Returns an error naming the plugin and field when a required value is
/// empty, or when the template references a field that was not bound
pub fn render(plugin: &'static str, template: &str, fields: &Fields) -> Result<String, RenderError> {
    fn re() -> &'static Regex {
        static RE: OnceLock<Regex> = OnceLock::new();
        // Group 1: field name, group 2: optional modifier
        RE.get_or_init(|| {
            Regex::new(r"\{\{\s*([A-Za-z0-9_]+)\s*(?:\|\s*(optional|each)\s*)?\}\}").expect("must be valid regex")
        })
    }

    let mut output = String::with_capacity(template.len());

    for line in template.lines() {
        let mut parts = Vec::new();
        let mut repeat: Option<&[String]> = None;
        let mut last_end = 0;
        let mut dropped = false;

        for captures in re().captures_iter(line) {
            let (Some(overall), Some(name)) = (captures.get(0), captures.get(1)) else {
                continue;
            };
            let name = name.as_str();
            let mode = match captures.get(2).map(|m| m.as_str()) {
                Some("optional") => Mode::Optional,
                Some("each") => Mode::Each,
                _ => Mode::Required,
            };

            let value = fields.get(name).ok_or_else(|| RenderError::UnknownField {
                plugin,
                field: name.to_owned(),
            })?;

            // Later placeholders of a dropped line are still checked
            if value.is_empty() {
                if mode == Mode::Optional {
                    dropped = true;
                    continue;
                }
                return Err(RenderError::EmptyField {
                    plugin,
                    field: name.to_owned(),
                });
            }

            parts.push(Part::Literal(&line[last_end..overall.start()]));
            match (mode, value) {
                (Mode::Each, Value::List(items)) => {
                    repeat = Some(items);
                    parts.push(Part::Item);
                }
                (Mode::Each, Value::Text(text)) => {
                    repeat = Some(std::slice::from_ref(text));
                    parts.push(Part::Item);
                }
                (_, value) => parts.push(Part::Value(escape(&value.joined()))),
            }
            last_end = overall.end();
        }
        if dropped {
            continue;
        }
        parts.push(Part::Literal(&line[last_end..]));

        match repeat {
            Some(items) => {
                for item in items {
                    push_line(&mut output, &parts, &escape(item));
                }
            }
            None => push_line(&mut output, &parts, ""),
        }
    }

    Ok(output)
}

enum Part<'a> {
    Literal(&'a str),
    Value(String),
    Item,
}

fn push_line(output: &mut String, parts: &[Part<'_>], item: &str) {
    for part in parts {
        match part {
            Part::Literal(text) => output.push_str(text),
            Part::Value(value) => output.push_str(value),
            Part::Item => output.push_str(item),
        }
    }
    output.push('\n');
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn no_placeholders() {
        let template = "[INPUT]\n    Name dummy";
        assert_eq!(render("dummy", template, &Fields::new()).unwrap(), "[INPUT]\n    Name dummy\n");
    }

    #[test]
    fn substitutes_required_fields() {
        let fields = Fields::new().text("Tag", "p.r").text("Port", "514");
        let out = render("syslog", "Tag {{ Tag }}\nPort {{Port}}", &fields).unwrap();
        assert_eq!(out, "Tag p.r\nPort 514\n");
    }

    #[test]
    fn empty_required_field_names_plugin_and_field() {
        let fields = Fields::new().text("Tag", "");
        let err = render("tail", "Tag {{ Tag }}", &fields).unwrap_err();
        assert_eq!(err.to_string(), "\"tail\" plugin should not have empty field: \"Tag\"");
    }

    #[test]
    fn optional_line_is_dropped_when_empty() {
        let template = indoc! {"
            Path {{ Path }}
            Exclude_Path {{ ExcludePath | optional }}
            Key message
        "};
        let fields = Fields::new().list("Path", ["/a", "/b"]).list("ExcludePath", Vec::<String>::new());
        assert_eq!(render("tail", template, &fields).unwrap(), "Path /a,/b\nKey message\n");
    }

    #[test]
    fn optional_line_is_kept_when_set() {
        let fields = Fields::new().maybe("TimeKey", Some("time"));
        assert_eq!(render("parser", "Time_Key {{ TimeKey | optional }}", &fields).unwrap(), "Time_Key time\n");
    }

    #[test]
    fn dropped_line_still_checks_required_fields() {
        let template = "Format {{ Format | optional }} {{ Name }}";

        let fields = Fields::new().text("Format", "").text("Name", "");
        let err = render("parser", template, &fields).unwrap_err();
        assert!(matches!(err, RenderError::EmptyField { plugin: "parser", ref field } if field == "Name"), "{err:?}");

        let err = render("parser", template, &Fields::new().text("Format", "")).unwrap_err();
        assert!(matches!(err, RenderError::UnknownField { plugin: "parser", .. }), "{err:?}");

        let fields = Fields::new().text("Format", "").text("Name", "json");
        assert_eq!(render("parser", template, &fields).unwrap(), "");
    }

    #[test]
    fn each_repeats_the_line() {
        let fields = Fields::new().text("Match", "p.*").list("Exclude", ["a ^x$", "b y"]);
        let out = render("grep", "Match {{ Match }}\nExclude {{ Exclude | each }}", &fields).unwrap();
        assert_eq!(out, "Match p.*\nExclude a ^x$\nExclude b y\n");
    }

    #[test]
    fn each_with_empty_list_fails() {
        let fields = Fields::new().list("Exclude", Vec::<String>::new());
        let err = render("grep", "Exclude {{ Exclude | each }}", &fields).unwrap_err();
        assert!(matches!(err, RenderError::EmptyField { plugin: "grep", .. }));
    }

    #[test]
    fn values_cannot_break_lines() {
        let fields = Fields::new().text("Tag", "a\n[OUTPUT]\r");
        let out = render("tail", "Tag {{ Tag }}", &fields).unwrap();
        assert_eq!(out, "Tag a\\n[OUTPUT]\\r\n");
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn unbound_field_is_an_error() {
        let err = render("tail", "DB {{ DB }}", &Fields::new()).unwrap_err();
        assert!(matches!(err, RenderError::UnknownField { plugin: "tail", .. }));
    }
}
