use super::{Fields, Plugin};
use crate::RenderError;

/// Record key the log name travels under between filters
pub const LOG_NAME_KEY: &str = "logName";

/// `parser` filter applying a named parser to one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserFilter {
    pub match_tag: String,
    pub key_name: String,
    pub parser: String,
}

impl Plugin for ParserFilter {
    const NAME: &'static str = "parser";
    const TEMPLATE: &'static str = r"[FILTER]
    Name     parser
    Match    {{ Match }}
    Key_Name {{ KeyName }}
    Parser   {{ Parser }}";

    fn fields(&self) -> Result<Fields, RenderError> {
        Ok(Fields::new()
            .text("Match", &self.match_tag)
            .text("KeyName", &self.key_name)
            .text("Parser", &self.parser))
    }
}

/// `grep` filter dropping records that match any rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrepExclude {
    pub match_tag: String,
    /// `<key> <regex>` rules
    pub rules: Vec<String>,
}

impl Plugin for GrepExclude {
    const NAME: &'static str = "grep";
    const TEMPLATE: &'static str = r"[FILTER]
    Name    grep
    Match   {{ Match }}
    Exclude {{ Exclude | each }}";

    fn fields(&self) -> Result<Fields, RenderError> {
        Ok(Fields::new().text("Match", &self.match_tag).list("Exclude", &self.rules))
    }
}

/// One `modify` filter operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModifyOperation {
    Rename { from: String, to: String },
    Copy { from: String, to: String },
    Set { key: String, value: String },
    Add { key: String, value: String },
    Remove { key: String },
}

impl ModifyOperation {
    fn line(&self) -> Result<String, RenderError> {
        Ok(match self {
            Self::Rename { from, to } => format!("Rename {from} {to}"),
            Self::Copy { from, to } => format!("Copy {from} {to}"),
            Self::Set { key, value } => format!("Set {key} {}", quote(value)?),
            Self::Add { key, value } => format!("Add {key} {}", quote(value)?),
            Self::Remove { key } => format!("Remove {key}"),
        })
    }
}

/// Make a `modify` argument a single token
///
/// The engine splits operation arguments on whitespace. A double-quoted
/// token may hold spaces, and `\"` inside it stands for a literal quote.
/// Plain values are left unquoted.
fn quote(value: &str) -> Result<String, RenderError> {
    let plain = !value.is_empty()
        && !value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\\' | '[' | ']'));
    if plain {
        return Ok(value.to_owned());
    }

    // A trailing backslash would escape the closing quote
    if value.ends_with('\\') {
        return Err(RenderError::InvalidField {
            plugin: Modify::NAME,
            field: "Operation",
            reason: format!("value {value:?} must not end with a backslash"),
        });
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    Ok(quoted)
}

/// `modify` filter applying operations in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modify {
    pub match_tag: String,
    pub operations: Vec<ModifyOperation>,
}

impl Modify {
    /// Attach the log name to records of one pipeline input
    pub fn add_log_name(match_tag: impl Into<String>, log_name: impl Into<String>) -> Self {
        Self {
            match_tag: match_tag.into(),
            operations: vec![ModifyOperation::Add {
                key: LOG_NAME_KEY.to_owned(),
                value: log_name.into(),
            }],
        }
    }

    /// Strip the log name again once records carry it as their tag
    pub fn remove_log_name(match_tag: impl Into<String>) -> Self {
        Self {
            match_tag: match_tag.into(),
            operations: vec![ModifyOperation::Remove {
                key: LOG_NAME_KEY.to_owned(),
            }],
        }
    }
}

impl Plugin for Modify {
    const NAME: &'static str = "modify";
    const TEMPLATE: &'static str = r"[FILTER]
    Name  modify
    Match {{ Match }}
    {{ Operation | each }}";

    fn fields(&self) -> Result<Fields, RenderError> {
        Ok(Fields::new()
            .text("Match", &self.match_tag)
            .list(
                "Operation",
                self.operations
                    .iter()
                    .map(ModifyOperation::line)
                    .collect::<Result<Vec<_>, _>>()?,
            ))
    }
}

/// `rewrite_tag` filter re-emitting records under their log name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteTag {
    pub match_tag: String,
}

impl Plugin for RewriteTag {
    const NAME: &'static str = "rewrite_tag";
    const TEMPLATE: &'static str = r"[FILTER]
    Name                  rewrite_tag
    Match                 {{ Match }}
    Rule                  $logName .* $logName false
    Emitter_Storage.type  filesystem
    Emitter_Mem_Buf_Limit 10M";

    fn fields(&self) -> Result<Fields, RenderError> {
        Ok(Fields::new().text("Match", &self.match_tag))
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;

    #[test]
    fn grep_repeats_exclude_per_rule() {
        let grep = GrepExclude {
            match_tag: "p.*".to_owned(),
            rules: vec!["severity ^DEBUG$".to_owned(), "$http['status'] ^5..$".to_owned()],
        };
        let expected = indoc! {"
            [FILTER]
                Name    grep
                Match   p.*
                Exclude severity ^DEBUG$
                Exclude $http['status'] ^5..$
        "};
        assert_eq!(grep.render().unwrap(), expected);
    }

    #[test]
    fn grep_without_rules_fails() {
        let grep = GrepExclude {
            match_tag: "p.*".to_owned(),
            rules: Vec::new(),
        };
        assert!(matches!(grep.render(), Err(RenderError::EmptyField { plugin: "grep", .. })));
    }

    #[test]
    fn modify_keeps_operation_order() {
        let modify = Modify {
            match_tag: "p.*".to_owned(),
            operations: vec![
                ModifyOperation::Rename {
                    from: "a".to_owned(),
                    to: "b".to_owned(),
                },
                ModifyOperation::Set {
                    key: "env".to_owned(),
                    value: "prod".to_owned(),
                },
            ],
        };
        let expected = indoc! {"
            [FILTER]
                Name  modify
                Match p.*
                Rename a b
                Set env prod
        "};
        assert_eq!(modify.render().unwrap(), expected);
    }

    #[test]
    fn modify_values_are_single_tokens() {
        let set = |value: &str| ModifyOperation::Set {
            key: "env".to_owned(),
            value: value.to_owned(),
        };
        let modify = Modify {
            match_tag: "p.*".to_owned(),
            operations: vec![set("hello world"), set(r#"say "hi""#), set("[OUTPUT]"), set(""), set("plain")],
        };
        let expected = indoc! {r#"
            [FILTER]
                Name  modify
                Match p.*
                Set env "hello world"
                Set env "say \"hi\""
                Set env "[OUTPUT]"
                Set env ""
                Set env plain
        "#};
        assert_eq!(modify.render().unwrap(), expected);
    }

    #[test]
    fn modify_value_with_trailing_backslash_fails() {
        let modify = Modify {
            match_tag: "p.*".to_owned(),
            operations: vec![ModifyOperation::Set {
                key: "path".to_owned(),
                value: r"C:\logs\".to_owned(),
            }],
        };
        assert!(matches!(
            modify.render(),
            Err(RenderError::InvalidField {
                plugin: "modify",
                field: "Operation",
                ..
            })
        ));
    }

    #[test]
    fn log_name_filters() {
        let expected = indoc! {"
            [FILTER]
                Name  modify
                Match default_pipeline.syslog
                Add logName syslog
        "};
        assert_eq!(Modify::add_log_name("default_pipeline.syslog", "syslog").render().unwrap(), expected);

        let rewrite = RewriteTag {
            match_tag: "default_pipeline.syslog".to_owned(),
        };
        assert!(rewrite.render().unwrap().contains("    Rule                  $logName .* $logName false\n"));
        assert!(Modify::remove_log_name("syslog").render().unwrap().ends_with("    Remove logName\n"));
    }
}
