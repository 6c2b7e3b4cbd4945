//! Output formatting for merged items.

use clap::ValueEnum;
use regex_lite::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static ENV_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\\"$`])"#).expect("static escape pattern is valid"));

/// Output format for the merged items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// `export KEY="value"` lines for `eval` in a shell
    #[default]
    Env,
    /// `KEY="value"` lines, e.g. for docker-compose env files
    #[value(name = "envfile")]
    EnvFile,
    /// A single JSON object
    Json,
}

impl OutputFormat {
    /// Render items sorted by key.
    pub fn render(self, items: &BTreeMap<String, String>) -> String {
        match self {
            OutputFormat::Env => format_env(items, "export "),
            OutputFormat::EnvFile => format_env(items, ""),
            OutputFormat::Json => format_json(items),
        }
    }
}

/// Backslash-escape the characters a double-quoted shell string interprets.
pub fn env_escape(value: &str) -> String {
    ENV_ESCAPE.replace_all(value, r"\$1").into_owned()
}

fn format_env(items: &BTreeMap<String, String>, prefix: &str) -> String {
    let mut out = String::new();
    for (key, value) in items {
        out.push_str(&format!("{}{}=\"{}\"\n", prefix, key, env_escape(value)));
    }
    out
}

fn format_json(items: &BTreeMap<String, String>) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_env() {
        let out = OutputFormat::Env.render(&items(&[("TWO", "2"), ("ONE", "1")]));
        assert_eq!(out, "export ONE=\"1\"\nexport TWO=\"2\"\n");
    }

    #[test]
    fn test_env_escapes() {
        let out = OutputFormat::Env.render(&items(&[(
            "ESCAPE_TEST",
            "$HELLO \"FRIEND\" \\12`END",
        )]));
        assert_eq!(out, "export ESCAPE_TEST=\"\\$HELLO \\\"FRIEND\\\" \\\\12\\`END\"\n");
    }

    #[test]
    fn test_envfile() {
        let out = OutputFormat::EnvFile.render(&items(&[("ONE", "1"), ("MULTI", "a\nb")]));
        assert_eq!(out, "MULTI=\"a\nb\"\nONE=\"1\"\n");
    }

    #[test]
    fn test_json_sorted() {
        let out = OutputFormat::Json.render(&items(&[("B", "2"), ("A", "1"), ("Z", "10")]));
        assert_eq!(out, r#"{"A":"1","B":"2","Z":"10"}"#);
    }

    #[test]
    fn test_empty() {
        assert_eq!(OutputFormat::Env.render(&BTreeMap::new()), "");
        assert_eq!(OutputFormat::Json.render(&BTreeMap::new()), "{}");
    }
}
