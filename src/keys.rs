//! Item key normalization.
//!
//! Every key that lands in a [`Resolution`](crate::resolution::Resolution) is
//! passed through [`normalize`] so it can be exported as an environment
//! variable name.

use regex_lite::Regex;
use std::sync::LazyLock;

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_]+").expect("static key pattern is valid")
});

/// Map arbitrary text to an environment-safe identifier.
///
/// Each maximal run of characters outside `[A-Za-z0-9_]` becomes a single
/// `_`, then the result is uppercased. Total and idempotent.
///
/// ```
/// use snagsby::keys::normalize;
///
/// assert_eq!(normalize("Hello World/Test"), "HELLO_WORLD_TEST");
/// ```
pub fn normalize(raw: &str) -> String {
    NON_WORD.replace_all(raw, "_").to_ascii_uppercase()
}

/// Derive an item key from a secret name listed under `prefix`.
///
/// The prefix is removed only when the name starts with it.
pub fn key_from_prefix(prefix: &str, name: &str) -> String {
    normalize(name.strip_prefix(prefix).unwrap_or(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(normalize("Hello World/Test"), "HELLO_WORLD_TEST");
        assert_eq!(normalize("a--b..c"), "A_B_C");
        assert_eq!(normalize("db-host"), "DB_HOST");
        assert_eq!(normalize("already_OK_1"), "ALREADY_OK_1");
    }

    #[test]
    fn test_normalize_edges() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("///"), "_");
        assert_eq!(normalize("-lead"), "_LEAD");
        assert_eq!(normalize("caf\u{e9} au lait"), "CAF_AU_LAIT");
    }

    #[test]
    fn test_normalize_idempotent() {
        for raw in [
            "Hello World/Test",
            "prod/api/db-host",
            "  spaced  out  ",
            "x.y.z",
            "\u{1F600}emoji",
            "",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn test_key_from_prefix() {
        assert_eq!(key_from_prefix("prod/api/", "prod/api/db-host"), "DB_HOST");
        assert_eq!(
            key_from_prefix("/hello/", "/hello/charles-dickens"),
            "CHARLES_DICKENS"
        );
        // Names outside the prefix keep their full text.
        assert_eq!(key_from_prefix("prod/", "stage/x"), "STAGE_X");
    }
}
