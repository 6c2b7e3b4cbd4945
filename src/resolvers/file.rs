//! Local env file (`file://`) resolver.
//!
//! Lines look like `KEY=value`. A value of the form `sm://<id>` is replaced
//! by that secret's value, fetched in one batch with every other reference
//! in the file.

use super::{ResolveContext, Resolver};
use crate::error::ResolveError;
use crate::resolution::Resolution;
use crate::source::Source;
use async_trait::async_trait;
use std::collections::HashSet;
use tracing::debug;

const SECRET_REFERENCE: &str = "sm://";

/// One `KEY=value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFileItem {
    pub key: String,
    pub value: String,
}

impl EnvFileItem {
    /// The referenced secret id, if the value is an `sm://` reference.
    pub fn secret_id(&self) -> Option<&str> {
        self.value.strip_prefix(SECRET_REFERENCE)
    }
}

/// Parse env file text.
///
/// Blank lines, `#` comments, lines without `=` and lines with an empty key
/// are skipped. Matching single or double quotes around the value are
/// removed.
pub fn parse_env_file(content: &str) -> Vec<EnvFileItem> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some(EnvFileItem {
                key: key.to_string(),
                value: unquote(value.trim()).to_string(),
            })
        })
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileResolver;

#[async_trait]
impl Resolver for FileResolver {
    async fn resolve(&self, ctx: &ResolveContext, source: &Source) -> Resolution {
        let mut result = Resolution::new(source.clone());
        let path = source.locator();

        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(err) => {
                result.append_error(ResolveError::local_io(path, err));
                return result;
            }
        };

        let items = parse_env_file(&content);
        let (references, direct): (Vec<_>, Vec<_>) =
            items.iter().partition(|item| item.secret_id().is_some());
        for item in direct {
            result.append_item(&item.key, item.value.as_str());
        }
        if references.is_empty() {
            return result;
        }

        let mut seen = HashSet::new();
        let ids: Vec<String> = references
            .iter()
            .filter_map(|item| item.secret_id())
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect();
        debug!(path, direct = items.len() - references.len(), secrets = ids.len(), "Parsed env file");

        let store = match ctx.secret_store(source).await {
            Ok(store) => store,
            Err(err) => {
                result.append_error(err);
                return result;
            }
        };
        let outcome = ctx
            .fetcher(store, source)
            .fetch(&ids, ctx.fetch_settings())
            .await;

        for item in references {
            let resolved = item.secret_id().and_then(|id| outcome.values.get(id));
            if let Some(value) = resolved {
                result.append_item(&item.key, value.as_str());
            }
        }
        result.append_errors(outcome.errors);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::{MemorySecretStore, MemoryStores};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn item(key: &str, value: &str) -> EnvFileItem {
        EnvFileItem {
            key: key.into(),
            value: value.into(),
        }
    }

    #[test]
    fn test_parse_skips_malformed_lines() {
        let items = parse_env_file("KEY1=value1\n# comment\nKEY2=\"v2\"\n=bad\nNOEQUALS\n");
        assert_eq!(items, vec![item("KEY1", "value1"), item("KEY2", "v2")]);
    }

    #[test]
    fn test_parse_quotes_and_whitespace() {
        let items = parse_env_file(
            "  A = 'single'  \nB=\"double\"\nC=\"mismatched'\nD=\"\nE=\nF=a=b=c\n\n   # indented comment\n",
        );
        assert_eq!(
            items,
            vec![
                item("A", "single"),
                item("B", "double"),
                item("C", "\"mismatched'"),
                item("D", "\""),
                item("E", ""),
                item("F", "a=b=c"),
            ]
        );
    }

    #[test]
    fn test_secret_reference() {
        assert_eq!(item("K", "sm://prod/db").secret_id(), Some("prod/db"));
        assert_eq!(item("K", "plain").secret_id(), None);
        assert_eq!(parse_env_file("K='sm://quoted'")[0].secret_id(), Some("quoted"));
    }

    #[tokio::test]
    async fn test_resolves_direct_and_secret_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.env");
        std::fs::write(
            &path,
            "PLAIN=hello\nDB_PASSWORD=sm://prod/db-password\nALSO_PASSWORD=sm://prod/db-password\nMISSING=sm://prod/missing\n",
        )
        .unwrap();

        let stores = MemoryStores::with_secrets(
            MemorySecretStore::new().with_secret("prod/db-password", "hunter2"),
        );
        let ctx = ResolveContext::new(Arc::new(stores.clone()));
        let source = Source::parse(&format!("file://{}", path.display())).unwrap();

        let res = FileResolver.resolve(&ctx, &source).await;

        assert_eq!(res.items()["PLAIN"], "hello");
        assert_eq!(res.items()["DB_PASSWORD"], "hunter2");
        assert_eq!(res.items()["ALSO_PASSWORD"], "hunter2");
        assert!(!res.items().contains_key("MISSING"));
        assert_eq!(res.errors().len(), 1);
        assert_eq!(res.errors()[0].code(), ErrorCode::NotFound);
        // Each distinct reference is fetched once.
        assert_eq!(stores.secrets().calls(), 2);
    }

    #[tokio::test]
    async fn test_no_references_makes_no_store_calls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.env");
        std::fs::write(&path, "A=1\nB=2\n").unwrap();

        let stores = MemoryStores::default();
        let ctx = ResolveContext::new(Arc::new(stores.clone()));
        let source = Source::parse(&format!("file://{}", path.display())).unwrap();

        let res = FileResolver.resolve(&ctx, &source).await;

        assert_eq!(res.len_items(), 2);
        assert!(stores.regions().is_empty());
        assert_eq!(stores.secrets().calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let ctx = ResolveContext::new(Arc::new(MemoryStores::default()));
        let source = Source::parse("file:///nonexistent/dir/app.env").unwrap();

        let res = FileResolver.resolve(&ctx, &source).await;

        assert_eq!(res.len_items(), 0);
        assert_eq!(res.errors()[0].code(), ErrorCode::LocalIo);
    }
}
