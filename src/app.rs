//! Parallel resolution of every configured Source, and the ordered merge.

use crate::error::ResolveError;
use crate::resolution::Resolution;
use crate::resolvers::Dispatcher;
use crate::source::Source;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Resolve all Sources concurrently.
///
/// The output has one Resolution per Source, in input order, whatever
/// order the resolutions finish in.
pub async fn resolve_all(dispatcher: Arc<Dispatcher>, sources: &[Source]) -> Vec<Resolution> {
    if sources.is_empty() {
        return Vec::new();
    }

    let handles: Vec<_> = sources
        .iter()
        .cloned()
        .map(|source| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(&source).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (handle, source) in handles.into_iter().zip(sources) {
        let resolution = match handle.await {
            Ok(resolution) => resolution,
            Err(err) => {
                warn!(source = %source, error = %err, "Resolution task failed");
                Resolution::failed(source.clone(), ResolveError::internal(err))
            }
        };
        results.push(resolution);
    }
    results
}

/// Fold item maps in order; a later map's key overrides an earlier one.
pub fn merge<'a>(
    maps: impl IntoIterator<Item = &'a BTreeMap<String, String>>,
) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for map in maps {
        merged.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    merged
}

/// Text written to stderr for a failed Resolution: a header naming the
/// Source, then one line per error.
pub fn failure_report(resolution: &Resolution) -> String {
    let mut report = format!("Error processing snagsby source: {}\n", resolution.source());
    for err in resolution.errors() {
        report.push_str(&format!("{err}\n"));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::resolvers::ResolveContext;
    use crate::store::{MemoryObjectStore, MemorySecretStore, MemoryStores};
    use std::time::Duration;

    fn map(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_merge_empty() {
        assert!(merge(std::iter::empty()).is_empty());
    }

    #[test]
    fn test_merge_last_wins() {
        let first = map(&[("A", "1"), ("B", "1")]);
        let second = map(&[("B", "2"), ("C", "2")]);
        let third = map(&[("C", "3")]);

        let merged = merge([&first, &second, &third]);

        assert_eq!(merged, map(&[("A", "1"), ("B", "2"), ("C", "3")]));
    }

    #[test]
    fn test_failure_report() {
        let source = Source::parse("ftp://nowhere").unwrap();
        let failed = Resolution::failed(
            source.clone(),
            ResolveError::UnknownScheme("ftp".to_string()),
        );

        assert_eq!(
            failure_report(&failed),
            "Error processing snagsby source: ftp://nowhere\nno resolver found for scheme \"ftp\"\n"
        );
        assert_eq!(failure_report(&Resolution::new(source)).lines().count(), 1);
    }

    #[tokio::test]
    async fn test_resolve_all_empty() {
        let dispatcher = Arc::new(Dispatcher::new(ResolveContext::new(Arc::new(
            MemoryStores::default(),
        ))));
        assert!(resolve_all(dispatcher, &[]).await.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_all_preserves_order() {
        // The first source is the slowest, so completion order differs
        // from input order.
        let stores = MemoryStores::new(
            MemorySecretStore::new()
                .with_secret("slow", r#"{"KEY":"slow"}"#)
                .with_secret("fast", r#"{"KEY":"fast"}"#)
                .with_delay("slow", Duration::from_millis(100)),
            MemoryObjectStore::new().with_object("b", "k.json", r#"{"KEY":"s3"}"#),
        );
        let dispatcher = Arc::new(Dispatcher::new(ResolveContext::new(Arc::new(stores))));
        let sources: Vec<Source> = ["sm://slow", "ftp://nowhere", "s3://b/k.json", "sm://fast"]
            .iter()
            .map(|s| Source::parse(s).unwrap())
            .collect();

        let results = resolve_all(dispatcher, &sources).await;

        assert_eq!(results.len(), 4);
        for (result, source) in results.iter().zip(&sources) {
            assert_eq!(result.source(), source);
        }
        assert_eq!(results[0].items()["KEY"], "slow");
        assert_eq!(results[1].errors()[0].code(), ErrorCode::UnknownScheme);
        assert_eq!(results[2].items()["KEY"], "s3");
        assert_eq!(results[3].items()["KEY"], "fast");

        let merged = merge(results.iter().filter(|r| !r.has_errors()).map(|r| r.items()));
        assert_eq!(merged["KEY"], "fast");
    }
}
