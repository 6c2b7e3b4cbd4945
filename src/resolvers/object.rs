//! Object store (`s3://`) resolver.

use super::json::decode_flat_json;
use super::{ResolveContext, Resolver};
use crate::error::ResolveError;
use crate::resolution::Resolution;
use crate::source::Source;
use async_trait::async_trait;
use tracing::debug;

/// Reads one flat JSON object from `s3://bucket/key`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObjectResolver;

#[async_trait]
impl Resolver for ObjectResolver {
    async fn resolve(&self, ctx: &ResolveContext, source: &Source) -> Resolution {
        let mut result = Resolution::new(source.clone());
        let (bucket, key) = source.bucket_and_key();
        let target = source.to_string();

        let store = match ctx.stores().object_store(source.region()).await {
            Ok(store) => store,
            Err(err) => {
                result.append_error(ResolveError::access(&target, err));
                return result;
            }
        };

        let body = match ctx.bounded(&target, store.get_object(bucket, key)).await {
            Ok(body) => body,
            Err(err) => {
                result.append_error(err);
                return result;
            }
        };
        debug!(source = %source, bytes = body.len(), "Fetched object");

        let items = String::from_utf8(body)
            .map_err(|e| e.to_string())
            .and_then(|text| decode_flat_json(&text));
        match items {
            Ok(items) => result.append_items(items),
            Err(message) => result.append_error(ResolveError::decode(&target, message)),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::{MemoryObjectStore, MemoryStores};
    use std::sync::Arc;

    async fn resolve(stores: MemoryStores, raw: &str) -> Resolution {
        let ctx = ResolveContext::new(Arc::new(stores));
        ObjectResolver
            .resolve(&ctx, &Source::parse(raw).unwrap())
            .await
    }

    #[tokio::test]
    async fn test_resolves_json_object() {
        let stores = MemoryStores::with_objects(MemoryObjectStore::new().with_object(
            "bucket",
            "config.json",
            r#"{"hello":"world","num":1.5,"flag":true}"#,
        ));

        let res = resolve(stores.clone(), "s3://bucket/config.json").await;

        assert!(!res.has_errors());
        assert_eq!(stores.objects().calls(), 1);
        assert_eq!(res.items()["HELLO"], "world");
        assert_eq!(res.items()["NUM"], "1.5");
        assert_eq!(res.items()["FLAG"], "1");
    }

    #[tokio::test]
    async fn test_array_body_is_decode_error() {
        let stores = MemoryStores::with_objects(
            MemoryObjectStore::new().with_object("bucket", "list.json", r#"["a","b"]"#),
        );

        let res = resolve(stores, "s3://bucket/list.json").await;

        assert_eq!(res.len_items(), 0);
        assert_eq!(res.errors().len(), 1);
        assert_eq!(res.errors()[0].code(), ErrorCode::Decode);
    }

    #[tokio::test]
    async fn test_double_slash_key_keeps_one_slash() {
        let stores = MemoryStores::with_objects(
            MemoryObjectStore::new().with_object("bucket", "/nested.json", r#"{"a":"b"}"#),
        );

        let res = resolve(stores, "s3://bucket//nested.json").await;

        assert_eq!(res.items()["A"], "b");
    }

    #[tokio::test]
    async fn test_missing_object_and_region_hint() {
        let stores = MemoryStores::default();

        let res = resolve(stores.clone(), "s3://bucket/missing.json?region=eu-west-1").await;

        assert_eq!(res.len_items(), 0);
        assert_eq!(res.errors()[0].code(), ErrorCode::NotFound);
        assert_eq!(stores.regions(), vec![Some("eu-west-1".to_string())]);
    }

    #[tokio::test]
    async fn test_denied_bucket() {
        let stores =
            MemoryStores::with_objects(MemoryObjectStore::new().with_denied_bucket("locked"));

        let res = resolve(stores, "s3://locked/app.json").await;

        assert_eq!(res.errors()[0].code(), ErrorCode::AccessDenied);
    }
}
