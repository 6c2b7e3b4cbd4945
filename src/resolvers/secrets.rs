//! Secret store (`sm://`) resolvers.

use super::json::decode_flat_json;
use super::{ResolveContext, Resolver};
use crate::error::ResolveError;
use crate::keys::key_from_prefix;
use crate::resolution::Resolution;
use crate::source::Source;
use async_trait::async_trait;
use tracing::debug;

/// `sm://name`: one secret holding a flat JSON object.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecretResolver;

#[async_trait]
impl Resolver for SecretResolver {
    async fn resolve(&self, ctx: &ResolveContext, source: &Source) -> Resolution {
        let mut result = Resolution::new(source.clone());
        let secret_id = source.locator();

        let store = match ctx.secret_store(source).await {
            Ok(store) => store,
            Err(err) => {
                result.append_error(err);
                return result;
            }
        };

        let value = match ctx.fetcher(store, source).fetch_single(secret_id).await {
            Ok(value) => value,
            Err(err) => {
                result.append_error(err);
                return result;
            }
        };

        match decode_flat_json(&value) {
            Ok(items) => result.append_items(items),
            Err(message) => result.append_error(ResolveError::decode(secret_id, message)),
        }
        result
    }
}

/// `sm://prefix/*`: every secret under a prefix, one item each.
///
/// Values are stored as opaque strings. The item key is the secret name with
/// the prefix removed, normalized.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveSecretResolver;

impl RecursiveSecretResolver {
    /// The listing prefix: the locator without its trailing `*`.
    pub fn prefix(source: &Source) -> &str {
        let locator = source.locator();
        locator.strip_suffix('*').unwrap_or(locator)
    }
}

#[async_trait]
impl Resolver for RecursiveSecretResolver {
    async fn resolve(&self, ctx: &ResolveContext, source: &Source) -> Resolution {
        let mut result = Resolution::new(source.clone());
        let prefix = Self::prefix(source);

        let store = match ctx.secret_store(source).await {
            Ok(store) => store,
            Err(err) => {
                result.append_error(err);
                return result;
            }
        };

        let names = match ctx.bounded(prefix, store.list_secrets_by_prefix(prefix)).await {
            Ok(names) => names,
            Err(err) => {
                result.append_error(err);
                return result;
            }
        };
        debug!(source = %source, prefix, count = names.len(), "Listed secrets for prefix");

        let outcome = ctx
            .fetcher(store, source)
            .fetch(&names, ctx.fetch_settings())
            .await;

        // Listing order, so colliding keys resolve the same way every run.
        for name in &names {
            if let Some(value) = outcome.values.get(name) {
                result.append_item(&key_from_prefix(prefix, name), value.as_str());
            }
        }
        result.append_errors(outcome.errors);
        result
    }
}
