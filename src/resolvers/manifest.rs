//! Secret manifest (`manifest://`) resolver.
//!
//! ```yaml
//! items:
//!   - name: prod/api/database
//!     env: DATABASE_URL
//!   - name: prod/api/secret-key
//!     env: SECRET_KEY
//! ```

use super::{ResolveContext, Resolver};
use crate::error::ResolveError;
use crate::resolution::Resolution;
use crate::source::Source;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashSet;
use tracing::debug;

/// A declarative list of secrets and the item each one fills.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub items: Vec<ManifestItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ManifestItem {
    /// Secret identifier.
    pub name: String,
    /// Destination item key.
    pub env: String,
}

impl Manifest {
    /// Distinct secret names in declaration order.
    pub fn secret_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.items
            .iter()
            .filter(|item| seen.insert(item.name.as_str()))
            .map(|item| item.name.clone())
            .collect()
    }
}

/// Parse a manifest document. An empty document has no items.
pub fn parse_manifest(content: &str) -> Result<Manifest, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(Manifest::default());
    }
    serde_yaml::from_str(content)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestResolver;

#[async_trait]
impl Resolver for ManifestResolver {
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
        let manifest = match parse_manifest(&content) {
            Ok(manifest) => manifest,
            Err(err) => {
                result.append_error(ResolveError::decode(path, err));
                return result;
            }
        };

        let names = manifest.secret_names();
        if names.is_empty() {
            return result;
        }
        debug!(path, entries = manifest.items.len(), secrets = names.len(), "Parsed manifest");

        let store = match ctx.secret_store(source).await {
            Ok(store) => store,
            Err(err) => {
                result.append_error(err);
                return result;
            }
        };
        let outcome = ctx
            .fetcher(store, source)
            .fetch(&names, ctx.fetch_settings())
            .await;

        // Declaration order: a later entry targeting the same env wins.
        for item in &manifest.items {
            if let Some(value) = outcome.values.get(&item.name) {
                result.append_item(&item.env, value.as_str());
            }
        }
        result.append_errors(outcome.errors);
        result
    }
}
