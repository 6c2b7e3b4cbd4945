//! Source resolvers and the scheme dispatcher.
//!
//! Each resolver turns one [`Source`] into a [`Resolution`]. Failures are
//! recorded on the Resolution, never returned or raised:
//! - `s3://bucket/key` - [`ObjectResolver`]
//! - `sm://name` - [`SecretResolver`]
//! - `sm://prefix/*` - [`RecursiveSecretResolver`]
//! - `file://path` - [`FileResolver`]
//! - `manifest://path` - [`ManifestResolver`]

pub mod file;
pub mod json;
pub mod manifest;
pub mod object;
pub mod secrets;

use crate::error::ResolveError;
use crate::fetch::{BatchFetcher, FETCH_TIMEOUT, FetchSettings};
use crate::resolution::Resolution;
use crate::source::{Source, SourceKind};
use crate::store::{SecretStore, StoreProvider};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub use file::{EnvFileItem, FileResolver, parse_env_file};
pub use json::decode_flat_json;
pub use manifest::{Manifest, ManifestItem, ManifestResolver, parse_manifest};
pub use object::ObjectResolver;
pub use secrets::{RecursiveSecretResolver, SecretResolver};

/// Turns one Source into a Resolution.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, ctx: &ResolveContext, source: &Source) -> Resolution;
}

/// Everything a resolver needs besides its Source.
#[derive(Clone)]
pub struct ResolveContext {
    stores: Arc<dyn StoreProvider>,
    fetch: FetchSettings,
    timeout: Duration,
}

impl ResolveContext {
    pub fn new(stores: Arc<dyn StoreProvider>) -> Self {
        Self {
            stores,
            fetch: FetchSettings::default(),
            timeout: FETCH_TIMEOUT,
        }
    }

    pub fn with_fetch_settings(mut self, fetch: FetchSettings) -> Self {
        self.fetch = fetch;
        self
    }

    /// Override the per-call store timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn stores(&self) -> &dyn StoreProvider {
        self.stores.as_ref()
    }

    pub fn fetch_settings(&self) -> FetchSettings {
        self.fetch
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Secret store for the Source's region hint.
    pub async fn secret_store(&self, source: &Source) -> Result<Arc<dyn SecretStore>, ResolveError> {
        self.stores
            .secret_store(source.region())
            .await
            .map_err(|err| ResolveError::access(source.to_string(), err))
    }

    /// Batch fetcher carrying the Source's version selection.
    pub fn fetcher(&self, store: Arc<dyn SecretStore>, source: &Source) -> BatchFetcher {
        BatchFetcher::new(store)
            .with_version(source.version())
            .with_timeout(self.timeout)
    }

    /// Run one store call under the per-call timeout.
    pub async fn bounded<T, F>(&self, target: &str, call: F) -> Result<T, ResolveError>
    where
        F: Future<Output = Result<T, crate::error::StoreError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ResolveError::access(target, err)),
            Err(_) => Err(ResolveError::timeout(target, self.timeout)),
        }
    }
}

/// Selects a resolver by scheme and runs it.
#[derive(Clone)]
pub struct Dispatcher {
    ctx: ResolveContext,
}

impl Dispatcher {
    pub fn new(ctx: ResolveContext) -> Self {
        Self { ctx }
    }

    /// The resolver for a kind, or `None` for unrecognized schemes.
    pub fn resolver_for(kind: &SourceKind) -> Option<&'static dyn Resolver> {
        match kind {
            SourceKind::ObjectStore => Some(&ObjectResolver),
            SourceKind::SecretSingle => Some(&SecretResolver),
            SourceKind::SecretRecursive => Some(&RecursiveSecretResolver),
            SourceKind::File => Some(&FileResolver),
            SourceKind::Manifest => Some(&ManifestResolver),
            SourceKind::Unrecognized(_) => None,
        }
    }

    pub async fn dispatch(&self, source: &Source) -> Resolution {
        let kind = source.kind();
        debug!(source = %source, kind = ?kind, "Dispatching source");
        match Self::resolver_for(&kind) {
            Some(resolver) => resolver.resolve(&self.ctx, source).await,
            None => Resolution::failed(
                source.clone(),
                ResolveError::UnknownScheme(source.scheme().to_string()),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::store::{MemoryObjectStore, MemorySecretStore, MemoryStores};

    fn dispatcher(stores: MemoryStores) -> Dispatcher {
        Dispatcher::new(ResolveContext::new(Arc::new(stores)))
    }

    #[tokio::test]
    async fn test_unknown_scheme() {
        let dispatcher = dispatcher(MemoryStores::default());
        let source = Source::parse("ftp://host/file").unwrap();

        let res = dispatcher.dispatch(&source).await;

        assert_eq!(res.len_items(), 0);
        assert_eq!(res.errors().len(), 1);
        assert_eq!(res.errors()[0].code(), ErrorCode::UnknownScheme);
        assert!(res.errors()[0].to_string().contains("ftp"));
    }

    #[tokio::test]
    async fn test_dispatch_by_scheme() {
        let stores = MemoryStores::new(
            MemorySecretStore::new()
                .with_secret("app/config", r#"{"from":"sm"}"#)
                .with_secret("app/list/one", "1"),
            MemoryObjectStore::new().with_object("bucket", "c.json", r#"{"from":"s3"}"#),
        );
        let dispatcher = dispatcher(stores);

        let res = dispatcher
            .dispatch(&Source::parse("s3://bucket/c.json").unwrap())
            .await;
        assert_eq!(res.items()["FROM"], "s3");

        let res = dispatcher
            .dispatch(&Source::parse("sm://app/config").unwrap())
            .await;
        assert_eq!(res.items()["FROM"], "sm");

        let res = dispatcher
            .dispatch(&Source::parse("sm://app/list/*").unwrap())
            .await;
        assert_eq!(res.items()["ONE"], "1");
    }

    #[test]
    fn test_resolver_for_unrecognized() {
        assert!(Dispatcher::resolver_for(&SourceKind::Unrecognized("x".into())).is_none());
        assert!(Dispatcher::resolver_for(&SourceKind::File).is_some());
    }

    #[tokio::test]
    async fn test_bounded_maps_errors() {
        let ctx = ResolveContext::new(Arc::new(MemoryStores::default()))
            .with_timeout(Duration::from_millis(20));

        let err = ctx
            .bounded("slow", async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, crate::error::StoreError>(())
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Timeout);

        let err = ctx
            .bounded("gone", async {
                Err::<(), _>(crate::error::StoreError::NotFound("gone".into()))
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}
