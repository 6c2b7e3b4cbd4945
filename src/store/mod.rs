//! Remote store collaborators.
//!
//! The resolvers only see these traits:
//! - [`SecretStore`] - get one secret value, list secret names by prefix
//! - [`ObjectStore`] - get one object's bytes
//! - [`StoreProvider`] - build the two above for an optional region hint
//!
//! Implementations:
//! - AWS Secrets Manager and S3 (`AwsStores`)
//! - In-memory for tests and offline use (`MemoryStores`)

pub mod aws;
pub mod memory;

use crate::error::StoreError;
use crate::source::SecretVersion;
use async_trait::async_trait;
use std::sync::Arc;

pub use aws::AwsStores;
pub use memory::{MemoryObjectStore, MemorySecretStore, MemoryStores};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A request for one secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretRequest {
    pub secret_id: String,
    pub version: SecretVersion,
}

impl SecretRequest {
    pub fn new(secret_id: impl Into<String>) -> Self {
        Self {
            secret_id: secret_id.into(),
            version: SecretVersion::default(),
        }
    }

    pub fn with_version(mut self, version: SecretVersion) -> Self {
        self.version = version;
        self
    }
}

/// Secret store capability.
///
/// Shared read-only across the workers of a batch, so implementations must
/// be safe for concurrent use.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch the string value of a secret.
    async fn get_secret_value(&self, request: &SecretRequest) -> StoreResult<String>;

    /// Every secret name starting with `prefix`, across all listing pages.
    async fn list_secrets_by_prefix(&self, prefix: &str) -> StoreResult<Vec<String>>;
}

/// Object store capability.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>>;
}

/// Builds store clients for a Source's region hint.
#[async_trait]
pub trait StoreProvider: Send + Sync {
    async fn secret_store(&self, region: Option<&str>) -> StoreResult<Arc<dyn SecretStore>>;

    async fn object_store(&self, region: Option<&str>) -> StoreResult<Arc<dyn ObjectStore>>;
}
