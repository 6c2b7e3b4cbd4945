//! In-memory stores.
//!
//! Keep secrets and objects in process memory and record how they were
//! used, which makes them the collaborator doubles for the resolver tests.
//!
//! # Example
//!
//! ```
//! use snagsby::store::{MemorySecretStore, SecretRequest, SecretStore};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = MemorySecretStore::new().with_secret("prod/api/db-host", "localhost");
//! let value = store
//!     .get_secret_value(&SecretRequest::new("prod/api/db-host"))
//!     .await
//!     .unwrap();
//! assert_eq!(value, "localhost");
//! assert_eq!(store.calls(), 1);
//! # }
//! ```

use super::{ObjectStore, SecretRequest, SecretStore, StoreProvider, StoreResult};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory secret store.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: BTreeMap<String, String>,
    denied: HashSet<String>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    list_delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    requests: Mutex<Vec<SecretRequest>>,
    listed_prefixes: Mutex<Vec<String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, id: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(id.into(), value.into());
        self
    }

    pub fn with_secrets<K, V>(mut self, secrets: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.secrets
            .extend(secrets.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Answer requests for `id` with an access-denied error.
    pub fn with_denied(mut self, id: impl Into<String>) -> Self {
        self.denied.insert(id.into());
        self
    }

    /// Delay every request for `id`.
    pub fn with_delay(mut self, id: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(id.into(), delay);
        self
    }

    /// Delay every request that has no per-id delay.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// Delay every `list_secrets_by_prefix` call.
    pub fn with_list_delay(mut self, delay: Duration) -> Self {
        self.list_delay = Some(delay);
        self
    }

    /// Number of `get_secret_value` calls made.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of `get_secret_value` calls that were in flight at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<SecretRequest> {
        lock(&self.requests).clone()
    }

    /// Every prefix passed to `list_secrets_by_prefix`.
    pub fn listed_prefixes(&self) -> Vec<String> {
        lock(&self.listed_prefixes).clone()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    async fn get_secret_value(&self, request: &SecretRequest) -> StoreResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(&request.secret_id)
            .copied()
            .or(self.default_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let id = &request.secret_id;
        if self.denied.contains(id) {
            return Err(StoreError::AccessDenied(id.clone()));
        }
        self.secrets
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn list_secrets_by_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        lock(&self.listed_prefixes).push(prefix.to_string());
        if let Some(delay) = self.list_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .secrets
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// In-memory object store keyed by bucket and key.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: HashMap<(String, String), Vec<u8>>,
    denied_buckets: HashSet<String>,
    calls: AtomicUsize,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(
        mut self,
        bucket: impl Into<String>,
        key: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.objects.insert((bucket.into(), key.into()), body.into());
        self
    }

    pub fn with_denied_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.denied_buckets.insert(bucket.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let location = format!("s3://{bucket}/{key}");
        if self.denied_buckets.contains(bucket) {
            return Err(StoreError::AccessDenied(location));
        }
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or(StoreError::NotFound(location))
    }
}

/// Provider handing out shared in-memory stores.
#[derive(Debug, Clone)]
pub struct MemoryStores {
    secrets: Arc<MemorySecretStore>,
    objects: Arc<MemoryObjectStore>,
    regions: Arc<Mutex<Vec<Option<String>>>>,
}

impl MemoryStores {
    pub fn new(secrets: MemorySecretStore, objects: MemoryObjectStore) -> Self {
        Self {
            secrets: Arc::new(secrets),
            objects: Arc::new(objects),
            regions: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_secrets(secrets: MemorySecretStore) -> Self {
        Self::new(secrets, MemoryObjectStore::new())
    }

    pub fn with_objects(objects: MemoryObjectStore) -> Self {
        Self::new(MemorySecretStore::new(), objects)
    }

    pub fn secrets(&self) -> &MemorySecretStore {
        &self.secrets
    }

    pub fn objects(&self) -> &MemoryObjectStore {
        &self.objects
    }

    /// Region hints passed to the provider, one per client built.
    pub fn regions(&self) -> Vec<Option<String>> {
        lock(&self.regions).clone()
    }
}

impl Default for MemoryStores {
    fn default() -> Self {
        Self::new(MemorySecretStore::new(), MemoryObjectStore::new())
    }
}

#[async_trait]
impl StoreProvider for MemoryStores {
    async fn secret_store(&self, region: Option<&str>) -> StoreResult<Arc<dyn SecretStore>> {
        lock(&self.regions).push(region.map(str::to_string));
        Ok(self.secrets.clone())
    }

    async fn object_store(&self, region: Option<&str>) -> StoreResult<Arc<dyn ObjectStore>> {
        lock(&self.regions).push(region.map(str::to_string));
        Ok(self.objects.clone())
    }
}
