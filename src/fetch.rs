//! Bounded-concurrency batch fetch of secret values.
//!
//! A fixed pool of workers pulls identifiers from one job queue until it is
//! drained, so the number of in-flight store calls never exceeds the pool
//! size. Failures are collected per identifier and never abort the batch.
//!
//! Errors are reported in completion order, which differs between runs.
//! Callers that need deterministic output must order by their own
//! declaration order, not by the error or value order returned here.

use crate::error::ResolveError;
use crate::source::SecretVersion;
use crate::store::{SecretRequest, SecretStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Upper bound on a single store call.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Worker pool sizing.
///
/// `concurrency == 0` means "use the default", which is one worker per
/// identifier, optionally capped by `default_cap`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSettings {
    pub concurrency: usize,
    pub default_cap: Option<usize>,
}

impl FetchSettings {
    pub fn with_concurrency(concurrency: usize) -> Self {
        Self {
            concurrency,
            ..Self::default()
        }
    }

    /// Number of workers for a batch of `jobs` identifiers.
    ///
    /// Never zero while there is work, since a pool with no workers would
    /// never drain the queue.
    pub fn workers_for(&self, jobs: usize) -> usize {
        if jobs == 0 {
            return 0;
        }
        let requested = match (self.concurrency, self.default_cap) {
            (0, Some(cap)) => cap,
            (0, None) => jobs,
            (n, _) => n,
        };
        requested.clamp(1, jobs)
    }
}

/// Values and errors from one batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Secret id to value, for every identifier that succeeded.
    pub values: HashMap<String, String>,
    /// One error per identifier that failed, in completion order.
    pub errors: Vec<ResolveError>,
}

struct FetchJob {
    secret_id: String,
}

struct FetchOutcome {
    secret_id: String,
    result: Result<String, ResolveError>,
}

/// Resolves many secret identifiers against one store.
#[derive(Clone)]
pub struct BatchFetcher {
    store: Arc<dyn SecretStore>,
    version: SecretVersion,
    timeout: Duration,
}

impl BatchFetcher {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            version: SecretVersion::default(),
            timeout: FETCH_TIMEOUT,
        }
    }

    /// Attach version selection to every request in the batch.
    pub fn with_version(mut self, version: SecretVersion) -> Self {
        self.version = version;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch every identifier once, with at most `settings.workers_for(n)`
    /// calls in flight.
    pub async fn fetch(&self, ids: &[String], settings: FetchSettings) -> BatchOutcome {
        if ids.is_empty() {
            return BatchOutcome::default();
        }

        let workers = settings.workers_for(ids.len());
        assert!(workers > 0, "batch of {} ids has no workers", ids.len());

        let start = Instant::now();
        debug!(jobs = ids.len(), workers, "Starting secret batch");

        let (job_tx, job_rx) = mpsc::channel(ids.len());
        for id in ids {
            // Capacity equals the job count, so this never waits.
            if job_tx
                .send(FetchJob {
                    secret_id: id.clone(),
                })
                .await
                .is_err()
            {
                break;
            }
        }
        drop(job_tx);

        let job_rx = Arc::new(Mutex::new(job_rx));
        let (out_tx, mut out_rx) = mpsc::channel(ids.len());
        let mut pool = JoinSet::new();
        for _ in 0..workers {
            let job_rx = Arc::clone(&job_rx);
            let out_tx = out_tx.clone();
            let fetcher = self.clone();
            pool.spawn(async move {
                loop {
                    let job = job_rx.lock().await.recv().await;
                    let Some(job) = job else { break };
                    let outcome = fetcher.fetch_one(job).await;
                    if out_tx.send(outcome).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(out_tx);

        let mut outcome = BatchOutcome::default();
        while let Some(FetchOutcome { secret_id, result }) = out_rx.recv().await {
            match result {
                Ok(value) => {
                    outcome.values.insert(secret_id, value);
                }
                Err(err) => {
                    debug!(secret_id = %secret_id, error = %err, "Secret fetch failed");
                    outcome.errors.push(err);
                }
            }
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(err) = joined {
                warn!(error = %err, "Secret fetch worker stopped abnormally");
                outcome.errors.push(ResolveError::internal(err));
            }
        }

        debug!(
            jobs = ids.len(),
            succeeded = outcome.values.len(),
            failed = outcome.errors.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Finished secret batch"
        );
        outcome
    }

    /// Fetch a single identifier under the per-call timeout.
    pub async fn fetch_single(&self, id: &str) -> Result<String, ResolveError> {
        self.fetch_one(FetchJob {
            secret_id: id.to_string(),
        })
        .await
        .result
    }

    async fn fetch_one(&self, job: FetchJob) -> FetchOutcome {
        let request = SecretRequest::new(job.secret_id.clone()).with_version(self.version.clone());
        let result = match tokio::time::timeout(self.timeout, self.store.get_secret_value(&request))
            .await
        {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => Err(ResolveError::access(&job.secret_id, err)),
            Err(_) => Err(ResolveError::timeout(&job.secret_id, self.timeout)),
        };
        FetchOutcome {
            secret_id: job.secret_id,
            result,
        }
    }
}
