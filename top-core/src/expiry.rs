use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::store::TokenStore;

/// An outstanding delayed removal of one token.
struct ExpiryJob {
    id: u64,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Removes tokens from the [`TokenStore`] once their lifetime has elapsed.
///
/// Every scheduled removal runs as its own task and is tracked by token
/// until it fires or [`cancel_all`](Self::cancel_all) settles it.
pub struct ExpiryScheduler {
    store: Arc<TokenStore>,
    jobs: Arc<DashMap<String, ExpiryJob>>,
    next_id: AtomicU64,
}

impl ExpiryScheduler {
    pub fn new(store: Arc<TokenStore>) -> Self {
        Self {
            store,
            jobs: Arc::new(DashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Remove `token` from the store after `ttl`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&self, token: String, ttl: Duration) -> Result<(), ProviderError> {
        let runtime = Handle::try_current()
            .map_err(|e| ProviderError::Internal(format!("no async runtime for expiry: {e}")))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();

        // The entry stays locked until the job is registered, so a job with a
        // very short lifetime cannot deregister itself before it is tracked.
        match self.jobs.entry(token.clone()) {
            Entry::Occupied(mut occupied) => {
                occupied.get().cancel.cancel();
                let handle = runtime.spawn(self.run_job(id, token, ttl, cancel.clone()));
                occupied.insert(ExpiryJob { id, cancel, handle });
            }
            Entry::Vacant(vacant) => {
                let handle = runtime.spawn(self.run_job(id, token, ttl, cancel.clone()));
                vacant.insert(ExpiryJob { id, cancel, handle });
            }
        }
        Ok(())
    }

    fn run_job(
        &self,
        id: u64,
        token: String,
        ttl: Duration,
        cancel: CancellationToken,
    ) -> impl std::future::Future<Output = ()> + Send + 'static {
        let store = self.store.clone();
        let jobs = self.jobs.clone();
        async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return;
                }
                _ = tokio::time::sleep(ttl) => {
                    if store.expire(&token) {
                        debug!(ttl_secs = ttl.as_secs_f64(), "Token expired");
                    }
                }
            }
            jobs.remove_if(&token, |_, job| job.id == id);
        }
    }

    /// Cancel every outstanding job and wait until all of them have settled.
    ///
    /// Jobs that already fired, or fire concurrently, are simply awaited. No
    /// job touches the store after this returns.
    pub async fn cancel_all(&self) {
        let tokens: Vec<String> = self.jobs.iter().map(|entry| entry.key().clone()).collect();

        let mut pending = Vec::with_capacity(tokens.len());
        for token in tokens {
            if let Some((_, job)) = self.jobs.remove(&token) {
                job.cancel.cancel();
                pending.push(job.handle);
            }
        }

        let count = pending.len();
        for handle in pending {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Expiry job failed");
                }
            }
        }
        debug!(count, "Expiry jobs cancelled");
    }

    /// Number of jobs that have neither fired nor been cancelled.
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
