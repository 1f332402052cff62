//! Gathering swarm - concurrent fan-out over source domains
//!
//! ```text
//!                 ┌──────────── GatheringSwarm ────────────┐
//! domains ──────► │ JoinSet: one task per domain           │
//!                 │   ├─ fetch(alpha) ─┐                   │
//!                 │   ├─ fetch(beta)  ─┼─► join ─► sort ──►│──► Vec<SourceRecord>
//!                 │   └─ fetch(gamma) ─┘                   │
//!                 │ Semaphore: max fetches in flight       │
//!                 │ CancellationToken: fail-fast siblings  │
//!                 │ GatherProgress: atomic completed/total │
//!                 └────────────────────────────────────────┘
//! ```
//!
//! Each task owns its own record batch until joined; the progress counter is
//! the only shared mutable state. The first failing domain cancels its
//! siblings and the whole gather returns `Error::DomainFetch` with no records.

pub mod fetcher;
pub mod progress;

pub use fetcher::{DomainFetcher, FetchError, FixtureFetcher, StaticFetcher};
pub use progress::GatherProgress;

use crate::config::SwarmConfig;
use crate::error::{Error, Result};
use crate::observer::{default_observer, RunObserver};
use crate::record::SourceRecord;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

/// Outcome of one domain task. `None` means the task was cancelled.
type DomainOutcome = (String, Option<std::result::Result<Vec<SourceRecord>, FetchError>>);

/// Runs one fetch per domain concurrently and joins the results.
///
/// A swarm serves one run: `progress()` describes the most recent `gather`.
pub struct GatheringSwarm {
    fetcher: Arc<dyn DomainFetcher>,
    max_concurrent_fetches: usize,
    progress: Arc<GatherProgress>,
    observer: Arc<dyn RunObserver>,
}

impl GatheringSwarm {
    /// Create a swarm over `fetcher` with default limits.
    pub fn new(fetcher: Arc<dyn DomainFetcher>) -> Self {
        Self {
            fetcher,
            max_concurrent_fetches: SwarmConfig::default().max_concurrent_fetches,
            progress: Arc::new(GatherProgress::new()),
            observer: default_observer(),
        }
    }

    /// Apply swarm configuration.
    pub fn with_config(mut self, config: &SwarmConfig) -> Self {
        self.max_concurrent_fetches = config.max_concurrent_fetches;
        self
    }

    /// Limit fetches in flight (0 = one per domain).
    pub fn with_max_concurrent_fetches(mut self, limit: usize) -> Self {
        self.max_concurrent_fetches = limit;
        self
    }

    /// Report run events to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Shared handle to the progress counter, for monitors.
    pub fn progress(&self) -> Arc<GatherProgress> {
        self.progress.clone()
    }

    /// Fetch every domain concurrently.
    ///
    /// Returns all records sorted by `(domain, source_id)`, or the first
    /// failure with no records at all.
    pub async fn gather(&self, domains: &[String]) -> Result<Vec<SourceRecord>> {
        self.gather_with_cancel(domains, CancellationToken::new())
            .await
    }

    /// Like `gather`, but abandons the run with `Error::Cancelled` as soon as
    /// `cancel` fires.
    pub async fn gather_with_cancel(
        &self,
        domains: &[String],
        cancel: CancellationToken,
    ) -> Result<Vec<SourceRecord>> {
        self.progress.begin(domains.len());
        self.observer.gather_started(domains);

        let siblings = cancel.child_token();
        let slots = match self.max_concurrent_fetches {
            0 => domains.len(),
            limit => limit.min(domains.len()),
        };
        let permits = Arc::new(Semaphore::new(slots.max(1)));

        let mut tasks: JoinSet<DomainOutcome> = JoinSet::new();
        for domain in domains {
            let domain = domain.clone();
            let fetcher = self.fetcher.clone();
            let permits = permits.clone();
            let progress = self.progress.clone();
            let token = siblings.clone();

            tasks.spawn(async move {
                let fetch = async {
                    let _permit = permits.acquire().await.map_err(|_| {
                        FetchError::Unavailable("fetch slots closed".to_string())
                    })?;
                    let mut batch = fetcher.fetch(&domain).await?;
                    for record in &mut batch {
                        if record.domain.is_empty() {
                            record.domain = domain.clone();
                        }
                    }
                    progress.complete_one();
                    Ok::<_, FetchError>(batch)
                };

                let outcome = tokio::select! {
                    _ = token.cancelled() => None,
                    result = fetch => Some(result),
                };
                (domain, outcome)
            });
        }

        let mut records = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (domain, outcome) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    siblings.cancel();
                    tasks.abort_all();
                    return Err(Error::Internal(format!("Domain fetch task failed: {}", e)));
                }
            };

            match outcome {
                Some(Ok(batch)) => {
                    self.observer.domain_completed(&domain, batch.len());
                    records.extend(batch);
                }
                Some(Err(cause)) => {
                    self.observer.domain_failed(&domain, &cause.to_string());
                    siblings.cancel();
                    tasks.abort_all();
                    return Err(Error::DomainFetch { domain, cause });
                }
                None => {
                    tasks.abort_all();
                    return Err(Error::Cancelled);
                }
            }
        }

        records.sort_by(|a, b| {
            (a.domain.as_str(), a.source_id.as_str()).cmp(&(b.domain.as_str(), b.source_id.as_str()))
        });

        tracing::debug!(
            domains = domains.len(),
            records = records.len(),
            "Gathering completed"
        );
        Ok(records)
    }
}
