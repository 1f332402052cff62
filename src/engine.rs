//! Confluence engine
//!
//! Wires the pipeline for one run:
//!
//! ```text
//! IdentityDescriptor ─► ScopeResolver ─► GatheringSwarm ─► MemoryStructurer ─► KnowledgeGraph
//!                                            │
//!                                            └─► progress monitor ─► RunObserver
//! ```
//!
//! Every stage must succeed before the next one starts, and a snapshot is
//! only written for a complete graph.

use crate::config::ConfluenceConfig;
use crate::error::Result;
use crate::graph::{ConfluenceDetector, KnowledgeGraph, MemoryStructurer};
use crate::identity::IdentityDescriptor;
use crate::observer::{default_observer, RunObserver};
use crate::scope::{AttributeScopeResolver, ScopeResolver};
use crate::swarm::{DomainFetcher, GatherProgress, GatheringSwarm};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Runs the resolve, gather and structure pipeline.
pub struct ConfluenceEngine {
    config: ConfluenceConfig,
    fetcher: Arc<dyn DomainFetcher>,
    scope: Arc<dyn ScopeResolver>,
    detector: Option<Arc<dyn ConfluenceDetector>>,
    observer: Arc<dyn RunObserver>,
    created_at: Option<DateTime<Utc>>,
}

impl ConfluenceEngine {
    /// Create an engine gathering through `fetcher`.
    pub fn new(config: ConfluenceConfig, fetcher: Arc<dyn DomainFetcher>) -> Self {
        let scope = Arc::new(AttributeScopeResolver::new(&config.scope));
        Self {
            config,
            fetcher,
            scope,
            detector: None,
            observer: default_observer(),
            created_at: None,
        }
    }

    /// Replace the attribute-based scope resolver.
    pub fn with_scope_resolver(mut self, scope: Arc<dyn ScopeResolver>) -> Self {
        self.scope = scope;
        self
    }

    /// Replace the configured confluence detector.
    pub fn with_detector(mut self, detector: Arc<dyn ConfluenceDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    /// Report run events to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Pin the creation timestamp of produced graphs.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Engine configuration.
    pub fn config(&self) -> &ConfluenceConfig {
        &self.config
    }

    /// Domains a run for `identity` would gather from.
    pub fn resolve_scope(&self, identity: &IdentityDescriptor) -> Result<Vec<String>> {
        self.scope.resolve(identity)
    }

    /// Build the knowledge graph for `identity`.
    pub async fn run(&self, identity: &IdentityDescriptor) -> Result<KnowledgeGraph> {
        self.run_with_cancel(identity, CancellationToken::new()).await
    }

    /// Like `run`, but gathering stops with `Error::Cancelled` once `cancel`
    /// fires.
    pub async fn run_with_cancel(
        &self,
        identity: &IdentityDescriptor,
        cancel: CancellationToken,
    ) -> Result<KnowledgeGraph> {
        let identity_ref = identity.identity_ref();
        let domains = self.scope.resolve(identity)?;
        tracing::info!(
            identity = %identity_ref,
            domains = domains.len(),
            "Starting confluence run"
        );

        let swarm = GatheringSwarm::new(self.fetcher.clone())
            .with_config(&self.config.swarm)
            .with_observer(self.observer.clone());

        let stop = CancellationToken::new();
        let monitor = tokio::spawn(monitor_progress(
            swarm.progress(),
            self.observer.clone(),
            Duration::from_millis(self.config.swarm.progress_interval_ms.max(1)),
            self.config.swarm.progress_report_step,
            stop.clone(),
        ));

        let gathered = swarm.gather_with_cancel(&domains, cancel).await;
        stop.cancel();
        if let Err(e) = monitor.await {
            tracing::debug!(error = %e, "Progress monitor ended abnormally");
        }
        let records = gathered?;

        let mut structurer = MemoryStructurer::new(identity_ref)
            .with_config(&self.config.confluence)
            .with_observer(self.observer.clone());
        if let Some(detector) = &self.detector {
            structurer = structurer.with_detector(detector.clone());
        }
        if let Some(created_at) = self.created_at {
            structurer = structurer.with_created_at(created_at);
        }

        structurer.structure(&records)
    }

    /// Build the graph for `identity` and write it to `path`.
    pub async fn run_to(&self, identity: &IdentityDescriptor, path: &Path) -> Result<KnowledgeGraph> {
        let graph = self.run(identity).await?;
        write_snapshot(&graph, path, self.config.output.pretty).await?;
        Ok(graph)
    }
}

/// Write `graph` as JSON, creating parent directories as needed.
pub async fn write_snapshot(graph: &KnowledgeGraph, path: &Path, pretty: bool) -> Result<()> {
    let json = graph.to_json(pretty)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, json).await?;

    tracing::info!(
        path = %path.display(),
        nodes = graph.nodes().len(),
        "Knowledge graph snapshot written"
    );
    Ok(())
}

/// Poll `progress` until `stop` fires, reporting each advance of at least
/// `step` points and the final 100%.
async fn monitor_progress(
    progress: Arc<GatherProgress>,
    observer: Arc<dyn RunObserver>,
    period: Duration,
    step: f64,
    stop: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    let mut reported = 0.0;

    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = ticker.tick() => {
                let current = progress.percent();
                if current - reported >= step {
                    observer.progress(current);
                    reported = current;
                }
            }
        }
    }

    if progress.is_complete() && reported < 100.0 {
        observer.progress(100.0);
    }
}
