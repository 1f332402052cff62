//! Run observers
//!
//! Components never log through a global handle of their own; each one is
//! handed an `Arc<dyn RunObserver>` and reports what happens through it.
//! `TracingObserver` forwards everything to `tracing`, which is what the
//! binary installs. Hosts that want to collect run events (dashboards, tests)
//! supply their own implementation.

use crate::graph::{GraphSummary, StructuringWarning};
use std::sync::Arc;

/// Receives progress and diagnostics from a confluence run.
///
/// Every hook has an empty default so implementations only override what
/// they care about.
pub trait RunObserver: Send + Sync {
    /// The swarm is about to fetch `domains`.
    fn gather_started(&self, _domains: &[String]) {}

    /// One domain fetch finished successfully.
    fn domain_completed(&self, _domain: &str, _records: usize) {}

    /// One domain fetch failed; the gather will abort.
    fn domain_failed(&self, _domain: &str, _cause: &str) {}

    /// Aggregate gather progress, in percent.
    fn progress(&self, _percent: f64) {}

    /// A non-fatal problem found while structuring.
    fn warning(&self, _warning: &StructuringWarning) {}

    /// The knowledge graph has been assembled.
    fn graph_structured(&self, _summary: &GraphSummary) {}
}

/// Observer that forwards every hook to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl RunObserver for TracingObserver {
    fn gather_started(&self, domains: &[String]) {
        tracing::info!(
            count = domains.len(),
            domains = %domains.join(", "),
            "Targeting source domains for gathering"
        );
    }

    fn domain_completed(&self, domain: &str, records: usize) {
        tracing::debug!(domain = %domain, records, "Domain fetch completed");
    }

    fn domain_failed(&self, domain: &str, cause: &str) {
        tracing::error!(domain = %domain, error = %cause, "Domain fetch failed");
    }

    fn progress(&self, percent: f64) {
        tracing::info!("Memory gathering progress: {:.1}%", percent);
    }

    fn warning(&self, warning: &StructuringWarning) {
        tracing::warn!("{}", warning);
    }

    fn graph_structured(&self, summary: &GraphSummary) {
        tracing::info!(
            nodes = summary.nodes,
            edges = summary.edges,
            confluences = summary.confluences,
            contradictions = summary.contradictions,
            warnings = summary.warnings,
            "Knowledge graph structured"
        );
    }
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl RunObserver for NullObserver {}

/// The observer used when a component is built without one.
pub fn default_observer() -> Arc<dyn RunObserver> {
    Arc::new(TracingObserver)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Observer that records each hook call as a short string.
    #[derive(Default)]
    pub struct RecordingObserver {
        pub events: Mutex<Vec<String>>,
    }

    impl RecordingObserver {
        pub fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }

        fn push(&self, event: String) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl RunObserver for RecordingObserver {
        fn gather_started(&self, domains: &[String]) {
            self.push(format!("started:{}", domains.join(",")));
        }

        fn domain_completed(&self, domain: &str, records: usize) {
            self.push(format!("completed:{domain}:{records}"));
        }

        fn domain_failed(&self, domain: &str, _cause: &str) {
            self.push(format!("failed:{domain}"));
        }

        fn progress(&self, percent: f64) {
            self.push(format!("progress:{percent:.0}"));
        }

        fn warning(&self, warning: &StructuringWarning) {
            self.push(format!("warning:{}", warning.code()));
        }

        fn graph_structured(&self, summary: &GraphSummary) {
            self.push(format!("structured:{}:{}", summary.nodes, summary.edges));
        }
    }
}
