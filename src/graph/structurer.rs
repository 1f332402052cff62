//! Memory structurer
//!
//! Folds the sorted record list from the swarm into a `KnowledgeGraph`:
//!
//! 1. validate every record
//! 2. per record: domain nodes, event nodes, `contains` edges, and
//!    contradiction claims
//! 3. relationship edges, resolved against the complete node set
//! 4. deferred contradictions retried once
//! 5. confluence detection
//!
//! Relationships are added only after every event node exists, so a record
//! may point at events of records folded after it. Structuring is strictly
//! sequential; the same records always give the same graph.

use super::confluence::{ConfluenceDetector, RecurringRelationshipDetector};
use super::contradiction::ContradictionRegistry;
use super::resolver::GraphEntityResolver;
use super::{GraphEdge, GraphMetadata, KnowledgeGraph, CONTAINS_EDGE, GRAPH_SCHEMA_VERSION};
use crate::config::DetectionConfig;
use crate::error::{Error, Result};
use crate::observer::{default_observer, RunObserver};
use crate::record::SourceRecord;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Builds knowledge graphs from gathered source records.
pub struct MemoryStructurer {
    identity_ref: String,
    created_at: Option<DateTime<Utc>>,
    detector: Arc<dyn ConfluenceDetector>,
    observer: Arc<dyn RunObserver>,
}

impl MemoryStructurer {
    /// Create a structurer for the identity `identity_ref`.
    pub fn new(identity_ref: impl Into<String>) -> Self {
        Self {
            identity_ref: identity_ref.into(),
            created_at: None,
            detector: Arc::new(RecurringRelationshipDetector::new()),
            observer: default_observer(),
        }
    }

    /// Use the detector described by `config`.
    pub fn with_config(mut self, config: &DetectionConfig) -> Self {
        self.detector = Arc::new(RecurringRelationshipDetector::from_config(config));
        self
    }

    /// Use a custom confluence detector.
    pub fn with_detector(mut self, detector: Arc<dyn ConfluenceDetector>) -> Self {
        self.detector = detector;
        self
    }

    /// Pin the graph's creation timestamp (defaults to the structuring time).
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Report warnings and the final summary to `observer`.
    pub fn with_observer(mut self, observer: Arc<dyn RunObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Fold `records` into a frozen knowledge graph.
    ///
    /// Fails with `InvalidRecord` or `DanglingEdge`; no partial graph is
    /// returned in either case.
    pub fn structure(&self, records: &[SourceRecord]) -> Result<KnowledgeGraph> {
        let mut seen = HashSet::new();
        for record in records {
            record.validate()?;
            if !seen.insert((record.domain.as_str(), record.source_id.as_str())) {
                return Err(Error::InvalidRecord {
                    source_id: record.source_id.clone(),
                    reason: format!("duplicate record in domain '{}'", record.domain),
                });
            }
        }

        let mut resolver = GraphEntityResolver::new();
        let mut registry = ContradictionRegistry::new();
        let mut edges = Vec::new();

        for record in records {
            resolver.domain_node_id(&record.domain, &record.source_id);

            for event in &record.events {
                let domain = event.domain.as_deref().unwrap_or(&record.domain);
                let domain_id = resolver.domain_node_id(domain, &record.source_id);
                let event_id = resolver.event_node_id(&record.domain, &record.source_id, event);
                edges.push(GraphEdge {
                    source_node_id: domain_id,
                    target_node_id: event_id,
                    edge_type: CONTAINS_EDGE.to_string(),
                    strength: None,
                });
            }

            for claim in &record.contradiction_claims {
                registry.register(claim, &record.source_id, &record.domain, &resolver);
            }
        }

        for record in records {
            for rel in &record.relationships {
                let endpoint = |reference: &str| {
                    resolver
                        .resolve(reference, &record.domain, &record.source_id)
                        .ok_or_else(|| Error::DanglingEdge {
                            source_id: record.source_id.clone(),
                            domain: record.domain.clone(),
                            missing: reference.to_string(),
                            relationship_type: rel.relationship_type.clone(),
                        })
                };
                let source_node_id = endpoint(&rel.source_node_id)?;
                let target_node_id = endpoint(&rel.target_node_id)?;
                edges.push(GraphEdge {
                    source_node_id,
                    target_node_id,
                    edge_type: rel.relationship_type.clone(),
                    strength: Some(rel.strength),
                });
            }
        }

        let deferred = registry.deferred_count();
        let (contradictions, warnings) = registry.finalize(&resolver);
        tracing::debug!(
            contradictions = contradictions.len(),
            deferred,
            unresolved = warnings.len(),
            "Contradictions finalized"
        );
        for warning in &warnings {
            self.observer.warning(warning);
        }

        let metadata = GraphMetadata {
            schema_version: GRAPH_SCHEMA_VERSION.to_string(),
            identity_ref: self.identity_ref.clone(),
            source_count: records.len(),
            domain_count: resolver.domain_count(),
            created_at: self.created_at.unwrap_or_else(Utc::now),
            warnings,
        };

        let nodes = resolver.into_nodes();
        let confluences = self.detector.detect(&nodes, &edges);
        let graph = KnowledgeGraph::assemble(nodes, edges, confluences, contradictions, metadata);

        self.observer.graph_structured(&graph.summary());
        Ok(graph)
    }
}
