//! Confluence detection
//!
//! A confluence is a relationship type that recurs across several domains.
//! Each non-structural edge is attributed to the domain of its source node;
//! a relationship type observed in at least `min_domains` distinct domains
//! becomes a confluence.
//!
//! Detection is a pure function of the node and edge sets, so running it
//! twice over the same graph gives the same result.

use super::{Confluence, GraphEdge, GraphNode, NodeId, CONTAINS_EDGE};
use crate::config::DetectionConfig;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Derives confluences from a completed node and edge set.
pub trait ConfluenceDetector: Send + Sync {
    /// Return confluences sorted by pattern.
    fn detect(&self, nodes: &[GraphNode], edges: &[GraphEdge]) -> Vec<Confluence>;
}

/// Flags relationship types recurring in several domains.
#[derive(Debug, Clone)]
pub struct RecurringRelationshipDetector {
    min_domains: usize,
    ignored_types: HashSet<String>,
}

impl Default for RecurringRelationshipDetector {
    fn default() -> Self {
        Self {
            min_domains: 2,
            ignored_types: HashSet::from([CONTAINS_EDGE.to_string()]),
        }
    }
}

impl RecurringRelationshipDetector {
    /// Create a detector with the default threshold of two domains.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a detector from configuration.
    pub fn from_config(config: &DetectionConfig) -> Self {
        Self {
            min_domains: config.min_domains,
            ignored_types: config.ignored_types.iter().cloned().collect(),
        }
    }

    /// Domains required before a pattern counts as a confluence.
    pub fn with_min_domains(mut self, min_domains: usize) -> Self {
        self.min_domains = min_domains;
        self
    }
}

#[derive(Default)]
struct PatternGroup<'a> {
    domains: BTreeSet<&'a str>,
    node_ids: BTreeSet<&'a NodeId>,
    occurrences: usize,
}

impl ConfluenceDetector for RecurringRelationshipDetector {
    fn detect(&self, nodes: &[GraphNode], edges: &[GraphEdge]) -> Vec<Confluence> {
        let domain_of: HashMap<&NodeId, &str> = nodes
            .iter()
            .map(|n| (&n.id, n.payload.domain()))
            .collect();

        let mut groups: BTreeMap<&str, PatternGroup<'_>> = BTreeMap::new();
        for edge in edges {
            if self.ignored_types.contains(&edge.edge_type) {
                continue;
            }
            let Some(domain) = domain_of.get(&edge.source_node_id) else {
                continue;
            };
            let group = groups.entry(edge.edge_type.as_str()).or_default();
            group.domains.insert(*domain);
            group.node_ids.insert(&edge.source_node_id);
            group.node_ids.insert(&edge.target_node_id);
            group.occurrences += 1;
        }

        groups
            .into_iter()
            .filter(|(_, g)| g.domains.len() >= self.min_domains)
            .map(|(pattern, g)| Confluence {
                pattern: pattern.to_string(),
                supporting_domains: g.domains.into_iter().map(str::to_string).collect(),
                node_ids: g.node_ids.into_iter().cloned().collect(),
                occurrences: g.occurrences,
            })
            .collect()
    }
}
