//! Node identity and reference resolution
//!
//! `GraphEntityResolver` owns the node list while a graph is being built. It
//! guarantees one node per domain name and a unique node per event of each
//! record, and maps the loose references used by relationships and
//! contradiction claims onto node ids. A record is identified by its domain
//! and source id together.
//!
//! A reference resolves in this order:
//! 1. an exact node id (`domain:alpha`, `event:alpha:a1:e1`)
//! 2. an event id of the referring record
//! 3. an event id of any record, first one constructed wins

use super::{GraphNode, NodeId, NodePayload};
use crate::record::Event;
use std::collections::HashMap;

/// `(domain, source_id, event_id)` of an event within its record.
type RecordEventKey = (String, String, String);

/// Assigns node ids and resolves references to them.
#[derive(Debug, Default)]
pub struct GraphEntityResolver {
    nodes: Vec<GraphNode>,
    index: HashMap<NodeId, usize>,
    domains: HashMap<String, NodeId>,
    events_by_record: HashMap<RecordEventKey, NodeId>,
    events_by_id: HashMap<String, NodeId>,
}

impl GraphEntityResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the node for `domain`, creating it on first sight.
    pub fn domain_node_id(&mut self, domain: &str, origin_source_id: &str) -> NodeId {
        if let Some(id) = self.domains.get(domain) {
            return id.clone();
        }

        let id = NodeId::domain(domain);
        self.push(GraphNode {
            id: id.clone(),
            payload: NodePayload::Domain {
                name: domain.to_string(),
            },
            origin_source_id: Some(origin_source_id.to_string()),
        });
        self.domains.insert(domain.to_string(), id.clone());
        id
    }

    /// Create the node for `event` of record `source_id` gathered from
    /// `record_domain`.
    ///
    /// The node belongs to the event's own domain when it names one, else to
    /// `record_domain`. Every call creates a new node. An event id repeated
    /// inside one record gets a `#2`, `#3`, ... suffix; reference lookups keep
    /// pointing at the first occurrence.
    pub fn event_node_id(&mut self, record_domain: &str, source_id: &str, event: &Event) -> NodeId {
        let base = NodeId::event(record_domain, source_id, &event.id);
        let mut id = base.clone();
        let mut n = 1;
        while self.index.contains_key(&id) {
            n += 1;
            id = NodeId::from(format!("{}#{}", base, n));
        }
        if n > 1 {
            tracing::debug!(
                domain = %record_domain,
                source_id = %source_id,
                event_id = %event.id,
                node_id = %id,
                "Duplicate event id in record"
            );
        }

        self.push(GraphNode {
            id: id.clone(),
            payload: NodePayload::Event {
                event_id: event.id.clone(),
                domain: event.domain.as_deref().unwrap_or(record_domain).to_string(),
                attributes: event.attributes.clone(),
            },
            origin_source_id: Some(source_id.to_string()),
        });
        self.events_by_record
            .entry((record_domain.to_string(), source_id.to_string(), event.id.clone()))
            .or_insert_with(|| id.clone());
        self.events_by_id
            .entry(event.id.clone())
            .or_insert_with(|| id.clone());
        id
    }

    /// Resolve `reference` as seen from record `source_id` of `record_domain`.
    pub fn resolve(&self, reference: &str, record_domain: &str, source_id: &str) -> Option<NodeId> {
        let exact = NodeId::from(reference);
        if self.index.contains_key(&exact) {
            return Some(exact);
        }
        let key = (
            record_domain.to_string(),
            source_id.to_string(),
            reference.to_string(),
        );
        if let Some(id) = self.events_by_record.get(&key) {
            return Some(id.clone());
        }
        self.events_by_id.get(reference).cloned()
    }

    /// Whether a node with `id` exists.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.index.contains_key(id)
    }

    /// The node with `id`.
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Number of nodes created so far.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of distinct domains seen so far.
    pub fn domain_count(&self) -> usize {
        self.domains.len()
    }

    /// Hand over the nodes in construction order.
    pub fn into_nodes(self) -> Vec<GraphNode> {
        self.nodes
    }

    fn push(&mut self, node: GraphNode) {
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::NodeKind;

    #[test]
    fn test_domain_node_is_created_once() {
        let mut resolver = GraphEntityResolver::new();
        let first = resolver.domain_node_id("alpha", "a1");
        let again = resolver.domain_node_id("alpha", "a2");
        assert_eq!(first, again);
        assert_eq!(resolver.node_count(), 1);
        assert_eq!(resolver.domain_count(), 1);
        let node = resolver.node(&first).unwrap();
        assert_eq!(node.kind(), NodeKind::Domain);
        assert_eq!(node.origin_source_id.as_deref(), Some("a1"));
    }

    #[test]
    fn test_domain_names_are_case_sensitive() {
        let mut resolver = GraphEntityResolver::new();
        resolver.domain_node_id("Alpha", "a1");
        resolver.domain_node_id("alpha", "a1");
        assert_eq!(resolver.domain_count(), 2);
    }

    #[test]
    fn test_same_event_id_in_different_records_is_distinct() {
        let mut resolver = GraphEntityResolver::new();
        let a = resolver.event_node_id("alpha", "a1", &Event::new("e1"));
        let b = resolver.event_node_id("beta", "b1", &Event::new("e1"));
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "event:alpha:a1:e1");
        assert_eq!(b.as_str(), "event:beta:b1:e1");
    }

    #[test]
    fn test_same_source_id_in_different_domains_is_distinct() {
        let mut resolver = GraphEntityResolver::new();
        let a = resolver.event_node_id("alpha", "1", &Event::new("e1"));
        let b = resolver.event_node_id("beta", "1", &Event::new("e1"));
        assert_eq!(a.as_str(), "event:alpha:1:e1");
        assert_eq!(b.as_str(), "event:beta:1:e1");
        assert_eq!(resolver.resolve("e1", "alpha", "1"), Some(a));
        assert_eq!(resolver.resolve("e1", "beta", "1"), Some(b));
    }

    #[test]
    fn test_duplicate_event_in_record_gets_suffix() {
        let mut resolver = GraphEntityResolver::new();
        let first = resolver.event_node_id("alpha", "a1", &Event::new("e1"));
        let second = resolver.event_node_id("alpha", "a1", &Event::new("e1"));
        assert_eq!(second.as_str(), "event:alpha:a1:e1#2");
        assert_eq!(resolver.resolve("e1", "alpha", "a1"), Some(first));
    }

    #[test]
    fn test_event_payload_takes_own_domain() {
        let mut resolver = GraphEntityResolver::new();
        let id = resolver.event_node_id("alpha", "a1", &Event::new("x1").in_domain("beta"));
        assert_eq!(id.as_str(), "event:alpha:a1:x1");
        assert_eq!(resolver.node(&id).unwrap().payload.domain(), "beta");
    }

    #[test]
    fn test_resolution_order() {
        let mut resolver = GraphEntityResolver::new();
        let domain = resolver.domain_node_id("alpha", "a1");
        let in_a = resolver.event_node_id("alpha", "a1", &Event::new("e1"));
        let in_b = resolver.event_node_id("beta", "b1", &Event::new("e1"));

        assert_eq!(resolver.resolve("domain:alpha", "beta", "b1"), Some(domain));
        assert_eq!(resolver.resolve("event:beta:b1:e1", "alpha", "a1"), Some(in_b.clone()));
        assert_eq!(resolver.resolve("e1", "beta", "b1"), Some(in_b));
        assert_eq!(resolver.resolve("e1", "gamma", "c1"), Some(in_a));
        assert_eq!(resolver.resolve("e99", "alpha", "a1"), None);
        assert!(resolver.contains(&NodeId::event("beta", "b1", "e1")));
        assert!(!resolver.contains(&NodeId::domain("beta")));
    }
}
