//! Knowledge graph - the frozen artifact of one confluence run
//!
//! Gathered source records are folded into a graph of domain and event nodes,
//! explicit relationship edges, the confluences derived from them, and the
//! contradictions the sources raised.
//!
//! ## Schema (version `1.0`)
//!
//! ```text
//! KnowledgeGraph
//! ├── nodes[]           { id, kind: "domain" | "event", payload, origin_source_id? }
//! │     ids             domain:<name>, event:<domain>:<source_id>:<event_id>
//! │     domain payload  { name }
//! │     event payload   { event_id, domain, attributes }
//! ├── edges[]           { source_node_id, target_node_id, type, strength? }
//! ├── confluences[]     { pattern, supporting_domains[], node_ids[], occurrences }
//! ├── contradictions[]  { conflicting_nodes[2], nature, resolution, status, source_id, domain }
//! └── metadata          { schema_version, identity_ref, source_count, domain_count,
//!                         created_at, warnings[] }
//! ```
//!
//! A graph is assembled once by `MemoryStructurer` and never mutated after it
//! is returned; a new run produces a new graph.

pub mod confluence;
pub mod contradiction;
pub mod resolver;
pub mod structurer;

pub use confluence::{ConfluenceDetector, RecurringRelationshipDetector};
pub use contradiction::ContradictionRegistry;
pub use resolver::GraphEntityResolver;
pub use structurer::MemoryStructurer;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Version of the serialized graph layout.
pub const GRAPH_SCHEMA_VERSION: &str = "1.0";

/// Edge type linking a domain node to each event it contains.
pub const CONTAINS_EDGE: &str = "contains";

/// Stable identifier of a graph node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Id of the node for domain `name`.
    pub fn domain(name: &str) -> Self {
        Self(format!("domain:{name}"))
    }

    /// Id of event `event_id` from record `source_id` of `domain`.
    ///
    /// A record is identified by its domain and source id together, so
    /// equal source ids gathered from different domains never collide.
    pub fn event(domain: &str, source_id: &str, event_id: &str) -> Self {
        Self(format!("event:{domain}:{source_id}:{event_id}"))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for NodeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Node role in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Container node, one per distinct domain name
    Domain,
    /// One discrete fact from one source record
    Event,
}

/// Kind-specific node content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum NodePayload {
    /// A source domain
    Domain {
        /// Domain name
        name: String,
    },
    /// An event extracted from a source record
    Event {
        /// Producer-assigned event id
        event_id: String,
        /// Domain the event belongs to
        domain: String,
        /// Event attributes as supplied by the source
        attributes: BTreeMap<String, Value>,
    },
}

impl NodePayload {
    /// The kind tag of this payload.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodePayload::Domain { .. } => NodeKind::Domain,
            NodePayload::Event { .. } => NodeKind::Event,
        }
    }

    /// The domain this payload belongs to.
    pub fn domain(&self) -> &str {
        match self {
            NodePayload::Domain { name } => name,
            NodePayload::Event { domain, .. } => domain,
        }
    }
}

/// A node of the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable node id
    pub id: NodeId,
    /// Kind tag and content
    #[serde(flatten)]
    pub payload: NodePayload,
    /// Record that introduced the node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_source_id: Option<String>,
}

impl GraphNode {
    /// The node's kind.
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }
}

/// A directed edge between two existing nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Tail node
    pub source_node_id: NodeId,
    /// Head node
    pub target_node_id: NodeId,
    /// Edge label
    #[serde(rename = "type")]
    pub edge_type: String,
    /// Weight in `[0, 1]`; absent on structural edges
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strength: Option<f32>,
}

/// A relationship pattern corroborated by several domains.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Confluence {
    /// The recurring relationship type
    pub pattern: String,
    /// Domains in which the pattern was observed, sorted
    pub supporting_domains: Vec<String>,
    /// Endpoints of the supporting edges, sorted
    pub node_ids: Vec<NodeId>,
    /// Number of supporting edges
    pub occurrences: usize,
}

/// How a registered contradiction should be settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    /// The first conflicting node wins
    PreferFirst,
    /// The second conflicting node wins
    PreferSecond,
    /// Both claims stand, each within its own context
    Coexist,
    /// Producer-specific policy text
    Custom(String),
}

impl ResolutionPolicy {
    /// Normalize a producer's free-text proposal.
    ///
    /// Recognized spellings are case-insensitive and treat `-` and spaces
    /// like `_`. An empty proposal means `Coexist`.
    pub fn parse(proposal: &str) -> Self {
        let trimmed = proposal.trim();
        let key = trimmed.to_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "" | "coexist" | "both" | "context_dependent" | "multiverse" => Self::Coexist,
            "prefer_first" | "prefer_a" | "first" => Self::PreferFirst,
            "prefer_second" | "prefer_b" | "second" => Self::PreferSecond,
            _ => Self::Custom(trimmed.to_string()),
        }
    }
}

/// Whether a contradiction's node references were found in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionStatus {
    /// Both references point at graph nodes
    Resolved,
    /// At least one reference is still unknown
    Deferred,
}

/// A registered conflict between two claims.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contradiction {
    /// Node ids when resolved, the raw references otherwise
    pub conflicting_nodes: [String; 2],
    /// What the conflict is about
    pub nature: String,
    /// Declared resolution policy
    pub resolution: ResolutionPolicy,
    /// Resolution state of the references
    pub status: ContradictionStatus,
    /// Record that raised the claim
    pub source_id: String,
    /// Domain of that record
    pub domain: String,
}

/// Non-fatal problem found while structuring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum StructuringWarning {
    /// A contradiction still references unknown nodes after all records were folded
    UnresolvedContradictionReference {
        /// Record that raised the claim
        source_id: String,
        /// Domain of that record
        domain: String,
        /// Nature of the contradiction
        nature: String,
        /// References that matched no node
        unresolved: Vec<String>,
    },
}

impl StructuringWarning {
    /// Short machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            StructuringWarning::UnresolvedContradictionReference { .. } => {
                "unresolved_contradiction_reference"
            }
        }
    }
}

impl fmt::Display for StructuringWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructuringWarning::UnresolvedContradictionReference {
                source_id,
                domain,
                nature,
                unresolved,
            } => write!(
                f,
                "Contradiction '{}' raised by record '{}' (domain '{}') references unknown node(s): {}",
                nature,
                source_id,
                domain,
                unresolved.join(", ")
            ),
        }
    }
}

/// Run-level facts about a graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    /// Layout version, `GRAPH_SCHEMA_VERSION`
    pub schema_version: String,
    /// Reference of the modeled identity
    pub identity_ref: String,
    /// Number of source records folded
    pub source_count: usize,
    /// Number of domain nodes
    pub domain_count: usize,
    /// When the graph was assembled
    pub created_at: DateTime<Utc>,
    /// Non-fatal problems found while structuring
    #[serde(default)]
    pub warnings: Vec<StructuringWarning>,
}

/// Node, edge and finding counts of a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSummary {
    /// Total nodes
    pub nodes: usize,
    /// Total edges
    pub edges: usize,
    /// Confluences found
    pub confluences: usize,
    /// Contradictions registered
    pub contradictions: usize,
    /// Warnings raised
    pub warnings: usize,
}

/// Immutable snapshot of one run's merged memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
    confluences: Vec<Confluence>,
    contradictions: Vec<Contradiction>,
    metadata: GraphMetadata,
}

impl KnowledgeGraph {
    pub(crate) fn assemble(
        nodes: Vec<GraphNode>,
        edges: Vec<GraphEdge>,
        confluences: Vec<Confluence>,
        contradictions: Vec<Contradiction>,
        metadata: GraphMetadata,
    ) -> Self {
        Self {
            nodes,
            edges,
            confluences,
            contradictions,
            metadata,
        }
    }

    /// Nodes in construction order.
    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// Edges in construction order.
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Derived confluences, sorted by pattern.
    pub fn confluences(&self) -> &[Confluence] {
        &self.confluences
    }

    /// Registered contradictions in registration order.
    pub fn contradictions(&self) -> &[Contradiction] {
        &self.contradictions
    }

    /// Run metadata.
    pub fn metadata(&self) -> &GraphMetadata {
        &self.metadata
    }

    /// Look up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// All nodes of one kind.
    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &GraphNode> {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    /// Counts for logging and reporting.
    pub fn summary(&self) -> GraphSummary {
        GraphSummary {
            nodes: self.nodes.len(),
            edges: self.edges.len(),
            confluences: self.confluences.len(),
            contradictions: self.contradictions.len(),
            warnings: self.metadata.warnings.len(),
        }
    }

    /// Serialize the snapshot as JSON.
    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_node_ids() {
        assert_eq!(NodeId::domain("alpha").as_str(), "domain:alpha");
        assert_eq!(NodeId::event("alpha", "a1", "e1").as_str(), "event:alpha:a1:e1");
        assert_eq!(NodeId::from("x").to_string(), "x");
    }

    #[test]
    fn test_node_serializes_kind_and_payload() {
        let node = GraphNode {
            id: NodeId::event("alpha", "a1", "e1"),
            payload: NodePayload::Event {
                event_id: "e1".to_string(),
                domain: "alpha".to_string(),
                attributes: BTreeMap::from([("year".to_string(), json!(2008))]),
            },
            origin_source_id: Some("a1".to_string()),
        };
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["id"], "event:alpha:a1:e1");
        assert_eq!(value["kind"], "event");
        assert_eq!(value["payload"]["domain"], "alpha");
        assert_eq!(value["payload"]["attributes"]["year"], 2008);
        assert_eq!(value["origin_source_id"], "a1");
        assert_eq!(node.kind(), NodeKind::Event);
    }

    #[test]
    fn test_edge_serializes_type_field() {
        let edge = GraphEdge {
            source_node_id: NodeId::domain("alpha"),
            target_node_id: NodeId::event("alpha", "a1", "e1"),
            edge_type: CONTAINS_EDGE.to_string(),
            strength: None,
        };
        let value = serde_json::to_value(&edge).unwrap();
        assert_eq!(value["type"], "contains");
        assert!(value.get("strength").is_none());
    }

    #[test]
    fn test_resolution_policy_parse() {
        assert_eq!(ResolutionPolicy::parse("Prefer-First"), ResolutionPolicy::PreferFirst);
        assert_eq!(ResolutionPolicy::parse("prefer b"), ResolutionPolicy::PreferSecond);
        assert_eq!(ResolutionPolicy::parse(""), ResolutionPolicy::Coexist);
        assert_eq!(ResolutionPolicy::parse("multiverse"), ResolutionPolicy::Coexist);
        assert_eq!(
            ResolutionPolicy::parse(" Trust the later edition "),
            ResolutionPolicy::Custom("Trust the later edition".to_string())
        );
    }

    #[test]
    fn test_warning_display_names_references() {
        let warning = StructuringWarning::UnresolvedContradictionReference {
            source_id: "a1".to_string(),
            domain: "alpha".to_string(),
            nature: "origin date".to_string(),
            unresolved: vec!["e42".to_string()],
        };
        let msg = warning.to_string();
        assert!(msg.contains("a1"));
        assert!(msg.contains("e42"));
        assert_eq!(warning.code(), "unresolved_contradiction_reference");
        assert_eq!(
            serde_json::to_value(&warning).unwrap()["code"],
            "unresolved_contradiction_reference"
        );
    }
}
