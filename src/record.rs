//! Source record data types
//!
//! A `SourceRecord` is one unit returned by a domain fetcher: the events it
//! describes, the relationships it asserts between nodes, and any conflicting
//! claims it raises. Records are immutable once returned and only live long
//! enough to be folded into the knowledge graph.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One fetched unit of source material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRecord {
    /// Identifier assigned by the producer
    pub source_id: String,
    /// Domain this record was gathered from
    #[serde(default, alias = "universe")]
    pub domain: String,
    /// Facts extracted from the record
    #[serde(default)]
    pub events: Vec<Event>,
    /// Edges asserted by the record
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    /// Conflicts raised by the record
    #[serde(default, alias = "contradictions")]
    pub contradiction_claims: Vec<ContradictionClaim>,
}

impl SourceRecord {
    /// Create an empty record for a domain.
    pub fn new(source_id: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            domain: domain.into(),
            events: Vec::new(),
            relationships: Vec::new(),
            contradiction_claims: Vec::new(),
        }
    }

    /// Add an event.
    pub fn with_event(mut self, event: Event) -> Self {
        self.events.push(event);
        self
    }

    /// Add a relationship.
    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    /// Add a contradiction claim.
    pub fn with_claim(mut self, claim: ContradictionClaim) -> Self {
        self.contradiction_claims.push(claim);
        self
    }

    /// Check the producer contract: named domain, non-empty event ids and
    /// finite relationship strengths within `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Error::InvalidRecord {
            source_id: self.source_id.clone(),
            reason,
        };

        if self.source_id.trim().is_empty() {
            return Err(invalid("source_id is empty".to_string()));
        }
        if self.domain.trim().is_empty() {
            return Err(invalid("domain is empty".to_string()));
        }
        for event in &self.events {
            if event.id.trim().is_empty() {
                return Err(invalid("event with empty id".to_string()));
            }
            if matches!(&event.domain, Some(d) if d.trim().is_empty()) {
                return Err(invalid(format!("event '{}' has an empty domain", event.id)));
            }
        }
        for rel in &self.relationships {
            if !rel.strength.is_finite() || !(0.0..=1.0).contains(&rel.strength) {
                return Err(invalid(format!(
                    "relationship '{}' {} -> {} has strength {} outside [0, 1]",
                    rel.relationship_type, rel.source_node_id, rel.target_node_id, rel.strength
                )));
            }
            if rel.relationship_type.trim().is_empty() {
                return Err(invalid(format!(
                    "relationship {} -> {} has no type",
                    rel.source_node_id, rel.target_node_id
                )));
            }
        }
        Ok(())
    }
}

/// Smallest fact unit extracted from a source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Producer-assigned event id, unique within its record
    pub id: String,
    /// Origin domain; defaults to the record's domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Free-form event attributes
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
}

impl Event {
    /// Create an event with no attributes.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain: None,
            attributes: BTreeMap::new(),
        }
    }

    /// Tag the event with an explicit origin domain.
    pub fn in_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Add an attribute.
    pub fn attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}

/// Directed, weighted edge candidate between two node references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    /// Source endpoint (event id or graph node id)
    #[serde(alias = "source_id")]
    pub source_node_id: String,
    /// Target endpoint (event id or graph node id)
    #[serde(alias = "target_id")]
    pub target_node_id: String,
    /// Edge label
    pub relationship_type: String,
    /// Weight in `[0, 1]`
    pub strength: f32,
}

impl Relationship {
    /// Create a relationship between two references.
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relationship_type: impl Into<String>,
        strength: f32,
    ) -> Self {
        Self {
            source_node_id: source.into(),
            target_node_id: target.into(),
            relationship_type: relationship_type.into(),
            strength,
        }
    }
}

/// A conflict raised by a source record, not yet registered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionClaim {
    /// First conflicting reference
    #[serde(alias = "node1")]
    pub node_a: String,
    /// Second conflicting reference
    #[serde(alias = "node2")]
    pub node_b: String,
    /// What the conflict is about
    #[serde(default)]
    pub nature: String,
    /// How the producer suggests resolving it
    #[serde(default, alias = "resolution")]
    pub proposed_resolution: String,
}

impl ContradictionClaim {
    /// Create a claim between two references.
    pub fn new(
        node_a: impl Into<String>,
        node_b: impl Into<String>,
        nature: impl Into<String>,
        proposed_resolution: impl Into<String>,
    ) -> Self {
        Self {
            node_a: node_a.into(),
            node_b: node_b.into(),
            nature: nature.into(),
            proposed_resolution: proposed_resolution.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_well_formed_record() {
        let record = SourceRecord::new("alpha-1", "alpha")
            .with_event(Event::new("e1"))
            .with_relationship(Relationship::new("e1", "e1", "self_ref", 1.0));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_strength_out_of_range() {
        let record = SourceRecord::new("alpha-1", "alpha")
            .with_relationship(Relationship::new("e1", "e2", "echoes", 1.5));
        let err = record.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidRecord { .. }));
        assert!(err.to_string().contains("alpha-1"));
    }

    #[test]
    fn test_validate_rejects_nan_strength() {
        let record = SourceRecord::new("alpha-1", "alpha")
            .with_relationship(Relationship::new("e1", "e2", "echoes", f32::NAN));
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_domain_and_event_id() {
        assert!(SourceRecord::new("x", " ").validate().is_err());
        let record = SourceRecord::new("x", "alpha").with_event(Event::new(""));
        assert!(record.validate().is_err());
        let record = SourceRecord::new("x", "alpha").with_event(Event::new("e1").in_domain(""));
        assert!(record.validate().is_err());
    }

    #[test]
    fn test_deserialize_accepts_legacy_field_names() {
        let record: SourceRecord = serde_json::from_str(
            r#"{
                "source_id": "s1",
                "universe": "alpha",
                "events": [{"id": "e1", "attributes": {"year": 2008}}],
                "relationships": [
                    {"source_id": "e1", "target_id": "e1", "relationship_type": "self_ref", "strength": 1.0}
                ],
                "contradictions": [
                    {"node1": "e1", "node2": "e2", "nature": "date", "resolution": "prefer_first"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(record.domain, "alpha");
        assert_eq!(record.relationships[0].source_node_id, "e1");
        assert_eq!(record.contradiction_claims[0].node_b, "e2");
        assert_eq!(record.contradiction_claims[0].proposed_resolution, "prefer_first");
        assert_eq!(record.events[0].attributes["year"], 2008);
    }

    #[test]
    fn test_deserialize_defaults_missing_collections() {
        let record: SourceRecord = serde_json::from_str(r#"{"source_id": "s1"}"#).unwrap();
        assert!(record.domain.is_empty());
        assert!(record.events.is_empty());
        assert!(record.relationships.is_empty());
        assert!(record.contradiction_claims.is_empty());
    }
}
