//! Contradiction registry
//!
//! Contradictions are recorded, never settled. A claim whose references both
//! resolve at registration is stored as `Resolved`; otherwise it is held as
//! `Deferred` and retried once after every record has been folded, since a
//! claim may name an event of a record that is folded later.

use super::resolver::GraphEntityResolver;
use super::{Contradiction, ContradictionStatus, ResolutionPolicy, StructuringWarning};
use crate::record::ContradictionClaim;

/// Collects contradictions raised during one structuring pass.
#[derive(Debug, Default)]
pub struct ContradictionRegistry {
    entries: Vec<Contradiction>,
}

impl ContradictionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a claim raised by record `source_id` of `domain`.
    pub fn register(
        &mut self,
        claim: &ContradictionClaim,
        source_id: &str,
        domain: &str,
        resolver: &GraphEntityResolver,
    ) -> &Contradiction {
        let resolved_a = resolver.resolve(&claim.node_a, domain, source_id);
        let resolved_b = resolver.resolve(&claim.node_b, domain, source_id);

        let (conflicting_nodes, status) = match (resolved_a, resolved_b) {
            (Some(a), Some(b)) => (
                [a.as_str().to_string(), b.as_str().to_string()],
                ContradictionStatus::Resolved,
            ),
            _ => (
                [claim.node_a.clone(), claim.node_b.clone()],
                ContradictionStatus::Deferred,
            ),
        };

        let index = self.entries.len();
        self.entries.push(Contradiction {
            conflicting_nodes,
            nature: claim.nature.clone(),
            resolution: ResolutionPolicy::parse(&claim.proposed_resolution),
            status,
            source_id: source_id.to_string(),
            domain: domain.to_string(),
        });
        &self.entries[index]
    }

    /// Number of registered contradictions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of contradictions still waiting for their references.
    pub fn deferred_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|c| c.status == ContradictionStatus::Deferred)
            .count()
    }

    /// Retry deferred references against the complete node set.
    ///
    /// Returns every contradiction in registration order plus one warning per
    /// contradiction that still references unknown nodes. Those stay
    /// `Deferred`, with their resolvable references rewritten to node ids.
    pub fn finalize(
        mut self,
        resolver: &GraphEntityResolver,
    ) -> (Vec<Contradiction>, Vec<StructuringWarning>) {
        let mut warnings = Vec::new();

        for entry in &mut self.entries {
            if entry.status == ContradictionStatus::Resolved {
                continue;
            }

            let mut unresolved = Vec::new();
            for reference in entry.conflicting_nodes.iter_mut() {
                match resolver.resolve(reference, &entry.domain, &entry.source_id) {
                    Some(id) => *reference = id.as_str().to_string(),
                    None => unresolved.push(reference.clone()),
                }
            }

            if unresolved.is_empty() {
                entry.status = ContradictionStatus::Resolved;
            } else {
                warnings.push(StructuringWarning::UnresolvedContradictionReference {
                    source_id: entry.source_id.clone(),
                    domain: entry.domain.clone(),
                    nature: entry.nature.clone(),
                    unresolved,
                });
            }
        }

        (self.entries, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Event;

    fn resolver_with(events: &[(&str, &str)]) -> GraphEntityResolver {
        let mut resolver = GraphEntityResolver::new();
        for (source_id, event_id) in events {
            resolver.event_node_id("alpha", source_id, &Event::new(*event_id));
        }
        resolver
    }

    #[test]
    fn test_register_resolved_claim() {
        let resolver = resolver_with(&[("a1", "e1"), ("a1", "e2")]);
        let mut registry = ContradictionRegistry::new();
        assert!(registry.is_empty());
        let claim = ContradictionClaim::new("e1", "e2", "origin date", "prefer_first");

        let entry = registry.register(&claim, "a1", "alpha", &resolver);
        assert_eq!(entry.status, ContradictionStatus::Resolved);
        assert_eq!(entry.conflicting_nodes, ["event:alpha:a1:e1", "event:alpha:a1:e2"]);
        assert_eq!(entry.resolution, ResolutionPolicy::PreferFirst);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.deferred_count(), 0);
    }

    #[test]
    fn test_deferred_claim_resolves_at_finalize() {
        let mut resolver = resolver_with(&[("a1", "e1")]);
        let mut registry = ContradictionRegistry::new();
        let claim = ContradictionClaim::new("e1", "e2", "who acted", "");

        assert_eq!(
            registry.register(&claim, "a1", "alpha", &resolver).status,
            ContradictionStatus::Deferred
        );
        assert_eq!(registry.deferred_count(), 1);

        resolver.event_node_id("beta", "b1", &Event::new("e2"));
        let (entries, warnings) = registry.finalize(&resolver);
        assert!(warnings.is_empty());
        assert_eq!(entries[0].status, ContradictionStatus::Resolved);
        assert_eq!(entries[0].conflicting_nodes, ["event:alpha:a1:e1", "event:beta:b1:e2"]);
        assert_eq!(entries[0].resolution, ResolutionPolicy::Coexist);
    }

    #[test]
    fn test_unresolved_claim_warns_and_stays_deferred() {
        let resolver = resolver_with(&[("a1", "e1")]);
        let mut registry = ContradictionRegistry::new();
        registry.register(
            &ContradictionClaim::new("e1", "e42", "timeline", "coexist"),
            "a1",
            "alpha",
            &resolver,
        );

        let (entries, warnings) = registry.finalize(&resolver);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status, ContradictionStatus::Deferred);
        assert_eq!(entries[0].conflicting_nodes, ["event:alpha:a1:e1", "e42"]);
        assert_eq!(warnings.len(), 1);
        match &warnings[0] {
            StructuringWarning::UnresolvedContradictionReference { unresolved, source_id, .. } => {
                assert_eq!(unresolved, &vec!["e42".to_string()]);
                assert_eq!(source_id, "a1");
            }
        }
    }
}
