//! Source scope resolution
//!
//! Derives the set of source-domain names to query from the identity
//! descriptor. Resolution is a pure function of the descriptor and the
//! configured keys, so the same descriptor always yields the same ordered set.

use crate::config::ScopeConfig;
use crate::error::{Error, Result};
use crate::identity::IdentityDescriptor;
use serde_json::Value;
use std::collections::BTreeSet;

/// Resolves which source domains a run should gather from.
pub trait ScopeResolver: Send + Sync {
    /// Return a non-empty, duplicate-free, deterministically ordered list of
    /// domain names, or `Error::ScopeResolution`.
    fn resolve(&self, identity: &IdentityDescriptor) -> Result<Vec<String>>;
}

/// Reads domain names from well-known descriptor attributes.
///
/// Each configured key is looked up at the top level and inside every
/// top-level object (one level deep). Values may be a string, split on commas
/// and newlines, or an array of strings.
#[derive(Debug, Clone)]
pub struct AttributeScopeResolver {
    domain_keys: Vec<String>,
}

impl AttributeScopeResolver {
    /// Create a resolver from the scope configuration.
    pub fn new(config: &ScopeConfig) -> Self {
        Self {
            domain_keys: config.domain_keys.clone(),
        }
    }

    fn collect(value: &Value, into: &mut BTreeSet<String>) {
        match value {
            Value::String(s) => {
                for name in s.split([',', '\n']) {
                    Self::insert(name, into);
                }
            }
            Value::Array(items) => {
                for item in items {
                    if let Some(name) = item.as_str() {
                        Self::insert(name, into);
                    }
                }
            }
            _ => {}
        }
    }

    fn insert(name: &str, into: &mut BTreeSet<String>) {
        let name = name.trim();
        if !name.is_empty() {
            into.insert(name.to_string());
        }
    }
}

impl Default for AttributeScopeResolver {
    fn default() -> Self {
        Self::new(&ScopeConfig::default())
    }
}

impl ScopeResolver for AttributeScopeResolver {
    fn resolve(&self, identity: &IdentityDescriptor) -> Result<Vec<String>> {
        let mut domains = BTreeSet::new();

        for key in &self.domain_keys {
            if let Some(value) = identity.get(key) {
                Self::collect(value, &mut domains);
            }
            for nested in identity.attributes().values().filter_map(Value::as_object) {
                if let Some(value) = nested.get(key) {
                    Self::collect(value, &mut domains);
                }
            }
        }

        if domains.is_empty() {
            return Err(Error::ScopeResolution(format!(
                "identity '{}' names no source domains (searched keys: {})",
                identity.identity_ref(),
                self.domain_keys.join(", ")
            )));
        }

        tracing::debug!(
            identity = %identity.identity_ref(),
            count = domains.len(),
            "Resolved source scope"
        );
        Ok(domains.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_top_level_array() {
        let identity =
            IdentityDescriptor::default().with_attribute("universes", json!(["beta", "alpha"]));
        let domains = AttributeScopeResolver::default().resolve(&identity).unwrap();
        assert_eq!(domains, vec!["alpha", "beta"]);
    }

    #[test]
    fn test_resolve_nested_and_deduplicated() {
        let identity = IdentityDescriptor::default()
            .with_attribute("domains", json!("alpha, gamma\nbeta"))
            .with_attribute(
                "historical_context",
                json!({ "universes": ["beta", " alpha ", ""] }),
            );
        let domains = AttributeScopeResolver::default().resolve(&identity).unwrap();
        assert_eq!(domains, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let identity = IdentityDescriptor::default()
            .with_attribute("source_domains", json!(["z", "m", "a", "m"]));
        let resolver = AttributeScopeResolver::default();
        let first = resolver.resolve(&identity).unwrap();
        let second = resolver.resolve(&identity).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec!["a", "m", "z"]);
    }

    #[test]
    fn test_resolve_ignores_non_string_entries() {
        let identity =
            IdentityDescriptor::default().with_attribute("universes", json!([1, "alpha", null]));
        let domains = AttributeScopeResolver::default().resolve(&identity).unwrap();
        assert_eq!(domains, vec!["alpha"]);
    }

    #[test]
    fn test_resolve_custom_keys() {
        let resolver = AttributeScopeResolver::new(&ScopeConfig {
            domain_keys: vec!["archives".to_string()],
        });
        let identity = IdentityDescriptor::default()
            .with_attribute("archives", json!(["ledger"]))
            .with_attribute("universes", json!(["ignored"]));
        assert_eq!(resolver.resolve(&identity).unwrap(), vec!["ledger"]);
    }

    #[test]
    fn test_resolve_fails_without_domains() {
        let identity = IdentityDescriptor::default().with_attribute("name", json!("Nobody"));
        let err = AttributeScopeResolver::default().resolve(&identity).unwrap_err();
        assert!(matches!(err, Error::ScopeResolution(_)));
        assert!(err.to_string().contains("nobody"));
    }
}
