//! Identity descriptor
//!
//! The attribute set describing the entity being modeled. It is supplied by
//! the caller as a structured document and is read-only for the rest of the
//! run: nothing in this crate mutates a descriptor after it is built.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Paths probed, in order, when deriving the identity reference.
const REFERENCE_PATHS: &[&str] = &[
    "identity.designation",
    "designation",
    "metadata.designation",
    "name",
];

/// Reference used when the descriptor carries no designation at all.
pub const UNIDENTIFIED: &str = "unidentified";

/// Opaque attribute mapping describing the modeled entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityDescriptor {
    attributes: BTreeMap<String, Value>,
}

impl IdentityDescriptor {
    /// Add one attribute while building a descriptor.
    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    /// Load a descriptor from a `.json`, `.yaml`/`.yml` or `.toml` file.
    ///
    /// Files with any other extension are tried as JSON, then YAML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Identity(format!("Failed to read {}: {}", path.display(), e)))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("json") => Self::from_json(&content),
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            Some("toml") => Self::from_toml(&content),
            _ => Self::from_json(&content).or_else(|_| Self::from_yaml(&content)),
        }
    }

    /// Parse a JSON object.
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::Identity(format!("Invalid JSON descriptor: {}", e)))
    }

    /// Parse a YAML mapping.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::Identity(format!("Invalid YAML descriptor: {}", e)))
    }

    /// Parse a TOML table.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| Error::Identity(format!("Invalid TOML descriptor: {}", e)))
    }

    /// Top-level attribute by key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Attribute at a dotted path such as `identity.designation`.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.attributes.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    /// All top-level attributes, in key order.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Whether the descriptor has no attributes at all.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Stable reference for the modeled entity, used in graph metadata.
    ///
    /// Lower-cases the first designation found and replaces spaces and `/`
    /// with `_`. Never time-based, so repeated runs agree.
    pub fn identity_ref(&self) -> String {
        REFERENCE_PATHS
            .iter()
            .filter_map(|path| self.lookup(path))
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|s| !s.is_empty())
            .map(normalize_reference)
            .unwrap_or_else(|| UNIDENTIFIED.to_string())
    }
}

fn normalize_reference(designation: &str) -> String {
    designation.to_lowercase().replace([' ', '/'], "_")
}
