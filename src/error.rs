//! Confluence error types

use crate::swarm::FetchError;
use thiserror::Error;

/// Confluence error type
#[derive(Error, Debug)]
pub enum Error {
    /// The identity descriptor does not name any source domain
    #[error("Scope resolution error: {0}")]
    ScopeResolution(String),

    /// A domain fetch failed; the whole gather is discarded
    #[error("Domain fetch error for '{domain}': {cause}")]
    DomainFetch {
        /// Domain whose fetch failed
        domain: String,
        /// Underlying fetcher error
        #[source]
        cause: FetchError,
    },

    /// A relationship referenced a node that was never created
    #[error(
        "Dangling edge in record '{source_id}' (domain '{domain}'): \
         node '{missing}' not found for relationship '{relationship_type}'"
    )]
    DanglingEdge {
        /// Source record that carried the relationship
        source_id: String,
        /// Domain of that record
        domain: String,
        /// The endpoint reference that did not resolve
        missing: String,
        /// Relationship type of the rejected edge
        relationship_type: String,
    },

    /// A source record violates the producer contract
    #[error("Invalid source record '{source_id}': {reason}")]
    InvalidRecord {
        /// Offending record
        source_id: String,
        /// What is wrong with it
        reason: String,
    },

    /// The caller cancelled the gather
    #[error("Gathering cancelled")]
    Cancelled,

    /// Identity descriptor could not be loaded
    #[error("Identity error: {0}")]
    Identity(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Confluence operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dangling_edge_message_names_context() {
        let err = Error::DanglingEdge {
            source_id: "beta-1".to_string(),
            domain: "beta".to_string(),
            missing: "e99".to_string(),
            relationship_type: "echoes".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("beta-1"));
        assert!(msg.contains("'beta'"));
        assert!(msg.contains("e99"));
        assert!(msg.contains("echoes"));
    }

    #[test]
    fn test_domain_fetch_keeps_source() {
        use std::error::Error as _;

        let err = Error::DomainFetch {
            domain: "alpha".to_string(),
            cause: FetchError::Unavailable("archive offline".to_string()),
        };
        assert!(err.to_string().contains("alpha"));
        assert!(err.source().is_some());
    }
}
