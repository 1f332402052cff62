//! Confluence - Multi-source memory confluence engine
//!
//! Confluence gathers records about one modeled entity from several source
//! domains in parallel and folds them into a single deduplicated knowledge
//! graph that separates corroborated patterns (confluences) from conflicting
//! claims (contradictions).
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                         ConfluenceEngine                             │
//! │                                                                      │
//! │  IdentityDescriptor                                                  │
//! │          │                                                           │
//! │  ┌───────▼────────┐                                                  │
//! │  │ ScopeResolver  │  identity ─► ["alpha", "beta", ...]              │
//! │  └───────┬────────┘                                                  │
//! │  ┌───────▼─────────────────────────────────────────────┐             │
//! │  │                 GatheringSwarm                      │             │
//! │  │  ┌──────────────┐ ┌──────────────┐ ┌──────────────┐ │  progress   │
//! │  │  │ fetch(alpha) │ │ fetch(beta)  │ │ fetch(...)   │ ├──────────►  │
//! │  │  └──────┬───────┘ └──────┬───────┘ └──────┬───────┘ │ RunObserver │
//! │  │         └────────────────┴────────────────┘         │             │
//! │  │              join, sort by (domain, source_id)      │             │
//! │  └───────────────────────┬─────────────────────────────┘             │
//! │  ┌───────────────────────▼─────────────────────────────┐             │
//! │  │                 MemoryStructurer                    │             │
//! │  │  GraphEntityResolver · ContradictionRegistry        │             │
//! │  │  ConfluenceDetector                                 │             │
//! │  └───────────────────────┬─────────────────────────────┘             │
//! └──────────────────────────┼───────────────────────────────────────────┘
//!                            ▼
//!                  KnowledgeGraph snapshot (JSON)
//! ```
//!
//! ## Modules
//!
//! - [`scope`]: Source-domain resolution from the identity descriptor
//! - [`swarm`]: Concurrent domain fetching and progress tracking
//! - [`graph`]: Knowledge graph types, structuring, confluences, contradictions
//! - [`engine`]: End-to-end pipeline and snapshot output
//! - [`observer`]: Injected run observers
//! - [`config`]: Configuration management

pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod identity;
pub mod observer;
pub mod record;
pub mod scope;
pub mod swarm;

pub use config::ConfluenceConfig;
pub use engine::{write_snapshot, ConfluenceEngine};
pub use error::{Error, Result};
pub use graph::{KnowledgeGraph, MemoryStructurer};
pub use identity::IdentityDescriptor;
pub use observer::{RunObserver, TracingObserver};
pub use record::SourceRecord;
pub use scope::{AttributeScopeResolver, ScopeResolver};
pub use swarm::{DomainFetcher, FixtureFetcher, GatheringSwarm};
