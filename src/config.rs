//! Confluence configuration management

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main Confluence configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfluenceConfig {
    /// Source scope resolution
    #[serde(default)]
    pub scope: ScopeConfig,

    /// Gathering swarm
    #[serde(default)]
    pub swarm: SwarmConfig,

    /// Confluence detection
    #[serde(default)]
    pub confluence: DetectionConfig,

    /// Snapshot output
    #[serde(default)]
    pub output: OutputConfig,
}

impl ConfluenceConfig {
    /// Load and validate a configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Reject settings the engine cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.scope.domain_keys.is_empty() {
            return Err(Error::Config(
                "scope.domain_keys must name at least one descriptor key".to_string(),
            ));
        }
        if self.confluence.min_domains < 2 {
            return Err(Error::Config(format!(
                "confluence.min_domains must be at least 2, got {}",
                self.confluence.min_domains
            )));
        }
        if self.swarm.progress_interval_ms == 0 {
            return Err(Error::Config(
                "swarm.progress_interval_ms must be greater than 0".to_string(),
            ));
        }
        if !(self.swarm.progress_report_step > 0.0 && self.swarm.progress_report_step <= 100.0)
        {
            return Err(Error::Config(format!(
                "swarm.progress_report_step must be in (0, 100], got {}",
                self.swarm.progress_report_step
            )));
        }
        Ok(())
    }
}

/// Which descriptor attributes name source domains
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopeConfig {
    /// Keys searched at the top level and one level deep
    pub domain_keys: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            domain_keys: vec![
                "universes".to_string(),
                "domains".to_string(),
                "source_domains".to_string(),
            ],
        }
    }
}

/// Gathering swarm configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmConfig {
    /// Maximum fetches in flight at once (0 = one per domain)
    pub max_concurrent_fetches: usize,

    /// How often the progress monitor polls, in milliseconds
    pub progress_interval_ms: u64,

    /// Minimum progress advance (percentage points) between reports
    pub progress_report_step: f64,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: 8,
            progress_interval_ms: 500,
            progress_report_step: 5.0,
        }
    }
}

/// Confluence detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Distinct domains a relationship type needs before it is a confluence
    pub min_domains: usize,

    /// Edge types that are structural and never form a pattern
    pub ignored_types: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_domains: 2,
            ignored_types: vec![crate::graph::CONTAINS_EDGE.to_string()],
        }
    }
}

/// Snapshot output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Where `run` writes the knowledge graph
    pub path: PathBuf,

    /// Pretty-print the JSON snapshot
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("memory/structured/knowledge_graph.json"),
            pretty: true,
        }
    }
}
