//! Domain fetchers
//!
//! Source acquisition is pluggable: the swarm only needs something that,
//! given a domain name, asynchronously returns zero or more source records.
//! Two implementations ship with the crate:
//!
//! - `StaticFetcher` serves canned responses from memory, with optional
//!   per-domain failures and delays.
//! - `FixtureFetcher` reads JSON record files from a directory tree.

use crate::record::SourceRecord;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Failure local to one domain fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Source files could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Source material was malformed
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// File or location that failed to parse
        path: String,
        /// Parser message
        message: String,
    },

    /// The source refused or could not serve the domain
    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Fetches the source records of one domain.
#[async_trait]
pub trait DomainFetcher: Send + Sync {
    /// Return every record available for `domain`.
    async fn fetch(&self, domain: &str) -> Result<Vec<SourceRecord>, FetchError>;
}

/// In-memory fetcher with canned responses.
#[derive(Debug, Default, Clone)]
pub struct StaticFetcher {
    responses: HashMap<String, Vec<SourceRecord>>,
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
}

impl StaticFetcher {
    /// Create a fetcher with no responses; unknown domains yield no records.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `records` for `domain`.
    pub fn with_records(mut self, domain: impl Into<String>, records: Vec<SourceRecord>) -> Self {
        self.responses.entry(domain.into()).or_default().extend(records);
        self
    }

    /// Make fetches of `domain` fail with `FetchError::Unavailable`.
    pub fn with_failure(mut self, domain: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(domain.into(), message.into());
        self
    }

    /// Delay the response for `domain`.
    pub fn with_delay(mut self, domain: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(domain.into(), delay);
        self
    }
}

#[async_trait]
impl DomainFetcher for StaticFetcher {
    async fn fetch(&self, domain: &str) -> Result<Vec<SourceRecord>, FetchError> {
        if let Some(delay) = self.delays.get(domain) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(domain) {
            return Err(FetchError::Unavailable(message.clone()));
        }
        Ok(self.responses.get(domain).cloned().unwrap_or_default())
    }
}

/// Reads source records from JSON fixtures on disk.
///
/// Layout under the root directory:
/// ```text
/// <root>/
/// ├── <domain>.json          # one record or an array of records
/// └── <domain>/
///     ├── <any>.json         # one record or an array of records
///     └── ...
/// ```
/// A domain with neither file nor directory has no records.
#[derive(Debug, Clone)]
pub struct FixtureFetcher {
    root: PathBuf,
}

impl FixtureFetcher {
    /// Create a fetcher rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the fixtures.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_records(path: &Path) -> Result<Vec<SourceRecord>, FetchError> {
        let content = tokio::fs::read_to_string(path).await?;
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| FetchError::Parse {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;

        let parsed = if value.is_array() {
            serde_json::from_value::<Vec<SourceRecord>>(value)
        } else {
            serde_json::from_value::<SourceRecord>(value).map(|r| vec![r])
        };
        parsed.map_err(|e| FetchError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    async fn json_files_in(dir: &Path) -> Result<Vec<PathBuf>, FetchError> {
        let mut files = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

#[async_trait]
impl DomainFetcher for FixtureFetcher {
    async fn fetch(&self, domain: &str) -> Result<Vec<SourceRecord>, FetchError> {
        if domain.contains(['/', '\\']) || domain == "." || domain == ".." {
            return Err(FetchError::Unavailable(format!(
                "domain name '{}' cannot map to a fixture path",
                domain
            )));
        }

        let mut files = Vec::new();
        let single = self.root.join(format!("{domain}.json"));
        if tokio::fs::try_exists(&single).await? {
            files.push(single);
        }
        let dir = self.root.join(domain);
        if tokio::fs::try_exists(&dir).await? && tokio::fs::metadata(&dir).await?.is_dir() {
            files.extend(Self::json_files_in(&dir).await?);
        }

        if files.is_empty() {
            tracing::debug!(domain = %domain, root = %self.root.display(), "No fixtures for domain");
            return Ok(Vec::new());
        }

        let batches =
            futures::future::try_join_all(files.iter().map(|path| Self::read_records(path)))
                .await?;
        Ok(batches.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Event;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_static_fetcher_serves_records() {
        let fetcher = StaticFetcher::new().with_records(
            "alpha",
            vec![SourceRecord::new("a1", "alpha").with_event(Event::new("e1"))],
        );
        let records = fetcher.fetch("alpha").await.unwrap();
        assert_eq!(records.len(), 1);
        assert!(fetcher.fetch("unknown").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_fetcher_failure() {
        let fetcher = StaticFetcher::new()
            .with_records("alpha", vec![SourceRecord::new("a1", "alpha")])
            .with_failure("alpha", "archive offline");
        let err = fetcher.fetch("alpha").await.unwrap_err();
        assert!(matches!(err, FetchError::Unavailable(ref m) if m == "archive offline"));
    }

    #[tokio::test]
    async fn test_fixture_fetcher_single_file_and_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("alpha.json"),
            r#"{"source_id": "a1", "domain": "alpha", "events": [{"id": "e1"}]}"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::write(
            dir.path().join("alpha").join("more.json"),
            r#"[{"source_id": "a2", "domain": "alpha"}, {"source_id": "a3", "domain": "alpha"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("alpha").join("notes.txt"), "ignored").unwrap();

        let fetcher = FixtureFetcher::new(dir.path());
        let records = fetcher.fetch("alpha").await.unwrap();
        let ids: Vec<_> = records.iter().map(|r| r.source_id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
    }

    #[tokio::test]
    async fn test_fixture_fetcher_missing_domain_is_empty() {
        let dir = TempDir::new().unwrap();
        let fetcher = FixtureFetcher::new(dir.path());
        assert_eq!(fetcher.root(), dir.path());
        assert!(fetcher.fetch("beta").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fixture_fetcher_malformed_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("beta.json"), "{ not json").unwrap();
        let fetcher = FixtureFetcher::new(dir.path());
        let err = fetcher.fetch("beta").await.unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
    }

    #[tokio::test]
    async fn test_fixture_fetcher_rejects_path_like_domain() {
        let dir = TempDir::new().unwrap();
        let fetcher = FixtureFetcher::new(dir.path());
        let err = fetcher.fetch("../etc").await.unwrap_err();
        assert!(matches!(err, FetchError::Unavailable(_)));
    }
}
