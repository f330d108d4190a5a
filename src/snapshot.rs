//! Snapshot document model and blob-store access.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

/// One batch snapshot as produced upstream: batch metadata plus a mapping of
/// ticker symbol to raw record. Metadata may be absent in malformed feeds.
#[derive(Debug, Clone, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub total_symbols: u64,
    #[serde(default)]
    pub symbols: Map<String, Value>,
}

impl Snapshot {
    pub fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to fetch snapshot: {0}")]
    Http(#[from] reqwest::Error),
    #[error("snapshot fetch returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("failed to read snapshot file {path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<u8>, SourceError>;
}

pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
}

impl HttpSnapshotSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotSource {
    async fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        let response = self.client.get(&self.url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status(response.status()));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

pub struct FileSnapshotSource {
    path: PathBuf,
}

impl FileSnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotSource for FileSnapshotSource {
    async fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        tokio::fs::read(&self.path)
            .await
            .map_err(|source| SourceError::File {
                path: self.path.clone(),
                source,
            })
    }
}

/// Picks a source implementation for the configured snapshot location.
pub fn source_for(url: &str) -> Box<dyn SnapshotSource> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Box::new(HttpSnapshotSource::new(url))
    } else {
        Box::new(FileSnapshotSource::new(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_document() {
        let snapshot = Snapshot::parse(
            br#"{
                "generated_at": "2025-07-01T12:00:00Z",
                "total_symbols": 2,
                "symbols": {
                    "AAPL": {"ticker": "AAPL", "price": 189.5},
                    "SPY": {"ticker": "SPY", "type": "etf"}
                }
            }"#,
        )
        .unwrap();

        assert_eq!(snapshot.generated_at.as_deref(), Some("2025-07-01T12:00:00Z"));
        assert_eq!(snapshot.total_symbols, 2);
        assert_eq!(snapshot.symbols.len(), 2);
    }

    #[test]
    fn tolerates_missing_metadata() {
        let snapshot = Snapshot::parse(b"{}").unwrap();
        assert!(snapshot.generated_at.is_none());
        assert_eq!(snapshot.total_symbols, 0);
        assert!(snapshot.symbols.is_empty());
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(Snapshot::parse(b"not json").is_err());
    }

    #[tokio::test]
    async fn file_source_reports_missing_path() {
        let source = FileSnapshotSource::new("/nonexistent/usa_top_stocks.json");
        assert!(matches!(
            source.fetch().await,
            Err(SourceError::File { .. })
        ));
    }
}
