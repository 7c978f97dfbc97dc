//! Reading document bytes from files, URLs or memory.

use crate::error::FetchError;
use crate::location::Location;
use bytes::Bytes;
use reqwest::StatusCode;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Capability to read the bytes of a document
pub trait Fetcher {
    fn fetch(&self, location: &Location) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}

/// Reads local files with `tokio::fs` and remote documents over HTTP(S)
#[derive(Debug, Clone)]
pub struct SourceFetcher {
    client: reqwest::Client,
}

impl SourceFetcher {
    /// Per-request timeout for remote documents
    pub const TIMEOUT: Duration = Duration::from_secs(30);

    /// Build a fetcher; `insecure` disables TLS certificate verification
    pub fn new(insecure: bool) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(insecure)
            .connect_timeout(Self::TIMEOUT)
            .timeout(Self::TIMEOUT)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for SourceFetcher {
    async fn fetch(&self, location: &Location) -> Result<Bytes, FetchError> {
        match location {
            Location::Path(path) => {
                info!(file = %path.display(), "reading file");
                tokio::fs::read(path)
                    .await
                    .map(Bytes::from)
                    .map_err(|source| FetchError::Io {
                        path: path.clone(),
                        source,
                    })
            }
            Location::Url(url) => {
                info!(%url, "downloading");
                let response = self.client.get(url.clone()).send().await?;
                if response.status() != StatusCode::OK {
                    return Err(FetchError::Status {
                        status: response.status().as_u16(),
                    });
                }
                let body = response.bytes().await?;
                debug!(%url, bytes = body.len(), "downloaded");
                Ok(body)
            }
        }
    }
}

/// Serves documents from an in-memory map, counting fetches per location
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    documents: BTreeMap<String, Bytes>,
    fetches: Mutex<BTreeMap<String, usize>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document under a location
    pub fn insert(&mut self, location: &Location, content: impl Into<Bytes>) -> &mut Self {
        self.documents.insert(location.canonical_key(), content.into());
        self
    }

    /// How many times `location` has been fetched
    pub fn fetch_count(&self, location: &Location) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&location.canonical_key())
            .copied()
            .unwrap_or_default()
    }

    /// Total fetches across all locations
    pub fn total_fetches(&self) -> usize {
        self.fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

impl Fetcher for MemoryFetcher {
    async fn fetch(&self, location: &Location) -> Result<Bytes, FetchError> {
        let key = location.canonical_key();
        *self
            .fetches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default() += 1;
        self.documents.get(&key).cloned().ok_or(FetchError::NotFound(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_fetcher_counts() {
        let location = Location::parse("schemas/a.xsd").unwrap();
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert(&location, "<xs:schema/>");

        let alias = Location::parse("schemas/./a.xsd").unwrap();
        let bytes = fetcher.fetch(&alias).await.expect("registered");
        assert_eq!(&bytes[..], b"<xs:schema/>");
        assert_eq!(fetcher.fetch_count(&location), 1);

        let missing = Location::parse("schemas/b.xsd").unwrap();
        assert!(matches!(fetcher.fetch(&missing).await, Err(FetchError::NotFound(_))));
        assert_eq!(fetcher.total_fetches(), 2);
    }

    #[tokio::test]
    async fn test_source_fetcher_reads_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a.xsd");
        std::fs::write(&path, "<schema/>").expect("write");

        let fetcher = SourceFetcher::new(false).expect("client");
        let bytes = fetcher.fetch(&Location::Path(path)).await.expect("read");
        assert_eq!(&bytes[..], b"<schema/>");

        let missing = Location::Path(dir.path().join("missing.xsd"));
        assert!(matches!(fetcher.fetch(&missing).await, Err(FetchError::Io { .. })));
    }
}
