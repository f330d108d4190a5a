//! Key-value store collaborators.
//!
//! The quote store is an opaque get/put/scan collaborator keyed by ticker.
//! Both components take it as an explicit `dyn QuoteStore` argument so tests
//! can substitute the in-memory implementation.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use memory::MemoryQuoteStore;
pub use postgres::PgQuoteStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored record for '{0}' is not a JSON object")]
    Corrupt(String),
}

/// One scan's worth of records plus the store-reported scanned count.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub records: Vec<Map<String, Value>>,
    pub scanned: u64,
}

#[async_trait]
pub trait QuoteStore: Send + Sync {
    /// Provisions the backing table if it does not exist yet. Runs before a
    /// batch's first write; completion means the table is usable.
    async fn create_if_absent(&self) -> Result<(), StoreError>;

    async fn get(&self, ticker: &str) -> Result<Option<Map<String, Value>>, StoreError>;

    /// Fully replaces any prior record stored under `ticker`.
    async fn put(&self, ticker: &str, record: Map<String, Value>) -> Result<(), StoreError>;

    /// Reads up to `limit` records, restricted to records whose `type` field
    /// equals `type_filter` when one is given.
    async fn scan(&self, type_filter: Option<&str>, limit: i64) -> Result<ScanPage, StoreError>;
}
