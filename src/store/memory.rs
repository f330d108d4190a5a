//! In-memory quote store.
//!
//! Insertion-ordered, so scan results are deterministic. Used by tests and
//! local development runs that have no database at hand.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Mutex;

use super::{QuoteStore, ScanPage, StoreError};

#[derive(Default)]
pub struct MemoryQuoteStore {
    records: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl MemoryQuoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(String, Map<String, Value>)>> {
        self.records.lock().expect("quote store lock poisoned")
    }
}

#[async_trait]
impl QuoteStore for MemoryQuoteStore {
    async fn create_if_absent(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, ticker: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        let records = self.lock();
        Ok(records
            .iter()
            .find(|(key, _)| key == ticker)
            .map(|(_, record)| record.clone()))
    }

    async fn put(&self, ticker: &str, record: Map<String, Value>) -> Result<(), StoreError> {
        let mut records = self.lock();
        match records.iter_mut().find(|(key, _)| key == ticker) {
            Some((_, existing)) => *existing = record,
            None => records.push((ticker.to_string(), record)),
        }
        Ok(())
    }

    async fn scan(&self, type_filter: Option<&str>, limit: i64) -> Result<ScanPage, StoreError> {
        let records = self.lock();
        let matches: Vec<Map<String, Value>> = records
            .iter()
            .filter(|(_, record)| match type_filter {
                Some(filter) => record.get("type").and_then(Value::as_str) == Some(filter),
                None => true,
            })
            .take(limit.max(0) as usize)
            .map(|(_, record)| record.clone())
            .collect();

        let scanned = matches.len() as u64;
        Ok(ScanPage {
            records: matches,
            scanned,
        })
    }
}
