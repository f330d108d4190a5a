//! Batch ingestion: snapshot fetch, decimal coercion, per-ticker upsert.
//!
//! A record failure never aborts the batch; it is logged, counted, and
//! skipped. Only an unreadable source, an unparseable snapshot, or a store
//! failure at batch start is fatal.

pub mod coerce;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::snapshot::{Snapshot, SnapshotSource, SourceError};
use crate::store::{QuoteStore, StoreError};
use crate::util::utc_timestamp;

use coerce::{coerce_decimals, CoerceError};

/// Identifier of the upstream feed, stamped onto every stored record.
pub const DATA_SOURCE: &str = "cortexalpha-market-data";

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("snapshot is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Error)]
enum RecordError {
    #[error(transparent)]
    Coerce(#[from] CoerceError),
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("record has no 'ticker' field")]
    MissingTicker,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One batch run's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub processed_count: u64,
    pub failed_count: u64,
    pub total_symbols: u64,
    pub generated_at: Option<String>,
}

pub async fn run(
    source: &dyn SnapshotSource,
    store: &dyn QuoteStore,
) -> Result<IngestSummary, IngestError> {
    let raw = source.fetch().await?;
    let snapshot = Snapshot::parse(&raw)?;
    store.create_if_absent().await?;

    info!(
        "processing {} symbols generated at {}",
        snapshot.total_symbols,
        snapshot.generated_at.as_deref().unwrap_or("unknown")
    );

    let mut processed_count = 0u64;
    let mut failed_count = 0u64;

    for (symbol, record) in &snapshot.symbols {
        match store_record(store, record).await {
            Ok(()) => {
                processed_count += 1;
                if processed_count % 10 == 0 {
                    debug!("processed {} records", processed_count);
                }
            }
            Err(err) => {
                error!("failed to process {}: {}", symbol, err);
                failed_count += 1;
            }
        }
    }

    info!(
        "processing complete: {} stored, {} failed",
        processed_count, failed_count
    );

    Ok(IngestSummary {
        processed_count,
        failed_count,
        total_symbols: snapshot.total_symbols,
        generated_at: snapshot.generated_at,
    })
}

async fn store_record(store: &dyn QuoteStore, record: &Value) -> Result<(), RecordError> {
    let Value::Object(mut coerced) = coerce_decimals(record.clone())? else {
        return Err(RecordError::NotAnObject);
    };

    let ticker = match coerced.get("ticker").and_then(Value::as_str) {
        Some(ticker) => ticker.to_string(),
        None => return Err(RecordError::MissingTicker),
    };

    coerced.insert("processed_at".to_string(), Value::String(utc_timestamp()));
    coerced.insert(
        "data_source".to_string(),
        Value::String(DATA_SOURCE.to_string()),
    );

    store.put(&ticker, coerced).await?;
    Ok(())
}

/// Wrapper the invoking scheduler consumes on stdout.
#[derive(Debug, Serialize)]
pub struct RunEnvelope {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: String,
}

#[derive(Serialize)]
struct SuccessBody<'a> {
    message: &'static str,
    #[serde(flatten)]
    summary: &'a IngestSummary,
}

#[derive(Serialize)]
struct FailureBody {
    error: &'static str,
    details: String,
}

impl RunEnvelope {
    pub fn from_outcome(
        outcome: &Result<IngestSummary, IngestError>,
    ) -> Result<Self, serde_json::Error> {
        match outcome {
            Ok(summary) => Ok(Self {
                status_code: 200,
                body: serde_json::to_string(&SuccessBody {
                    message: "Stock data processed successfully",
                    summary,
                })?,
            }),
            Err(err) => Ok(Self {
                status_code: 500,
                body: serde_json::to_string(&FailureBody {
                    error: "Failed to process stock data",
                    details: err.to_string(),
                })?,
            }),
        }
    }
}
