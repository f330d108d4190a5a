//! Postgres-backed quote store.
//!
//! One table, `ticker` as the sole primary key, the record itself as JSONB.
//! Upserts rely on `ON CONFLICT (ticker) DO UPDATE`, which makes the
//! per-ticker write atomic.

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use super::{QuoteStore, ScanPage, StoreError};

const TABLE: &str = "stock_data";

pub struct PgQuoteStore {
    pool: PgPool,
}

impl PgQuoteStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Connection check used at startup.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl QuoteStore for PgQuoteStore {
    async fn create_if_absent(&self) -> Result<(), StoreError> {
        let ddl = format!(
            "CREATE TABLE IF NOT EXISTS {} (ticker TEXT PRIMARY KEY, record JSONB NOT NULL)",
            TABLE
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, ticker: &str) -> Result<Option<Map<String, Value>>, StoreError> {
        let sql = format!("SELECT record FROM {} WHERE ticker = $1", TABLE);
        let row: Option<(Value,)> = sqlx::query_as(&sql)
            .bind(ticker)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some((Value::Object(record),)) => Ok(Some(record)),
            Some(_) => Err(StoreError::Corrupt(ticker.to_string())),
            None => Ok(None),
        }
    }

    async fn put(&self, ticker: &str, record: Map<String, Value>) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO {} (ticker, record) VALUES ($1, $2)
             ON CONFLICT (ticker) DO UPDATE SET record = EXCLUDED.record",
            TABLE
        );
        sqlx::query(&sql)
            .bind(ticker)
            .bind(Value::Object(record))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn scan(&self, type_filter: Option<&str>, limit: i64) -> Result<ScanPage, StoreError> {
        let mut sql = format!("SELECT ticker, record FROM {}", TABLE);
        if type_filter.is_some() {
            sql.push_str(" WHERE record->>'type' = $1");
        }
        sql.push_str(" ORDER BY ticker");
        sql.push_str(&format!(" LIMIT {}", limit));

        let mut query = sqlx::query_as::<_, (String, Value)>(&sql);
        if let Some(filter) = type_filter {
            query = query.bind(filter);
        }

        let rows = query.fetch_all(&self.pool).await?;
        let scanned = rows.len() as u64;

        let mut records = Vec::with_capacity(rows.len());
        for (ticker, value) in rows {
            match value {
                Value::Object(record) => records.push(record),
                _ => return Err(StoreError::Corrupt(ticker)),
            }
        }

        Ok(ScanPage { records, scanned })
    }
}
