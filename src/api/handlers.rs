use axum::extract::{Path, Query, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::quote::{self, StockQuote};
use crate::store::QuoteStore;

use super::error::ApiError;

const DEFAULT_LIMIT: i64 = 50;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Raw `limit` value; anything non-numeric or non-positive falls back to
    /// the default.
    pub limit: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl ListParams {
    fn limit(&self) -> i64 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct StockListResponse {
    pub stocks: Vec<StockQuote>,
    pub count: usize,
    pub total_in_db: u64,
}

pub async fn get_stock(
    State(store): State<Arc<dyn QuoteStore>>,
    Path(symbol): Path<String>,
) -> Result<Json<StockQuote>, ApiError> {
    let ticker = symbol.to_uppercase();
    match store.get(&ticker).await? {
        Some(record) => Ok(Json(quote::quote_view(&record)?)),
        None => Err(ApiError::NotFound(format!("Stock {} not found", ticker))),
    }
}

pub async fn list_stocks(
    State(store): State<Arc<dyn QuoteStore>>,
    Query(params): Query<ListParams>,
) -> Result<Json<StockListResponse>, ApiError> {
    let page = store.scan(params.kind.as_deref(), params.limit()).await?;

    let mut stocks = page
        .records
        .iter()
        .map(quote::quote_view)
        .collect::<Result<Vec<_>, _>>()?;
    quote::sort_by_market_weight(&mut stocks);

    let count = stocks.len();
    Ok(Json(StockListResponse {
        stocks,
        count,
        total_in_db: page.scanned,
    }))
}

/// Bare preflight success: no body, whatever the path.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

pub async fn fallback(method: Method) -> Response {
    if method == Method::OPTIONS {
        StatusCode::OK.into_response()
    } else {
        ApiError::NotFound("Endpoint not found".to_string()).into_response()
    }
}
