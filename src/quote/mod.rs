//! Field normalization from stored snapshot records to the served quote
//! shape.
//!
//! Stored records are loosely typed: canonical fields may be absent, and a
//! numeric field may arrive as a JSON number or a numeric string. `RawQuote`
//! captures that optionality explicitly; `StockQuote` is the fully-populated
//! shape served to callers, with every fallback resolved here.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::util::parse_decimal;

const NEUTRAL_RSI: Decimal = dec!(50);
const DEFAULT_KIND: &str = "stock";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReshapeError {
    #[error("record field '{0}' is missing")]
    MissingField(&'static str),
    #[error("record field '{0}' has an unusable value")]
    InvalidField(&'static str),
}

/// One stored record with the canonical source fields extracted and their
/// optionality intact. Only `ticker` is structurally required.
#[derive(Debug, Clone, Default)]
pub struct RawQuote {
    pub ticker: String,
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub pct_change: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub pe: Option<Decimal>,
    pub day_high: Option<Decimal>,
    pub day_low: Option<Decimal>,
    pub year_high: Option<Decimal>,
    pub year_low: Option<Decimal>,
    pub avg_volume_20d: Option<Decimal>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub rsi: Option<Decimal>,
    pub ma20: Option<Decimal>,
    pub ma50: Option<Decimal>,
    pub ma200: Option<Decimal>,
    pub last_updated: Option<String>,
    pub kind: Option<String>,
}

impl RawQuote {
    pub fn from_document(doc: &Map<String, Value>) -> Result<Self, ReshapeError> {
        Ok(Self {
            ticker: text_field(doc, "ticker")?.ok_or(ReshapeError::MissingField("ticker"))?,
            name: text_field(doc, "name")?,
            price: decimal_field(doc, "price")?,
            pct_change: decimal_field(doc, "pct_change")?,
            volume: decimal_field(doc, "volume")?,
            market_cap: decimal_field(doc, "market_cap")?,
            pe: decimal_field(doc, "PE")?,
            day_high: decimal_field(doc, "day_high")?,
            day_low: decimal_field(doc, "day_low")?,
            year_high: decimal_field(doc, "year_high")?,
            year_low: decimal_field(doc, "year_low")?,
            avg_volume_20d: decimal_field(doc, "avg_volume_20d")?,
            sector: text_field(doc, "sector")?,
            industry: text_field(doc, "industry")?,
            rsi: decimal_field(doc, "RSI")?,
            ma20: decimal_field(doc, "20DMA")?,
            ma50: decimal_field(doc, "50DMA")?,
            ma200: decimal_field(doc, "200DMA")?,
            last_updated: text_field(doc, "last_updated")?,
            kind: text_field(doc, "type")?,
        })
    }

    /// Resolves the documented fallbacks into a fully-populated view. A
    /// missing required field (name, price, change, volume, day range) is a
    /// value-mismatch error, not a panic.
    pub fn into_view(self) -> Result<StockQuote, ReshapeError> {
        let day_high = self.day_high.ok_or(ReshapeError::MissingField("day_high"))?;
        let day_low = self.day_low.ok_or(ReshapeError::MissingField("day_low"))?;
        let volume = count_value(
            self.volume.ok_or(ReshapeError::MissingField("volume"))?,
            "volume",
        )?;
        let avg_volume = match self.avg_volume_20d {
            Some(value) => count_value(value, "avg_volume_20d")?,
            None => volume,
        };

        Ok(StockQuote {
            symbol: self.ticker,
            name: self.name.ok_or(ReshapeError::MissingField("name"))?,
            price: self.price.ok_or(ReshapeError::MissingField("price"))?,
            change: self
                .pct_change
                .ok_or(ReshapeError::MissingField("pct_change"))?,
            volume,
            market_cap: self.market_cap.unwrap_or(Decimal::ZERO),
            pe: self.pe.unwrap_or(Decimal::ZERO),
            day_high,
            day_low,
            year_high: self.year_high.unwrap_or(day_high),
            year_low: self.year_low.unwrap_or(day_low),
            avg_volume,
            sector: self.sector.unwrap_or_default(),
            industry: self.industry.unwrap_or_default(),
            rsi: self.rsi.unwrap_or(NEUTRAL_RSI),
            ma20: self.ma20.unwrap_or(Decimal::ZERO),
            ma50: self.ma50.unwrap_or(Decimal::ZERO),
            ma200: self.ma200.unwrap_or(Decimal::ZERO),
            last_updated: self.last_updated.unwrap_or_default(),
            kind: self.kind.unwrap_or_else(|| DEFAULT_KIND.to_string()),
        })
    }
}

/// The canonical, always-complete quote served to API callers. Every field
/// is populated; numeric fields serialize as JSON numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    pub symbol: String,
    pub name: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub change: Decimal,
    pub volume: u64,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub market_cap: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub pe: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub day_high: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub day_low: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub year_high: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub year_low: Decimal,
    pub avg_volume: u64,
    pub sector: String,
    pub industry: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub rsi: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub ma20: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub ma50: Decimal,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub ma200: Decimal,
    pub last_updated: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Reshapes one stored record into the served quote shape.
pub fn quote_view(doc: &Map<String, Value>) -> Result<StockQuote, ReshapeError> {
    RawQuote::from_document(doc)?.into_view()
}

/// Sorts descending by market cap, using traded volume as the key for
/// records whose market cap is the zero sentinel. The sort is stable, so
/// scan order breaks ties.
pub fn sort_by_market_weight(quotes: &mut [StockQuote]) {
    quotes.sort_by(|a, b| rank_weight(b).cmp(&rank_weight(a)));
}

fn rank_weight(quote: &StockQuote) -> Decimal {
    if quote.market_cap > Decimal::ZERO {
        quote.market_cap
    } else {
        Decimal::from(quote.volume)
    }
}

fn decimal_field(
    doc: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<Decimal>, ReshapeError> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => parse_decimal(&number.to_string())
            .map(Some)
            .map_err(|_| ReshapeError::InvalidField(key)),
        Some(Value::String(text)) => parse_decimal(text.trim())
            .map(Some)
            .map_err(|_| ReshapeError::InvalidField(key)),
        Some(_) => Err(ReshapeError::InvalidField(key)),
    }
}

fn text_field(
    doc: &Map<String, Value>,
    key: &'static str,
) -> Result<Option<String>, ReshapeError> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(text.clone())),
        Some(_) => Err(ReshapeError::InvalidField(key)),
    }
}

fn count_value(value: Decimal, key: &'static str) -> Result<u64, ReshapeError> {
    value
        .trunc()
        .to_u64()
        .ok_or(ReshapeError::InvalidField(key))
}
