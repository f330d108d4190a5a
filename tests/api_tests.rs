//! Integration tests for the quote API, driven through the router with an
//! in-memory store.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tower::ServiceExt;

use stockdata::api;
use stockdata::store::{MemoryQuoteStore, QuoteStore};

async fn seeded_app(records: Vec<Value>) -> Router {
    let store = MemoryQuoteStore::new();
    for record in records {
        let map = as_object(record);
        let ticker = map["ticker"].as_str().expect("seed ticker").to_string();
        store.put(&ticker, map).await.expect("seed record");
    }
    api::create_router(Arc::new(store))
}

fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("seed records must be objects, got {}", other),
    }
}

fn full_record(ticker: &str) -> Value {
    json!({
        "ticker": ticker,
        "name": format!("{} Inc.", ticker),
        "price": 189.5,
        "pct_change": -1.25,
        "volume": 52000000,
        "market_cap": 2950000000000u64,
        "PE": 31.4,
        "day_high": 191.0,
        "day_low": 187.2,
        "year_high": 199.6,
        "year_low": 164.1,
        "avg_volume_20d": 48000000,
        "sector": "Technology",
        "industry": "Consumer Electronics",
        "RSI": 62.8,
        "20DMA": 188.1,
        "50DMA": 182.7,
        "200DMA": 175.3,
        "last_updated": "2025-07-01T12:00:00Z",
        "type": "stock"
    })
}

fn minimal_record(ticker: &str) -> Value {
    json!({
        "ticker": ticker,
        "name": format!("{} Inc.", ticker),
        "price": 10.5,
        "pct_change": 0.2,
        "volume": 1000,
        "day_high": 11.0,
        "day_low": 10.0
    })
}

fn weighted_record(ticker: &str, market_cap: u64, volume: u64) -> Value {
    let mut map = as_object(minimal_record(ticker));
    map.insert("market_cap".into(), json!(market_cap));
    map.insert("volume".into(), json!(volume));
    Value::Object(map)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = app.clone().oneshot(request).await.expect("request");
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    (status, body.to_vec())
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(
        app,
        Request::builder().uri(uri).body(Body::empty()).unwrap(),
    )
    .await;
    let value = serde_json::from_slice(&body).expect("JSON body");
    (status, value)
}

#[tokio::test]
async fn single_quote_has_canonical_shape() {
    let app = seeded_app(vec![full_record("AAPL")]).await;
    let (status, body) = get_json(&app, "/stocks/AAPL").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], json!("AAPL"));
    assert_eq!(body["name"], json!("AAPL Inc."));
    assert_eq!(body["price"].to_string(), "189.5");
    assert_eq!(body["change"].to_string(), "-1.25");
    assert_eq!(body["volume"], json!(52000000));
    assert_eq!(body["marketCap"], json!(2950000000000u64));
    assert_eq!(body["pe"].to_string(), "31.4");
    assert_eq!(body["dayHigh"].to_string(), "191.0");
    assert_eq!(body["dayLow"].to_string(), "187.2");
    assert_eq!(body["yearHigh"].to_string(), "199.6");
    assert_eq!(body["yearLow"].to_string(), "164.1");
    assert_eq!(body["avgVolume"], json!(48000000));
    assert_eq!(body["sector"], json!("Technology"));
    assert_eq!(body["industry"], json!("Consumer Electronics"));
    assert_eq!(body["rsi"].to_string(), "62.8");
    assert_eq!(body["ma20"].to_string(), "188.1");
    assert_eq!(body["ma50"].to_string(), "182.7");
    assert_eq!(body["ma200"].to_string(), "175.3");
    assert_eq!(body["lastUpdated"], json!("2025-07-01T12:00:00Z"));
    assert_eq!(body["type"], json!("stock"));
}

#[tokio::test]
async fn symbol_is_uppercased() {
    let app = seeded_app(vec![full_record("AAPL")]).await;
    let (status, body) = get_json(&app, "/stocks/aapl").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["symbol"], json!("AAPL"));
}

#[tokio::test]
async fn unknown_ticker_returns_404_naming_symbol() {
    let app = seeded_app(vec![]).await;
    let (status, body) = get_json(&app, "/stocks/AAPL").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Stock AAPL not found"));
}

#[tokio::test]
async fn fallbacks_applied_in_single_quote() {
    let app = seeded_app(vec![minimal_record("TINY")]).await;
    let (status, body) = get_json(&app, "/stocks/TINY").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["marketCap"].to_string(), "0");
    assert_eq!(body["pe"].to_string(), "0");
    assert_eq!(body["rsi"].to_string(), "50");
    assert_eq!(body["yearHigh"].to_string(), "11.0");
    assert_eq!(body["yearLow"].to_string(), "10.0");
    assert_eq!(body["avgVolume"], json!(1000));
    assert_eq!(body["sector"], json!(""));
    assert_eq!(body["type"], json!("stock"));
}

#[tokio::test]
async fn missing_required_field_returns_500() {
    let mut broken = as_object(minimal_record("BRKN"));
    broken.remove("price");
    let app = seeded_app(vec![Value::Object(broken)]).await;

    let (status, body) = send(
        &app,
        Request::builder()
            .uri("/stocks/BRKN")
            .header(header::ORIGIN, "http://localhost:3000")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    let value: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(value["error"], json!("Internal server error"));
    assert!(value["message"].as_str().unwrap().contains("price"));
}

#[tokio::test]
async fn listing_returns_stocks_count_and_total() {
    let app = seeded_app(vec![
        full_record("AAPL"),
        full_record("MSFT"),
        full_record("NVDA"),
    ])
    .await;
    let (status, body) = get_json(&app, "/stocks").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(3));
    assert_eq!(body["total_in_db"], json!(3));
    assert_eq!(body["stocks"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn listing_caps_at_limit() {
    let records = (0..6).map(|i| minimal_record(&format!("SYM{}", i))).collect();
    let app = seeded_app(records).await;
    let (status, body) = get_json(&app, "/stocks?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));
    assert_eq!(body["stocks"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn listing_defaults_limit_on_garbage() {
    let records = (0..6).map(|i| minimal_record(&format!("SYM{}", i))).collect();
    let app = seeded_app(records).await;
    let (status, body) = get_json(&app, "/stocks?limit=abc").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(6));
}

#[tokio::test]
async fn listing_filters_by_type() {
    let mut etf = as_object(minimal_record("SPY"));
    etf.insert("type".into(), json!("etf"));
    let app = seeded_app(vec![
        minimal_record("AAPL"),
        Value::Object(etf),
        minimal_record("MSFT"),
    ])
    .await;

    let (status, body) = get_json(&app, "/stocks?type=etf").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
    assert_eq!(body["stocks"][0]["symbol"], json!("SPY"));
    assert_eq!(body["stocks"][0]["type"], json!("etf"));
}

#[tokio::test]
async fn listing_sorted_by_market_weight() {
    let app = seeded_app(vec![
        weighted_record("LOWVOL", 0, 1000),
        weighted_record("BIGCAP", 500, 10),
        weighted_record("HIGHVOL", 0, 2000),
    ])
    .await;

    let (status, body) = get_json(&app, "/stocks").await;
    assert_eq!(status, StatusCode::OK);

    let symbols: Vec<&str> = body["stocks"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["symbol"].as_str().unwrap())
        .collect();
    assert_eq!(symbols, vec!["BIGCAP", "HIGHVOL", "LOWVOL"]);
}

#[tokio::test]
async fn root_path_serves_listing() {
    let app = seeded_app(vec![minimal_record("AAPL")]).await;
    let (status, body) = get_json(&app, "/").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(1));
}

#[tokio::test]
async fn unknown_path_returns_endpoint_not_found() {
    let app = seeded_app(vec![]).await;
    let (status, body) = get_json(&app, "/portfolio").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!("Endpoint not found"));
}

#[tokio::test]
async fn options_succeeds_on_any_path() {
    let app = seeded_app(vec![]).await;

    for uri in ["/stocks", "/stocks/AAPL", "/", "/portfolio"] {
        let (status, body) = send(
            &app,
            Request::builder()
                .method(Method::OPTIONS)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "OPTIONS {}", uri);
        assert!(body.is_empty(), "OPTIONS {} body", uri);
    }
}

#[tokio::test]
async fn responses_carry_cors_headers() {
    let app = seeded_app(vec![full_record("AAPL")]).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/stocks/AAPL")
                .header(header::ORIGIN, "http://localhost:3000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
    assert!(response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap()
        .contains("application/json"));

    let preflight = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/stocks")
                .header(header::ORIGIN, "http://localhost:3000")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(preflight.status(), StatusCode::OK);
    let allow_methods = preflight
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(allow_methods.contains("GET"));
    assert!(allow_methods.contains("POST"));
    assert!(allow_methods.contains("OPTIONS"));
}
