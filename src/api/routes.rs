use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::store::QuoteStore;

use super::handlers;

pub fn create_router(store: Arc<dyn QuoteStore>) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::list_stocks).options(handlers::preflight),
        )
        .route(
            "/stocks",
            get(handlers::list_stocks).options(handlers::preflight),
        )
        .route(
            "/stocks/:symbol",
            get(handlers::get_stock).options(handlers::preflight),
        )
        .fallback(handlers::fallback)
        .with_state(store)
        .layer(cors_layer())
}

/// Fixed CORS policy: any origin, the Content-Type header, GET/POST/OPTIONS.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_headers([header::CONTENT_TYPE])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
}
