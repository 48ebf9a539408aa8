//! API Routes
//!
//! Maps the cache region's HTTP surface onto its handlers. Writes that find
//! the region locked answer 409 and never queue, so a client that gets one
//! should recompute its value rather than retry.

use axum::{
    routing::{delete, get, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    delete_handler, get_handler, health_handler, set_handler, stats_handler, AppState,
};

/// Builds the router for one cache region.
///
/// | Method | Path | Success | Other outcomes |
/// |---|---|---|---|
/// | `PUT` | `/set` | 200 `success` | 400 bad key or timeout, 409 region locked |
/// | `GET` | `/get/:key` | 200 `success` | 404 `expired` (expired or never set) |
/// | `DELETE` | `/del/:key` | 200, `deleted` tells whether a value went | none |
/// | `GET` | `/stats` | 200 per-handle counters | 500 unreadable registry |
/// | `GET` | `/health` | 200 | none |
///
/// Requests are traced and CORS is open to any origin.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/set", put(set_handler))
        .route("/get/:key", get(get_handler))
        .route("/del/:key", delete(delete_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
