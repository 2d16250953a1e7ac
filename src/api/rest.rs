// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// Read-only surface under `/api/v1/` serving the shared store to downstream
// readers. No authentication — nothing here mutates state or exposes more
// than the feed already publishes.
//
// CORS is configured permissively for development; tighten `allowed_origins`
// in production.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::adapter::ExchangeAdapter;
use crate::feed_state::FeedState;
use crate::types::Symbol;

/// Shared handler context.
#[derive(Clone)]
pub struct ApiContext {
    pub state: Arc<FeedState>,
    pub adapter: Arc<dyn ExchangeAdapter>,
}

/// Build the REST API router with CORS middleware and shared state.
pub fn router(ctx: ApiContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/prices", get(prices))
        .route("/api/v1/trades/:symbol", get(trades))
        .route("/api/v1/errors", get(errors))
        .layer(cors)
        .with_state(ctx)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    adapter: String,
    conn_state: String,
    state_version: u64,
    uptime_s: u64,
    server_time: i64,
}

async fn health(State(ctx): State<ApiContext>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        adapter: ctx.adapter.name().to_string(),
        conn_state: ctx.adapter.conn_state().to_string(),
        state_version: ctx.state.current_state_version(),
        uptime_s: ctx.state.start_time.elapsed().as_secs(),
        server_time: chrono::Utc::now().timestamp_millis(),
    };
    Json(resp)
}

// =============================================================================
// Prices
// =============================================================================

async fn prices(State(ctx): State<ApiContext>) -> impl IntoResponse {
    Json(ctx.state.store.price_snapshot())
}

// =============================================================================
// Trades
// =============================================================================

/// `GET /api/v1/trades/BTC-USDT` — the current window for one symbol.
/// Path form uses `-` in place of `/`.
async fn trades(
    State(ctx): State<ApiContext>,
    Path(symbol): Path<String>,
) -> impl IntoResponse {
    let parsed = match Symbol::parse(&symbol.replace('-', "/")) {
        Ok(sym) => sym,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!({ "error": e.to_string() })))
                .into_response();
        }
    };

    match ctx.state.store.get_trades(&parsed) {
        Some(window) => Json(window).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("no trades for {parsed}") })),
        )
            .into_response(),
    }
}

// =============================================================================
// Errors
// =============================================================================

async fn errors(State(ctx): State<ApiContext>) -> impl IntoResponse {
    Json(ctx.state.recent_errors.read().clone())
}
