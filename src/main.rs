// =============================================================================
// Aurora Feed Relay — Main Entry Point
// =============================================================================
//
// Startup order matters: the FX poller and API come up first, then the trade
// windows are seeded from history, and only then is the stream opened —
// bootstrap failures never block stream startup.

// ── Module declarations ──────────────────────────────────────────────────────
mod adapter;
mod api;
mod error;
mod feed_state;
mod fx;
mod huobi;
mod liveness;
mod price_store;
mod runtime_config;
mod synth;
mod types;
mod window;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::adapter::ExchangeAdapter;
use crate::feed_state::FeedState;
use crate::huobi::HuobiAdapter;
use crate::runtime_config::RuntimeConfig;
use crate::types::Symbol;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        Aurora Feed Relay — Starting Up                  ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let mut config = RuntimeConfig::load("feed_config.json").unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });

    // Override symbols and bind address from env if available.
    if let Ok(syms) = std::env::var("FEED_SYMBOLS") {
        config.symbols = syms
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Ok(addr) = std::env::var("FEED_BIND_ADDR") {
        config.bind_addr = addr;
    }

    info!(symbols = ?config.symbols, period = %config.candle_period, "Configured feed symbols");

    // ── 2. Build shared state & adapter ──────────────────────────────────
    let state = Arc::new(FeedState::new(config.clone()));
    let stream_adapter: Arc<dyn ExchangeAdapter> =
        Arc::new(HuobiAdapter::new(&config, state.clone())?);

    // ── 3. FX rate poller ────────────────────────────────────────────────
    let rate_symbol = Symbol::parse(&config.rate_symbol)?;
    let fx_poller = fx::FxRatePoller::new(
        config.fx_url.clone(),
        rate_symbol,
        state.store.clone(),
    );
    let fx_poll_secs = config.fx_poll_secs;
    tokio::spawn(async move {
        fx_poller.run(fx_poll_secs).await;
    });

    // ── 4. Start the API server ──────────────────────────────────────────
    let api_ctx = api::rest::ApiContext {
        state: state.clone(),
        adapter: stream_adapter.clone(),
    };
    let bind_addr = config.bind_addr.clone();
    tokio::spawn(async move {
        let app = api::rest::router(api_ctx);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr, "API server listening");
        axum::serve(listener, app)
            .await
            .expect("API server failed");
    });

    // ── 5. Bootstrap trade windows ───────────────────────────────────────
    stream_adapter.bootstrap().await;
    info!("Bootstrap complete — opening stream");

    // ── 6. Stream loop with reconnect ────────────────────────────────────
    let force_reconnect = Arc::new(Notify::new());

    let loop_adapter = stream_adapter.clone();
    let loop_notify = force_reconnect.clone();
    tokio::spawn(async move {
        loop {
            if let Err(e) = adapter::run_stream(&loop_adapter, &loop_notify).await {
                error!(error = %format!("{e:#}"), "Stream error — reconnecting in 5s");
            }
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    });

    // ── 7. Liveness supervisor ───────────────────────────────────────────
    let sup_adapter = stream_adapter.clone();
    let sup_notify = force_reconnect.clone();
    let poll_secs = config.liveness_poll_secs;
    let stall_limit = config.liveness_stall_polls.max(1);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(poll_secs.max(1)));
        // The first tick fires immediately; skip it so the feed has a full
        // interval to produce data.
        interval.tick().await;

        let mut stalled: u32 = 0;
        loop {
            interval.tick().await;

            if sup_adapter.poll_liveness() {
                stalled = 0;
                continue;
            }

            stalled += 1;
            warn!(consecutive = stalled, "No feed updates since last liveness check");

            if stalled >= stall_limit {
                error!("Feed stalled — forcing reconnect");
                sup_notify.notify_one();
                stalled = 0;
            }
        }
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 8. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received — stopping gracefully");

    if let Err(e) = state.runtime_config.read().save("feed_config.json") {
        error!(error = %e, "Failed to save runtime config on shutdown");
    }

    info!("Aurora Feed Relay shut down complete.");
    Ok(())
}
