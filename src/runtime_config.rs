// =============================================================================
// Runtime Configuration — feed settings with atomic save
// =============================================================================
//
// Persistence uses an atomic tmp + rename pattern to prevent corruption on
// crash. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_symbols() -> Vec<String> {
    vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()]
}

fn default_stream_url() -> String {
    "wss://api.huobi.pro/ws".to_string()
}

fn default_rest_url() -> String {
    "https://api.huobi.pro".to_string()
}

fn default_fx_url() -> String {
    "https://quotation-api-cdn.dunamu.com/v1/forex/recent?codes=FRX.KRWUSD".to_string()
}

fn default_candle_period() -> String {
    "1min".to_string()
}

fn default_window_depth() -> usize {
    10
}

fn default_source_quote() -> String {
    "USDT".to_string()
}

fn default_target_quote() -> String {
    "KRW".to_string()
}

fn default_rate_symbol() -> String {
    "KRW/USD".to_string()
}

fn default_fx_poll_secs() -> u64 {
    60
}

fn default_liveness_poll_secs() -> u64 {
    30
}

fn default_liveness_stall_polls() -> u32 {
    3
}

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level runtime configuration for the feed relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    // --- Symbols & stream ----------------------------------------------------

    /// Symbols the feed subscribes to, in `BASE/QUOTE` form.
    #[serde(default = "default_symbols")]
    pub symbols: Vec<String>,

    /// Exchange streaming endpoint.
    #[serde(default = "default_stream_url")]
    pub stream_url: String,

    /// Exchange REST endpoint for the historical-candle bootstrap.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,

    /// Candle bucket size used for subscriptions and bootstrap.
    #[serde(default = "default_candle_period")]
    pub candle_period: String,

    /// Trade-window depth; also the bootstrap fetch size.
    #[serde(default = "default_window_depth")]
    pub window_depth: usize,

    // --- Currency synthesis --------------------------------------------------

    /// Quote currency of the symbols the exchange actually feeds.
    #[serde(default = "default_source_quote")]
    pub source_quote: String,

    /// Quote currency of the derived symbols.
    #[serde(default = "default_target_quote")]
    pub target_quote: String,

    /// Store key of the foreign-exchange rate used for synthesis.
    #[serde(default = "default_rate_symbol")]
    pub rate_symbol: String,

    /// Forex quotation endpoint polled for the rate.
    #[serde(default = "default_fx_url")]
    pub fx_url: String,

    /// Seconds between forex rate polls.
    #[serde(default = "default_fx_poll_secs")]
    pub fx_poll_secs: u64,

    // --- Supervision ---------------------------------------------------------

    /// Seconds between liveness checks.
    #[serde(default = "default_liveness_poll_secs")]
    pub liveness_poll_secs: u64,

    /// Consecutive dead liveness checks before a forced reconnect.
    #[serde(default = "default_liveness_stall_polls")]
    pub liveness_stall_polls: u32,

    // --- HTTP surface --------------------------------------------------------

    /// Bind address of the read-only REST API.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            symbols: default_symbols(),
            stream_url: default_stream_url(),
            rest_url: default_rest_url(),
            candle_period: default_candle_period(),
            window_depth: default_window_depth(),
            source_quote: default_source_quote(),
            target_quote: default_target_quote(),
            rate_symbol: default_rate_symbol(),
            fx_url: default_fx_url(),
            fx_poll_secs: default_fx_poll_secs(),
            liveness_poll_secs: default_liveness_poll_secs(),
            liveness_stall_polls: default_liveness_stall_polls(),
            bind_addr: default_bind_addr(),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            symbols = ?config.symbols,
            period = %config.candle_period,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Persist the current configuration to `path` using an atomic write
    /// (write to `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content = serde_json::to_string_pretty(self)
            .context("failed to serialise runtime config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "runtime config saved (atomic)");
        Ok(())
    }
}
