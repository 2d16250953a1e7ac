// =============================================================================
// Shared types used across the Aurora feed relay
// =============================================================================

use anyhow::{bail, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A trading pair: base currency quoted in a quote currency.
///
/// Immutable once constructed. Keys all per-symbol state in the adapter and
/// the shared price store.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub base: String,
    pub quote: String,
}

impl Symbol {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        let base: String = base.into();
        let quote: String = quote.into();
        Self {
            base: base.to_uppercase(),
            quote: quote.to_uppercase(),
        }
    }

    /// Parse the canonical `BASE/QUOTE` form, e.g. `"BTC/USDT"`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((base, quote)) if !base.trim().is_empty() && !quote.trim().is_empty() => {
                Ok(Self::new(base.trim(), quote.trim()))
            }
            _ => bail!("invalid symbol '{s}' — expected BASE/QUOTE"),
        }
    }

    /// Slash-stripped upper-case form, e.g. `BTCUSDT`.
    pub fn compact(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    /// Slash-stripped lower-case form used in exchange channel names,
    /// e.g. `btcusdt`.
    pub fn channel_code(&self) -> String {
        self.compact().to_lowercase()
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

/// One aggregation bucket (e.g. a 1-minute candle), not an individual fill.
///
/// Prices and volumes are arbitrary-precision decimals — repeated in-place
/// updates of an open bucket must not accumulate rounding error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Bucket start, milliseconds since epoch.
    pub timestamp: i64,
    pub price: Decimal,
    pub volume: Decimal,
}

/// Connection lifecycle of a streaming adapter.
///
/// `Subscribing` is transitional: subscriptions are emitted on connect and
/// the adapter moves to `Streaming` optimistically without waiting for acks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnState {
    Disconnected,
    Connecting,
    Subscribing,
    Streaming,
}

impl Default for ConnState {
    fn default() -> Self {
        Self::Disconnected
    }
}

impl std::fmt::Display for ConnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Subscribing => write!(f, "Subscribing"),
            Self::Streaming => write!(f, "Streaming"),
        }
    }
}
