// =============================================================================
// FX Rate Poller — foreign-exchange rate for currency synthesis
// =============================================================================
//
// Polls a forex quotation endpoint and writes the rate into the shared store
// under the configured rate symbol. The synthesizer only ever reads the rate
// through `PriceStore::get_rate`, so a failed poll simply leaves the previous
// value in place and a zero quote is never written.

use std::sync::Arc;

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

use crate::price_store::PriceStore;
use crate::types::Symbol;

pub struct FxRatePoller {
    client: reqwest::Client,
    url: String,
    rate_symbol: Symbol,
    store: Arc<PriceStore>,
}

impl FxRatePoller {
    pub fn new(url: impl Into<String>, rate_symbol: Symbol, store: Arc<PriceStore>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build reqwest client for FxRatePoller"),
            url: url.into(),
            rate_symbol,
            store,
        }
    }

    /// Fetch the current rate from the quotation endpoint.
    pub async fn fetch(&self) -> Result<Decimal> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("GET forex rate for {}", self.rate_symbol))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .context("failed to parse forex rate response body")?;

        if !status.is_success() {
            anyhow::bail!("forex rate API returned {status}: {body}");
        }

        parse_fx_rate(&body)
    }

    /// Poll forever at `poll_secs` intervals, writing each good quote into
    /// the store. Failures are logged and retried on the next tick.
    pub async fn run(&self, poll_secs: u64) {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(poll_secs));
        loop {
            interval.tick().await;
            match self.fetch().await {
                Ok(rate) if rate.is_zero() => {
                    warn!(rate_symbol = %self.rate_symbol, "forex endpoint returned zero rate — ignored");
                }
                Ok(rate) => {
                    self.store.set_price(&self.rate_symbol, rate);
                    debug!(rate_symbol = %self.rate_symbol, rate = %rate, "forex rate refreshed");
                }
                Err(e) => {
                    warn!(rate_symbol = %self.rate_symbol, error = %e, "forex rate fetch failed");
                }
            }
        }
    }
}

/// Parse a Dunamu-style quotation response: an array whose first entry
/// carries the quote in `basePrice`.
pub fn parse_fx_rate(body: &Value) -> Result<Decimal> {
    let entry = body
        .as_array()
        .context("forex response is not an array")?
        .first()
        .context("forex response array is empty")?;

    let base_price = entry
        .get("basePrice")
        .context("forex response missing 'basePrice'")?;

    match base_price {
        Value::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .context("failed to parse basePrice"),
        Value::String(s) => s.parse::<Decimal>().context("failed to parse basePrice"),
        _ => anyhow::bail!("forex basePrice has unexpected JSON type"),
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn parse_numeric_base_price() {
        let body = serde_json::json!([{"code": "FRX.KRWUSD", "basePrice": 1305.5}]);
        assert_eq!(
            parse_fx_rate(&body).unwrap(),
            Decimal::from_str("1305.5").unwrap()
        );
    }

    #[test]
    fn parse_string_base_price() {
        let body = serde_json::json!([{"basePrice": "1305.50"}]);
        assert_eq!(
            parse_fx_rate(&body).unwrap(),
            Decimal::from_str("1305.50").unwrap()
        );
    }

    #[test]
    fn reject_empty_array() {
        assert!(parse_fx_rate(&serde_json::json!([])).is_err());
    }

    #[test]
    fn reject_non_array() {
        assert!(parse_fx_rate(&serde_json::json!({"basePrice": 1305.5})).is_err());
    }

    #[test]
    fn reject_missing_field() {
        assert!(parse_fx_rate(&serde_json::json!([{"code": "FRX.KRWUSD"}])).is_err());
    }
}
