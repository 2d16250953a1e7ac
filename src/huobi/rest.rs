// =============================================================================
// Huobi REST API Client — historical candles for bootstrap
// =============================================================================

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::huobi::frame::{parse_candle, CandleTick};

/// Thin client for the public market-history endpoint. No authentication —
/// this service consumes public market data only.
#[derive(Clone)]
pub struct HuobiRestClient {
    client: reqwest::Client,
    base_url: String,
}

impl HuobiRestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .expect("failed to build reqwest client"),
            base_url: base_url.into(),
        }
    }

    /// GET /market/history/kline — the most recent `size` candles of
    /// `period` for `symbol_code` (exchange-native lower-case form).
    ///
    /// The API does not guarantee ordering; callers sort.
    pub async fn history_kline(
        &self,
        symbol_code: &str,
        period: &str,
        size: u32,
    ) -> Result<Vec<CandleTick>> {
        let url = format!("{}/market/history/kline", self.base_url);
        let size_param = size.to_string();

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("symbol", symbol_code),
                ("period", period),
                ("size", size_param.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("GET /market/history/kline for {symbol_code}"))?;

        let status = resp.status();
        let body: Value = resp
            .json()
            .await
            .context("failed to parse history kline response body")?;

        if !status.is_success() {
            anyhow::bail!("history kline API returned {status}: {body}");
        }

        let candles = parse_history(&body)?;
        debug!(symbol = symbol_code, period, count = candles.len(), "history klines fetched");
        Ok(candles)
    }
}

/// Validate and parse a history-kline response body.
///
/// A non-`ok` status, a missing or non-array `data`, or an empty payload is
/// a failure — an empty history cannot seed a trade window.
pub fn parse_history(body: &Value) -> Result<Vec<CandleTick>> {
    let status = body
        .get("status")
        .and_then(Value::as_str)
        .context("history response missing 'status'")?;

    if status != "ok" {
        let err_code = body.get("err-code").and_then(Value::as_str).unwrap_or("?");
        let err_msg = body.get("err-msg").and_then(Value::as_str).unwrap_or("?");
        anyhow::bail!("history response status '{status}' ({err_code}: {err_msg})");
    }

    let data = body
        .get("data")
        .and_then(Value::as_array)
        .context("history response 'data' is not an array")?;

    if data.is_empty() {
        anyhow::bail!("history response 'data' is empty");
    }

    let mut candles = Vec::with_capacity(data.len());
    for entry in data {
        candles.push(parse_candle(entry)?);
    }
    Ok(candles)
}

impl std::fmt::Debug for HuobiRestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuobiRestClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn parse_history_ok() {
        let body = serde_json::json!({
            "status": "ok",
            "ch": "market.btcusdt.kline.1min",
            "data": [
                {"id": 1700000060, "open": 1, "close": 50010.5, "low": 1, "high": 1, "vol": 120.5, "amount": 1, "count": 10},
                {"id": 1700000000, "open": 1, "close": 50000.0, "low": 1, "high": 1, "vol": 98.0, "amount": 1, "count": 8}
            ]
        });

        let candles = parse_history(&body).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].id, 1700000060);
        assert_eq!(candles[1].close, Decimal::from(50_000));
    }

    #[test]
    fn parse_history_rejects_error_status() {
        let body = serde_json::json!({
            "status": "error",
            "err-code": "invalid-parameter",
            "err-msg": "invalid symbol"
        });
        let err = parse_history(&body).unwrap_err();
        assert!(err.to_string().contains("invalid-parameter"));
    }

    #[test]
    fn parse_history_rejects_non_array_data() {
        let body = serde_json::json!({"status": "ok", "data": {"id": 1}});
        assert!(parse_history(&body).is_err());
    }

    #[test]
    fn parse_history_rejects_empty_data() {
        let body = serde_json::json!({"status": "ok", "data": []});
        assert!(parse_history(&body).is_err());
    }

    #[test]
    fn parse_history_rejects_malformed_entry() {
        let body = serde_json::json!({
            "status": "ok",
            "data": [{"close": 1.0, "vol": 2.0}]
        });
        assert!(parse_history(&body).is_err());
    }
}
