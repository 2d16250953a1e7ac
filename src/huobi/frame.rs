// =============================================================================
// Frame Decoder — gzip transport frames to classified stream messages
// =============================================================================
//
// Huobi delivers every frame gzip-compressed. A frame that fails to inflate
// or parse is a local problem with that frame only; a frame that inflates and
// parses but matches no known shape means the protocol has drifted and the
// connection can no longer be trusted. The two cases map to different
// `FeedError` variants and the caller treats them very differently.

use std::io::Read;

use flate2::read::GzDecoder;
use rust_decimal::Decimal;
use serde_json::Value;

use crate::error::FeedError;

/// Gzip magic bytes. Control frames occasionally arrive as plain text, so a
/// frame without the magic is passed through as UTF-8.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One classified inbound stream message.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Keep-alive. The nonce is kept as the raw JSON value so the pong can
    /// echo the exchange's literal representation (integer or string).
    Ping { nonce: Value },
    /// Subscription acknowledgement for one channel.
    SubAck { channel: String, status: String },
    /// Market-data tick for one channel.
    Tick { channel: String, tick: CandleTick },
}

/// Candle fields carried by a kline tick or a history entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleTick {
    /// Bucket identifier: epoch seconds of the bucket start.
    pub id: i64,
    /// Closing price of the bucket so far.
    pub close: Decimal,
    /// Aggregated volume of the bucket so far.
    pub vol: Decimal,
}

/// Inflate a raw transport frame into its textual payload.
pub fn decode(raw: &[u8]) -> Result<String, FeedError> {
    if raw.starts_with(&GZIP_MAGIC) {
        let mut decoder = GzDecoder::new(raw);
        let mut text = String::new();
        decoder
            .read_to_string(&mut text)
            .map_err(|e| FeedError::FrameDecode(format!("gzip inflate failed: {e}")))?;
        Ok(text)
    } else {
        String::from_utf8(raw.to_vec())
            .map_err(|e| FeedError::FrameDecode(format!("frame is not valid UTF-8: {e}")))
    }
}

/// Parse and classify a decoded payload.
///
/// Malformed JSON or missing tick fields are `FrameDecode` (transient);
/// well-formed JSON matching no known shape is `Protocol` (fatal).
pub fn classify(text: &str) -> Result<StreamMessage, FeedError> {
    let root: Value = serde_json::from_str(text)
        .map_err(|e| FeedError::FrameDecode(format!("frame JSON parse failed: {e}")))?;

    if let Some(nonce) = root.get("ping") {
        return Ok(StreamMessage::Ping {
            nonce: nonce.clone(),
        });
    }

    if let Some(channel) = root.get("subbed").and_then(Value::as_str) {
        let status = root
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_string();
        return Ok(StreamMessage::SubAck {
            channel: channel.to_string(),
            status,
        });
    }

    if let (Some(channel), Some(tick)) = (root.get("ch").and_then(Value::as_str), root.get("tick"))
    {
        return Ok(StreamMessage::Tick {
            channel: channel.to_string(),
            tick: parse_candle(tick)?,
        });
    }

    Err(FeedError::Protocol(truncate(text, 256)))
}

/// Parse the candle fields shared by stream ticks and history entries.
pub fn parse_candle(value: &Value) -> Result<CandleTick, FeedError> {
    let id = value
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| FeedError::FrameDecode("candle missing field id".into()))?;

    Ok(CandleTick {
        id,
        close: parse_decimal(&value["close"], "close")?,
        vol: parse_decimal(&value["vol"], "vol")?,
    })
}

/// The exchange serialises prices as JSON numbers; going through the number's
/// exact string form keeps full precision instead of routing through `f64`.
fn parse_decimal(value: &Value, name: &str) -> Result<Decimal, FeedError> {
    match value {
        Value::Number(n) => n
            .to_string()
            .parse::<Decimal>()
            .map_err(|e| FeedError::FrameDecode(format!("failed to parse {name}: {e}"))),
        Value::String(s) => s
            .parse::<Decimal>()
            .map_err(|e| FeedError::FrameDecode(format!("failed to parse {name} '{s}': {e}"))),
        _ => Err(FeedError::FrameDecode(format!(
            "candle field {name} has unexpected JSON type"
        ))),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &text[..end])
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use std::str::FromStr;

    fn gzip(text: &str) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(text.as_bytes()).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn decode_inflates_gzip_frames() {
        let raw = gzip(r#"{"ping":1700000000}"#);
        assert_eq!(decode(&raw).unwrap(), r#"{"ping":1700000000}"#);
    }

    #[test]
    fn decode_passes_plain_text_through() {
        assert_eq!(decode(b"{}").unwrap(), "{}");
    }

    #[test]
    fn decode_rejects_corrupt_gzip() {
        let mut raw = gzip(r#"{"ping":1}"#);
        let len = raw.len();
        raw.truncate(len / 2);
        let err = decode(&raw).unwrap_err();
        assert_eq!(err.code(), "frame_decode");
    }

    #[test]
    fn classify_ping_keeps_numeric_nonce() {
        let msg = classify(r#"{"ping":1492420473027}"#).unwrap();
        match msg {
            StreamMessage::Ping { nonce } => {
                assert_eq!(nonce, serde_json::json!(1492420473027_i64));
            }
            other => panic!("expected ping, got {other:?}"),
        }
    }

    #[test]
    fn classify_ping_keeps_string_nonce() {
        let msg = classify(r#"{"ping":"1492420473027"}"#).unwrap();
        match msg {
            StreamMessage::Ping { nonce } => {
                assert_eq!(nonce, serde_json::json!("1492420473027"));
            }
            other => panic!("expected ping, got {other:?}"),
        }
    }

    #[test]
    fn classify_subscription_ack() {
        let msg = classify(
            r#"{"id":"BTCUSDT","status":"ok","subbed":"market.btcusdt.kline.1min","ts":1700000000000}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            StreamMessage::SubAck {
                channel: "market.btcusdt.kline.1min".to_string(),
                status: "ok".to_string(),
            }
        );
    }

    #[test]
    fn classify_kline_tick() {
        let msg = classify(
            r#"{"ch":"market.btcusdt.kline.1min","ts":1700000001000,
                "tick":{"id":1700000000,"open":49950.1,"close":50000.5,"low":49900,"high":50010,"amount":12.5,"vol":624000.25,"count":420}}"#,
        )
        .unwrap();
        match msg {
            StreamMessage::Tick { channel, tick } => {
                assert_eq!(channel, "market.btcusdt.kline.1min");
                assert_eq!(tick.id, 1700000000);
                assert_eq!(tick.close, Decimal::from_str("50000.5").unwrap());
                assert_eq!(tick.vol, Decimal::from_str("624000.25").unwrap());
            }
            other => panic!("expected tick, got {other:?}"),
        }
    }

    #[test]
    fn classify_malformed_json_is_transient() {
        let err = classify("{not json").unwrap_err();
        assert_eq!(err.code(), "frame_decode");
    }

    #[test]
    fn classify_tick_missing_fields_is_transient() {
        let err = classify(r#"{"ch":"market.btcusdt.kline.1min","tick":{"open":1}}"#).unwrap_err();
        assert_eq!(err.code(), "frame_decode");
    }

    #[test]
    fn classify_unknown_shape_is_protocol_error() {
        let err = classify(r#"{"rep":"market.btcusdt.depth","data":[]}"#).unwrap_err();
        assert_eq!(err.code(), "protocol");
    }

    #[test]
    fn string_prices_parse_exactly() {
        let candle = parse_candle(&serde_json::json!({
            "id": 1700000000,
            "close": "50000.123456789",
            "vol": "0.000000001"
        }))
        .unwrap();
        assert_eq!(candle.close, Decimal::from_str("50000.123456789").unwrap());
        assert_eq!(candle.vol, Decimal::from_str("0.000000001").unwrap());
    }
}
