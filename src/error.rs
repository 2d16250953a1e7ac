// =============================================================================
// Feed error taxonomy
// =============================================================================
//
// Every failure mode the adapter can hit maps to one variant with a stable
// machine-readable code. Expected no-ops (no FX rate yet, a channel that maps
// to no configured symbol) are NOT errors and never appear here.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Decompression or JSON parse failure on a single transport frame.
    /// Transient: the frame is dropped, the connection stays open.
    #[error("frame decode failed: {0}")]
    FrameDecode(String),

    /// The exchange rejected a subscription. Not retried here — the
    /// supervisor decides what to do with a dead channel.
    #[error("subscription rejected for {channel}: {status}")]
    SubscriptionRejected { channel: String, status: String },

    /// A message matching no known shape. Fatal for the connection: the
    /// schema has drifted from what this adapter understands.
    #[error("unrecognized stream message: {0}")]
    Protocol(String),

    /// Historical-candle bootstrap failed for one symbol.
    #[error("bootstrap failed for {symbol}: {reason}")]
    Bootstrap { symbol: String, reason: String },
}

impl FeedError {
    /// Stable code attached to error-channel records.
    pub fn code(&self) -> &'static str {
        match self {
            Self::FrameDecode(_) => "frame_decode",
            Self::SubscriptionRejected { .. } => "sub_rejected",
            Self::Protocol(_) => "protocol",
            Self::Bootstrap { .. } => "bootstrap",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(FeedError::FrameDecode("x".into()).code(), "frame_decode");
        assert_eq!(
            FeedError::SubscriptionRejected {
                channel: "market.btcusdt.kline.1min".into(),
                status: "error".into(),
            }
            .code(),
            "sub_rejected"
        );
        assert_eq!(FeedError::Protocol("{}".into()).code(), "protocol");
        assert_eq!(
            FeedError::Bootstrap {
                symbol: "BTC/USDT".into(),
                reason: "timeout".into(),
            }
            .code(),
            "bootstrap"
        );
    }

    #[test]
    fn display_includes_context() {
        let err = FeedError::SubscriptionRejected {
            channel: "market.ethusdt.kline.1min".into(),
            status: "bad-request".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("market.ethusdt.kline.1min"));
        assert!(msg.contains("bad-request"));
    }
}
