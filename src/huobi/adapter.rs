// =============================================================================
// Huobi Adapter — protocol state machine, tick normalization, bootstrap
// =============================================================================
//
// Everything here runs on the single stream read loop, so frames are handled
// strictly in arrival order and the in-place window merge never races against
// itself. Bootstrap requests run concurrently across symbols but complete
// before the stream is opened.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::join_all;
use parking_lot::RwLock;
use tracing::{debug, error, info, warn};

use crate::adapter::{ExchangeAdapter, FrameSink};
use crate::error::FeedError;
use crate::feed_state::FeedState;
use crate::huobi::frame::{self, CandleTick, StreamMessage};
use crate::huobi::rest::HuobiRestClient;
use crate::liveness::LivenessMonitor;
use crate::price_store::PriceStore;
use crate::runtime_config::RuntimeConfig;
use crate::synth::CurrencySynthesizer;
use crate::types::{ConnState, Symbol, Trade};
use crate::window::TradeWindow;

pub struct HuobiAdapter {
    symbols: Vec<Symbol>,
    period: String,
    depth: usize,
    stream_url: String,

    rest: HuobiRestClient,
    synth: CurrencySynthesizer,

    state: Arc<FeedState>,
    store: Arc<PriceStore>,

    /// Per-symbol trade windows, owned exclusively by this adapter.
    windows: RwLock<HashMap<Symbol, TradeWindow>>,
    conn_state: RwLock<ConnState>,
    liveness: LivenessMonitor,
}

impl HuobiAdapter {
    pub fn new(config: &RuntimeConfig, state: Arc<FeedState>) -> Result<Self> {
        let symbols = config
            .symbols
            .iter()
            .map(|s| Symbol::parse(s))
            .collect::<Result<Vec<_>>>()
            .context("invalid symbol in runtime config")?;

        let rate_symbol =
            Symbol::parse(&config.rate_symbol).context("invalid rate symbol in runtime config")?;

        let store = state.store.clone();

        Ok(Self {
            symbols,
            period: config.candle_period.clone(),
            depth: config.window_depth,
            stream_url: config.stream_url.clone(),
            rest: HuobiRestClient::new(config.rest_url.clone()),
            synth: CurrencySynthesizer::new(
                config.source_quote.clone(),
                config.target_quote.clone(),
                rate_symbol,
            ),
            state,
            store,
            windows: RwLock::new(HashMap::new()),
            conn_state: RwLock::new(ConnState::Disconnected),
            liveness: LivenessMonitor::new(),
        })
    }

    // -------------------------------------------------------------------------
    // Channel naming
    // -------------------------------------------------------------------------

    /// Exchange channel for a symbol, e.g. `market.btcusdt.kline.1min`.
    fn channel(&self, symbol: &Symbol) -> String {
        format!("market.{}.kline.{}", symbol.channel_code(), self.period)
    }

    /// Reverse-resolve a channel back to a configured symbol.
    ///
    /// Strips the `market.` prefix and `.kline.<period>` suffix, upper-cases
    /// the remainder and matches it against the configured symbols' compact
    /// forms. `None` covers channels unrelated to this adapter's symbols.
    fn resolve_channel(&self, channel: &str) -> Option<Symbol> {
        let code = channel.strip_prefix("market.")?;
        let code = code.strip_suffix(&format!(".kline.{}", self.period))?;
        let compact = code.to_uppercase();
        self.symbols.iter().find(|s| s.compact() == compact).cloned()
    }

    // -------------------------------------------------------------------------
    // Trade normalization
    // -------------------------------------------------------------------------

    /// Normalize one tick into the symbol's trade window and publish.
    ///
    /// Bucket id (epoch seconds) becomes a millisecond timestamp; a tick for
    /// an existing bucket merges in place. The updated window and latest
    /// price go to the shared store, the synthesizer recomputes the derived
    /// window, and the liveness monitor is marked.
    fn apply_tick(&self, symbol: &Symbol, tick: &CandleTick) {
        let trade = Trade {
            timestamp: tick.id * 1_000,
            price: tick.close,
            volume: tick.vol,
        };
        let price = trade.price;

        let snapshot = {
            let mut windows = self.windows.write();
            let window = windows
                .entry(symbol.clone())
                .or_insert_with(|| TradeWindow::new(self.depth));
            window.apply(trade);
            window.to_vec()
        };

        self.store.set_trades(symbol, snapshot.clone());
        self.store.set_price(symbol, price);
        self.synth.publish(&self.store, symbol, &snapshot);

        self.state.increment_version();
        self.liveness.mark();
    }

    // -------------------------------------------------------------------------
    // Bootstrap
    // -------------------------------------------------------------------------

    /// Fetch and install the initial trade window for one symbol.
    async fn bootstrap_symbol(&self, symbol: &Symbol) -> Result<()> {
        let candles = self
            .rest
            .history_kline(&symbol.channel_code(), &self.period, self.depth as u32)
            .await?;

        let trades = build_window(candles);
        if trades.is_empty() {
            // Every bucket in the history was a no-trade interval; there is
            // no trustworthy last price, so leave the store untouched and
            // wait for live ticks.
            warn!(symbol = %symbol, "bootstrap returned only zero-volume candles");
            return Ok(());
        }

        // Non-empty checked above.
        let last_price = trades.last().map(|t| t.price).unwrap_or_default();

        self.windows
            .write()
            .insert(symbol.clone(), TradeWindow::seed(self.depth, trades.clone()));

        self.store.set_trades(symbol, trades.clone());
        self.store.set_price(symbol, last_price);
        self.synth.publish(&self.store, symbol, &trades);
        self.state.increment_version();

        info!(symbol = %symbol, count = trades.len(), "trade window bootstrapped");
        Ok(())
    }
}

/// Map raw history candles to a seed window: drop zero-volume buckets (they
/// carry no trade and would corrupt the last-price signal) and sort ascending
/// by timestamp — the API does not guarantee ordering.
fn build_window(candles: Vec<CandleTick>) -> Vec<Trade> {
    let mut trades: Vec<Trade> = candles
        .into_iter()
        .filter(|c| !c.vol.is_zero())
        .map(|c| Trade {
            timestamp: c.id * 1_000,
            price: c.close,
            volume: c.vol,
        })
        .collect();
    trades.sort_by_key(|t| t.timestamp);
    trades
}

#[async_trait::async_trait]
impl ExchangeAdapter for HuobiAdapter {
    fn name(&self) -> &str {
        "huobi"
    }

    fn stream_url(&self) -> String {
        self.stream_url.clone()
    }

    fn conn_state(&self) -> ConnState {
        *self.conn_state.read()
    }

    fn transition(&self, next: ConnState) {
        *self.conn_state.write() = next;
    }

    async fn bootstrap(&self) {
        let results = join_all(self.symbols.iter().map(|symbol| async move {
            (symbol, self.bootstrap_symbol(symbol).await)
        }))
        .await;

        for (symbol, result) in results {
            if let Err(e) = result {
                let err = FeedError::Bootstrap {
                    symbol: symbol.to_string(),
                    reason: format!("{e:#}"),
                };
                error!(symbol = %symbol, error = %e, "bootstrap failed");
                self.state.push_error(&err);
            }
        }

        // Stream startup proceeds regardless of per-symbol failures.
        self.liveness.mark();
    }

    async fn on_connect(&self, out: &FrameSink) -> Result<()> {
        *self.conn_state.write() = ConnState::Subscribing;

        for symbol in &self.symbols {
            let channel = self.channel(symbol);
            let sub = serde_json::json!({ "sub": channel, "id": symbol.compact() }).to_string();
            out.send(sub)
                .with_context(|| format!("failed to queue subscription for {symbol}"))?;
            info!(symbol = %symbol, channel = %channel, "subscription requested");
        }

        // Optimistic: acks are verified as they arrive, the stream is not
        // blocked on them.
        *self.conn_state.write() = ConnState::Streaming;
        Ok(())
    }

    async fn on_frame(&self, raw: &[u8], out: &FrameSink) -> Result<()> {
        let text = match frame::decode(raw) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "dropping undecodable frame");
                self.state.push_error(&err);
                return Ok(());
            }
        };

        let message = match frame::classify(&text) {
            Ok(message) => message,
            Err(err @ FeedError::Protocol(_)) => {
                error!(error = %err, "protocol violation — tearing down connection");
                self.state.push_error(&err);
                *self.conn_state.write() = ConnState::Disconnected;
                return Err(err.into());
            }
            Err(err) => {
                warn!(error = %err, "dropping malformed frame");
                self.state.push_error(&err);
                return Ok(());
            }
        };

        match message {
            // The pong must go out synchronously in the message-handling
            // path; a delayed reply risks a server-side disconnect. The
            // nonce is echoed in its literal representation.
            StreamMessage::Ping { nonce } => {
                let pong = serde_json::json!({ "pong": nonce }).to_string();
                out.send(pong).context("failed to queue pong")?;
            }

            StreamMessage::SubAck { channel, status } => {
                if status == "ok" {
                    debug!(channel = %channel, "subscription acknowledged");
                } else {
                    // No retry here: a rejected channel stays dead until the
                    // supervisor intervenes.
                    let err = FeedError::SubscriptionRejected { channel, status };
                    error!(error = %err, "subscription rejected");
                    self.state.push_error(&err);
                }
            }

            StreamMessage::Tick { channel, tick } => match self.resolve_channel(&channel) {
                Some(symbol) => self.apply_tick(&symbol, &tick),
                None => {
                    debug!(channel = %channel, "tick for unconfigured channel ignored");
                }
            },
        }

        Ok(())
    }

    fn poll_liveness(&self) -> bool {
        self.liveness.poll()
    }
}
