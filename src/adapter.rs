// =============================================================================
// Exchange adapter contract + stream transport runner
// =============================================================================
//
// One trait per exchange integration: bootstrap, subscribe-on-connect, frame
// handling, liveness. Adapters are plain structs implementing this capability
// set — no inheritance hierarchy, the transport runner below works against
// the trait object.
//
// Reconnect timing is NOT here: `run_stream` runs one connection until it
// dies and returns, and the caller (main.rs) decides when to dial again.

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, Notify};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use crate::types::ConnState;

/// Outbound frame queue. Handlers push complete text frames; the writer half
/// of the socket drains them, so message handling never blocks on the network.
pub type FrameSink = mpsc::UnboundedSender<String>;

#[async_trait::async_trait]
pub trait ExchangeAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Streaming endpoint URL for this exchange.
    fn stream_url(&self) -> String;

    /// Current connection lifecycle state.
    fn conn_state(&self) -> ConnState;

    /// Record a lifecycle transition driven by the transport runner.
    fn transition(&self, next: ConnState);

    /// Seed trade windows from historical data. Per-symbol failures are
    /// reported internally and never abort the remaining symbols; the stream
    /// is opened regardless of the outcome.
    async fn bootstrap(&self);

    /// Called once per established connection, before any frame is read.
    /// Emits subscription requests for every configured symbol.
    async fn on_connect(&self, out: &FrameSink) -> Result<()>;

    /// Handle one raw transport frame. `Err` means the connection can no
    /// longer be trusted and must be torn down; recoverable frame problems
    /// are absorbed internally.
    async fn on_frame(&self, raw: &[u8], out: &FrameSink) -> Result<()>;

    /// Has new data arrived since the last check? Clears the flag.
    fn poll_liveness(&self) -> bool;
}

/// Run one stream connection for `adapter` until it ends.
///
/// Returns `Ok` on orderly stream end or a supervisor-forced drop, `Err` on
/// transport or protocol failure. Either way the adapter ends up
/// `Disconnected` and the caller owns reconnection.
pub async fn run_stream(
    adapter: &Arc<dyn ExchangeAdapter>,
    force_reconnect: &Notify,
) -> Result<()> {
    let result = drive_stream(adapter, force_reconnect).await;
    adapter.transition(ConnState::Disconnected);
    result
}

async fn drive_stream(
    adapter: &Arc<dyn ExchangeAdapter>,
    force_reconnect: &Notify,
) -> Result<()> {
    let url = adapter.stream_url();
    adapter.transition(ConnState::Connecting);
    info!(adapter = adapter.name(), url = %url, "connecting to stream");

    let (ws_stream, _response) = connect_async(&url)
        .await
        .context("failed to connect to stream WebSocket")?;

    info!(adapter = adapter.name(), "stream connected");
    let (mut write, mut read) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    adapter.on_connect(&tx).await?;

    loop {
        tokio::select! {
            Some(frame) = rx.recv() => {
                write
                    .send(Message::Text(frame))
                    .await
                    .context("failed to send outbound frame")?;
            }
            msg = read.next() => match msg {
                Some(Ok(Message::Binary(raw))) => adapter.on_frame(&raw, &tx).await?,
                Some(Ok(Message::Text(text))) => adapter.on_frame(text.as_bytes(), &tx).await?,
                // WebSocket-level ping/pong/close frames are handled by
                // tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    return Err(e).context("stream WebSocket read error");
                }
                None => {
                    warn!(adapter = adapter.name(), "stream ended");
                    return Ok(());
                }
            },
            _ = force_reconnect.notified() => {
                warn!(adapter = adapter.name(), "supervisor forced reconnect — dropping connection");
                return Ok(());
            }
        }
    }
}
