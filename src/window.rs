// =============================================================================
// Trade window — bounded per-symbol history with in-place bucket merge
// =============================================================================
//
// One window per symbol. An open candle bucket is re-reported by the exchange
// every time a fill lands in it, so a tick for an already-seen timestamp
// updates that entry in place; only a new bucket appends. The window is
// trimmed from the front to the bootstrap fetch depth.

use crate::types::Trade;

/// Ordered sequence of trades for one symbol, bounded to `capacity` entries.
///
/// Invariant: timestamps are unique within the window and non-decreasing in
/// insertion order.
#[derive(Debug, Clone)]
pub struct TradeWindow {
    trades: Vec<Trade>,
    capacity: usize,
}

impl TradeWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            trades: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Seed the window from bootstrap candles (already filtered and sorted).
    pub fn seed(capacity: usize, trades: Vec<Trade>) -> Self {
        let mut window = Self::new(capacity);
        window.trades = trades;
        window.trim();
        window
    }

    /// Merge a tick into the window.
    ///
    /// Same-timestamp ticks overwrite price and volume in place — repeated
    /// updates of an unclosed bucket must not create duplicate entries. A new
    /// timestamp appends and trims the oldest entries past capacity.
    pub fn apply(&mut self, trade: Trade) {
        match self.trades.iter_mut().find(|t| t.timestamp == trade.timestamp) {
            Some(existing) => {
                existing.price = trade.price;
                existing.volume = trade.volume;
            }
            None => {
                self.trades.push(trade);
                self.trim();
            }
        }
    }

    fn trim(&mut self) {
        while self.trades.len() > self.capacity {
            self.trades.remove(0);
        }
    }

    /// Most recent trade, if any.
    pub fn last(&self) -> Option<&Trade> {
        self.trades.last()
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn as_slice(&self) -> &[Trade] {
        &self.trades
    }

    pub fn to_vec(&self) -> Vec<Trade> {
        self.trades.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn sample_trade(timestamp: i64, price: i64, volume: i64) -> Trade {
        Trade {
            timestamp,
            price: Decimal::from(price),
            volume: Decimal::from(volume),
        }
    }

    #[test]
    fn new_timestamp_appends() {
        let mut window = TradeWindow::new(10);
        window.apply(sample_trade(60_000, 100, 5));
        window.apply(sample_trade(120_000, 101, 3));
        assert_eq!(window.len(), 2);
        assert_eq!(window.last().unwrap().timestamp, 120_000);
    }

    #[test]
    fn same_timestamp_merges_in_place() {
        let mut window = TradeWindow::new(10);
        window.apply(sample_trade(60_000, 100, 5));
        window.apply(sample_trade(60_000, 102, 8));

        assert_eq!(window.len(), 1);
        let trade = window.last().unwrap();
        assert_eq!(trade.price, Decimal::from(102));
        assert_eq!(trade.volume, Decimal::from(8));
    }

    #[test]
    fn merge_is_idempotent() {
        let mut window = TradeWindow::new(10);
        let tick = sample_trade(60_000, 100, 5);
        window.apply(tick.clone());
        window.apply(tick);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn appends_trim_oldest_past_capacity() {
        let mut window = TradeWindow::new(3);
        for i in 0..5 {
            window.apply(sample_trade(i * 60_000, 100 + i, 1));
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.as_slice()[0].timestamp, 120_000);
        assert_eq!(window.last().unwrap().timestamp, 240_000);
    }

    #[test]
    fn seed_respects_capacity() {
        let trades: Vec<Trade> = (0..6).map(|i| sample_trade(i * 60_000, 100, 1)).collect();
        let window = TradeWindow::seed(4, trades);
        assert_eq!(window.len(), 4);
        assert_eq!(window.as_slice()[0].timestamp, 120_000);
    }

    #[test]
    fn merge_after_seed_updates_seeded_entry() {
        let window_trades = vec![sample_trade(60_000, 100, 5)];
        let mut window = TradeWindow::seed(10, window_trades);
        window.apply(sample_trade(60_000, 110, 6));
        assert_eq!(window.len(), 1);
        assert_eq!(window.last().unwrap().price, Decimal::from(110));
    }
}
