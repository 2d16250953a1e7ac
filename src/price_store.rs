// =============================================================================
// Shared price/trade store
// =============================================================================
//
// Process-wide cache of last prices and trade windows, keyed by Symbol and
// consumed by downstream readers (REST API, other adapters). Last-write-wins.
//
// Single-writer-per-symbol discipline: each adapter writes only the symbols
// it owns (plus its derived symbols) and reads other entries only for the
// foreign-exchange rate. Enforced by convention and tests, not by the type
// system.

use std::collections::HashMap;

use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::types::{Symbol, Trade};

#[derive(Debug, Default)]
pub struct PriceStore {
    prices: RwLock<HashMap<Symbol, Decimal>>,
    trades: RwLock<HashMap<Symbol, Vec<Trade>>>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_price(&self, symbol: &Symbol, price: Decimal) {
        self.prices.write().insert(symbol.clone(), price);
    }

    pub fn get_price(&self, symbol: &Symbol) -> Option<Decimal> {
        self.prices.read().get(symbol).copied()
    }

    /// Replace the full trade window for `symbol`.
    pub fn set_trades(&self, symbol: &Symbol, window: Vec<Trade>) {
        self.trades.write().insert(symbol.clone(), window);
    }

    pub fn get_trades(&self, symbol: &Symbol) -> Option<Vec<Trade>> {
        self.trades.read().get(symbol).cloned()
    }

    /// Foreign-exchange rate lookup. A rate that was never fetched or came
    /// back zero is unusable, so both report as absent.
    pub fn get_rate(&self, pair: &Symbol) -> Option<Decimal> {
        self.get_price(pair).filter(|rate| !rate.is_zero())
    }

    /// Snapshot of all known last prices, keyed by display form.
    pub fn price_snapshot(&self) -> HashMap<String, Decimal> {
        self.prices
            .read()
            .iter()
            .map(|(sym, price)| (sym.to_string(), *price))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn btc_usdt() -> Symbol {
        Symbol::new("BTC", "USDT")
    }

    #[test]
    fn price_roundtrip() {
        let store = PriceStore::new();
        assert_eq!(store.get_price(&btc_usdt()), None);

        store.set_price(&btc_usdt(), Decimal::from(50_000));
        assert_eq!(store.get_price(&btc_usdt()), Some(Decimal::from(50_000)));
    }

    #[test]
    fn trades_last_write_wins() {
        let store = PriceStore::new();
        let trade = |ts: i64| Trade {
            timestamp: ts,
            price: Decimal::from(10),
            volume: Decimal::ONE,
        };

        store.set_trades(&btc_usdt(), vec![trade(1_000)]);
        store.set_trades(&btc_usdt(), vec![trade(2_000), trade(3_000)]);

        let window = store.get_trades(&btc_usdt()).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].timestamp, 2_000);
    }

    #[test]
    fn missing_rate_is_none() {
        let store = PriceStore::new();
        assert_eq!(store.get_rate(&Symbol::new("KRW", "USD")), None);
    }

    #[test]
    fn zero_rate_is_none() {
        let store = PriceStore::new();
        let pair = Symbol::new("KRW", "USD");
        store.set_price(&pair, Decimal::ZERO);
        assert_eq!(store.get_rate(&pair), None);

        store.set_price(&pair, Decimal::from(1_300));
        assert_eq!(store.get_rate(&pair), Some(Decimal::from(1_300)));
    }

    #[test]
    fn snapshot_keys_by_display_form() {
        let store = PriceStore::new();
        store.set_price(&btc_usdt(), Decimal::from(50_000));
        let snapshot = store.price_snapshot();
        assert_eq!(snapshot.get("BTC/USDT"), Some(&Decimal::from(50_000)));
    }
}
