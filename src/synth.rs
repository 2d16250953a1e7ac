// =============================================================================
// Currency Synthesizer — derived cross-currency windows
// =============================================================================
//
// The exchange feeds BASE/USDT; downstream consumers want BASE/KRW. Each time
// a source window changes, the full derived window is recomputed from it and
// written under the derived symbol key — an overwrite, never a merge, since
// the source window is authoritative.
//
// No usable rate (absent, zero) means no derived write at all.

use tracing::debug;

use crate::price_store::PriceStore;
use crate::types::{Symbol, Trade};

pub struct CurrencySynthesizer {
    /// Quote currency of the symbols this synthesizer derives from
    /// (e.g. `USDT`).
    source_quote: String,
    /// Quote currency of the derived symbols (e.g. `KRW`).
    target_quote: String,
    /// Store key of the foreign-exchange rate (e.g. `KRW/USD`).
    rate_symbol: Symbol,
}

impl CurrencySynthesizer {
    pub fn new(
        source_quote: impl Into<String>,
        target_quote: impl Into<String>,
        rate_symbol: Symbol,
    ) -> Self {
        let source_quote: String = source_quote.into();
        let target_quote: String = target_quote.into();
        Self {
            source_quote: source_quote.to_uppercase(),
            target_quote: target_quote.to_uppercase(),
            rate_symbol,
        }
    }

    /// The derived counterpart of `symbol`, if it is quoted in the source
    /// quote currency.
    pub fn derived_symbol(&self, symbol: &Symbol) -> Option<Symbol> {
        (symbol.quote == self.source_quote)
            .then(|| Symbol::new(symbol.base.clone(), self.target_quote.clone()))
    }

    /// Recompute and publish the derived window for `symbol`.
    ///
    /// Price is divided by the live rate; volume and timestamps are carried
    /// unchanged. Returns the derived symbol on a successful write, `None`
    /// when synthesis was skipped (wrong quote, no rate, empty window).
    pub fn publish(&self, store: &PriceStore, symbol: &Symbol, window: &[Trade]) -> Option<Symbol> {
        let derived = self.derived_symbol(symbol)?;

        let Some(rate) = store.get_rate(&self.rate_symbol) else {
            debug!(symbol = %symbol, rate_symbol = %self.rate_symbol, "no FX rate — synthesis skipped");
            return None;
        };

        let converted: Vec<Trade> = window
            .iter()
            .map(|t| Trade {
                timestamp: t.timestamp,
                price: t.price / rate,
                volume: t.volume,
            })
            .collect();

        let last_price = converted.last().map(|t| t.price)?;

        store.set_trades(&derived, converted);
        store.set_price(&derived, last_price);

        debug!(source = %symbol, derived = %derived, rate = %rate, "derived window published");
        Some(derived)
    }
}
