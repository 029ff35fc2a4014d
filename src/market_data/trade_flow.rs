// =============================================================================
// Trade Flow: taker aggression over a batch of recent trades
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::types::Trade;

/// Aggregated taker flow over a trade sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TradeFlow {
    pub buy_notional: f64,
    pub sell_notional: f64,
    /// Cumulative volume delta (buy notional - sell notional).
    pub cvd: f64,
    pub trade_count: u64,
}

impl TradeFlow {
    /// Buyer-maker trades are taker sells. Trades with a non-finite price or
    /// quantity are skipped.
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut flow = Self::default();
        for t in trades {
            if !t.price.is_finite() || !t.qty.is_finite() {
                continue;
            }
            let volume = t.notional();
            if t.is_buyer_maker {
                flow.sell_notional += volume;
                flow.cvd -= volume;
            } else {
                flow.buy_notional += volume;
                flow.cvd += volume;
            }
            flow.trade_count += 1;
        }
        flow
    }

    pub fn total(&self) -> f64 {
        self.buy_notional + self.sell_notional
    }

    /// Buy share of total notional, `None` when there was no flow.
    pub fn buy_ratio(&self) -> Option<f64> {
        let total = self.total();
        (total > 0.0).then(|| self.buy_notional / total)
    }
}
