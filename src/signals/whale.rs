// =============================================================================
// Whale detector: large prints and dominant taker side
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::market_data::TradeFlow;
use crate::types::{FlowSide, Trade};

const BTC_WHALE_NOTIONAL: f64 = 200_000.0;
const ALT_WHALE_NOTIONAL: f64 = 50_000.0;
const BUY_SIDE_RATIO: f64 = 0.6;
const SELL_SIDE_RATIO: f64 = 0.4;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WhaleFlow {
    /// Number of trades at or above the whale threshold.
    pub whale_score: u32,
    /// Dominant taker side across all trades in the sample.
    pub side: Option<FlowSide>,
    pub big_trades: Vec<Trade>,
}

pub fn whale_threshold(symbol: &str) -> f64 {
    if symbol.starts_with("BTC") {
        BTC_WHALE_NOTIONAL
    } else {
        ALT_WHALE_NOTIONAL
    }
}

pub fn detect_whales(symbol: &str, trades: &[Trade]) -> WhaleFlow {
    let threshold = whale_threshold(symbol);
    let big_trades: Vec<Trade> = trades
        .iter()
        .filter(|t| t.price.is_finite() && t.qty.is_finite())
        .filter(|t| t.notional() >= threshold)
        .copied()
        .collect();

    let Some(buy_ratio) = TradeFlow::from_trades(trades).buy_ratio() else {
        return WhaleFlow::default();
    };

    let side = if buy_ratio > BUY_SIDE_RATIO {
        Some(FlowSide::Buy)
    } else if buy_ratio < SELL_SIDE_RATIO {
        Some(FlowSide::Sell)
    } else {
        None
    };

    WhaleFlow {
        whale_score: big_trades.len() as u32,
        side,
        big_trades,
    }
}
