// =============================================================================
// Liquidity map from the futures order book
// =============================================================================
//
// Nearest resting bid below price and nearest ask above it, plus a cluster
// score: the largest single level within 2 % of price relative to a
// per-symbol base, floored at 0.3. An empty neighbourhood scores 0.5.

use serde::{Deserialize, Serialize};

use crate::types::{BookLevel, DepthSnapshot};

const CLUSTER_WINDOW_PCT: f64 = 2.0;
const BTC_CLUSTER_BASE: f64 = 5_000_000.0;
const ALT_CLUSTER_BASE: f64 = 1_000_000.0;
const MIN_SCORE: f64 = 0.3;
pub const NEUTRAL_SCORE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityLevel {
    pub price: f64,
    pub dist_pct: f64,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiquidityMap {
    pub nearest_long: Option<LiquidityLevel>,
    pub nearest_short: Option<LiquidityLevel>,
    pub score: f64,
}

impl Default for LiquidityMap {
    fn default() -> Self {
        Self {
            nearest_long: None,
            nearest_short: None,
            score: NEUTRAL_SCORE,
        }
    }
}

impl LiquidityMap {
    pub fn from_depth(symbol: &str, price: f64, depth: &DepthSnapshot) -> Self {
        if !price.is_finite() || price <= 0.0 {
            return Self::default();
        }

        let mut max_around = 0.0_f64;
        let mut scan = |levels: &[BookLevel], below: bool| -> Option<LiquidityLevel> {
            let mut nearest: Option<LiquidityLevel> = None;
            for l in levels {
                if !l.price.is_finite() || !l.qty.is_finite() {
                    continue;
                }
                let on_side = if below { l.price < price } else { l.price > price };
                if !on_side {
                    continue;
                }
                let value = l.price * l.qty;
                let dist_pct = (l.price - price).abs() / price * 100.0;
                if nearest.map_or(true, |n| dist_pct < n.dist_pct) {
                    nearest = Some(LiquidityLevel { price: l.price, dist_pct, value });
                }
                if dist_pct < CLUSTER_WINDOW_PCT && value > max_around {
                    max_around = value;
                }
            }
            nearest
        };

        let nearest_long = scan(&depth.bids, true);
        let nearest_short = scan(&depth.asks, false);

        let score = if max_around > 0.0 {
            let base = if symbol.starts_with("BTC") {
                BTC_CLUSTER_BASE
            } else {
                ALT_CLUSTER_BASE
            };
            (max_around / base).min(1.0).max(MIN_SCORE)
        } else {
            NEUTRAL_SCORE
        };

        Self {
            nearest_long,
            nearest_short,
            score,
        }
    }
}
