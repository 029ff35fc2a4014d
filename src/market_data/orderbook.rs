// =============================================================================
// Order book summaries
// =============================================================================
//
// Snapshots are fetched on demand; nothing here keeps a live book. Two views:
//
//   OrderBookState  best bid/ask, depth, spread and imbalance of one book
//   DepthConfirmation  bid vs ask notional on the secondary venue, used as
//                        an independent read on book pressure

use serde::{Deserialize, Serialize};

use crate::types::{BookLevel, DepthSnapshot};

/// Levels summed on each side for the secondary-venue confirmation.
const CONFIRMATION_LEVELS: usize = 20;
const BUY_PRESSURE_RATIO: f64 = 1.35;
const SELL_PRESSURE_RATIO: f64 = 0.74;

/// Orderbook state for a single symbol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderBookState {
    pub symbol: String,
    pub best_bid: f64,
    pub best_ask: f64,
    /// Quantity resting on the first `levels` bid levels.
    pub bid_depth: f64,
    pub ask_depth: f64,
    pub bid_notional: f64,
    pub ask_notional: f64,
    pub spread_bps: f64,
    /// (bid - ask) / (bid + ask) over quantity, in [-1, +1].
    pub imbalance: f64,
}

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

fn side_totals(levels: &[BookLevel], n: usize) -> (f64, f64) {
    levels.iter().take(n).fold((0.0, 0.0), |(qty, notional), l| {
        let q = finite_or_zero(l.qty);
        let n = finite_or_zero(l.price * l.qty);
        (qty + q, notional + n)
    })
}

impl OrderBookState {
    pub fn from_depth(symbol: &str, depth: &DepthSnapshot, levels: usize) -> Self {
        let best_bid = depth.bids.first().map(|l| finite_or_zero(l.price)).unwrap_or(0.0);
        let best_ask = depth.asks.first().map(|l| finite_or_zero(l.price)).unwrap_or(0.0);

        let (bid_depth, bid_notional) = side_totals(&depth.bids, levels);
        let (ask_depth, ask_notional) = side_totals(&depth.asks, levels);

        let mid = (best_bid + best_ask) / 2.0;
        let spread_bps = if best_bid > 0.0 && best_ask > 0.0 && mid > 0.0 {
            ((best_ask - best_bid) / mid) * 10_000.0
        } else {
            0.0
        };

        let total_depth = bid_depth + ask_depth;
        let imbalance = if total_depth > 0.0 {
            (bid_depth - ask_depth) / total_depth
        } else {
            0.0
        };

        Self {
            symbol: symbol.to_string(),
            best_bid,
            best_ask,
            bid_depth,
            ask_depth,
            bid_notional,
            ask_notional,
            spread_bps,
            imbalance,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookPressure {
    BuyPressure,
    SellPressure,
    Balanced,
}

impl std::fmt::Display for BookPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuyPressure => write!(f, "BUY_PRESSURE"),
            Self::SellPressure => write!(f, "SELL_PRESSURE"),
            Self::Balanced => write!(f, "BALANCED"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DepthConfirmation {
    Available {
        bid_top: f64,
        ask_top: f64,
        ratio: f64,
        pressure: BookPressure,
    },
    Unavailable {
        reason: String,
    },
}

impl DepthConfirmation {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn from_depth(depth: &DepthSnapshot) -> Self {
        if depth.bids.is_empty() || depth.asks.is_empty() {
            return Self::unavailable("empty book");
        }

        let top = |levels: &[BookLevel]| -> f64 {
            levels
                .iter()
                .take(CONFIRMATION_LEVELS)
                .filter(|l| l.price.is_finite() && l.qty.is_finite())
                .filter(|l| l.price != 0.0 && l.qty != 0.0)
                .map(|l| l.price * l.qty)
                .sum()
        };

        let bid_top = top(&depth.bids);
        let ask_top = top(&depth.asks);
        if bid_top + ask_top == 0.0 {
            return Self::unavailable("thin book");
        }

        let ratio = bid_top / ask_top.max(1.0);
        let pressure = if ratio >= BUY_PRESSURE_RATIO {
            BookPressure::BuyPressure
        } else if ratio <= SELL_PRESSURE_RATIO {
            BookPressure::SellPressure
        } else {
            BookPressure::Balanced
        };

        Self::Available {
            bid_top,
            ask_top,
            ratio,
            pressure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book(bids: &[(f64, f64)], asks: &[(f64, f64)]) -> DepthSnapshot {
        let lv = |v: &[(f64, f64)]| v.iter().map(|&(price, qty)| BookLevel { price, qty }).collect();
        DepthSnapshot { bids: lv(bids), asks: lv(asks) }
    }

    #[test]
    fn state_from_depth() {
        let d = book(&[(99.0, 3.0), (98.0, 1.0)], &[(101.0, 1.0), (102.0, f64::NAN)]);
        let s = OrderBookState::from_depth("BTCUSDT", &d, 10);
        assert_eq!(s.best_bid, 99.0);
        assert_eq!(s.best_ask, 101.0);
        assert_eq!(s.bid_depth, 4.0);
        assert_eq!(s.ask_depth, 1.0);
        assert!((s.imbalance - 0.6).abs() < 1e-12);
        assert!((s.spread_bps - 200.0).abs() < 1e-9);
    }

    #[test]
    fn level_limit_applies() {
        let d = book(&[(99.0, 1.0), (98.0, 100.0)], &[(101.0, 1.0)]);
        let s = OrderBookState::from_depth("X", &d, 1);
        assert_eq!(s.bid_depth, 1.0);
        assert_eq!(s.imbalance, 0.0);
    }

    #[test]
    fn confirmation_pressure() {
        let d = book(&[(100.0, 14.0)], &[(100.0, 10.0)]);
        match DepthConfirmation::from_depth(&d) {
            DepthConfirmation::Available { pressure, ratio, .. } => {
                assert_eq!(pressure, BookPressure::BuyPressure);
                assert!((ratio - 1.4).abs() < 1e-12);
            }
            other => panic!("unexpected {other:?}"),
        }

        let d = book(&[(100.0, 7.0)], &[(100.0, 10.0)]);
        assert!(matches!(
            DepthConfirmation::from_depth(&d),
            DepthConfirmation::Available { pressure: BookPressure::SellPressure, .. }
        ));
    }

    #[test]
    fn confirmation_unavailable() {
        assert!(matches!(
            DepthConfirmation::from_depth(&book(&[], &[(1.0, 1.0)])),
            DepthConfirmation::Unavailable { .. }
        ));
        assert!(matches!(
            DepthConfirmation::from_depth(&book(&[(0.0, 1.0)], &[(1.0, 0.0)])),
            DepthConfirmation::Unavailable { .. }
        ));
    }
}
