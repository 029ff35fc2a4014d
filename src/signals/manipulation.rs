// =============================================================================
// Manipulation heuristics
// =============================================================================
//
// Two independent halves, 0.5 each:
//
//   * book stacking  one side of the top 10 levels holds > 3× the other
//   * one-sided tape  taker buy share above 80 % or below 20 %

use serde::{Deserialize, Serialize};

use crate::market_data::TradeFlow;
use crate::types::{DepthSnapshot, Trade};

const TOP_LEVELS: usize = 10;
const STACK_RATIO: f64 = 3.0;
const ONE_SIDED_HIGH: f64 = 0.8;
const ONE_SIDED_LOW: f64 = 0.2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManipulationView {
    pub score: f64,
    pub notes: Vec<String>,
}

fn top_qty(levels: &[crate::types::BookLevel]) -> f64 {
    levels
        .iter()
        .take(TOP_LEVELS)
        .map(|l| if l.qty.is_finite() { l.qty } else { 0.0 })
        .sum()
}

pub fn detect_manipulation(depth: Option<&DepthSnapshot>, trades: Option<&[Trade]>) -> ManipulationView {
    let mut view = ManipulationView::default();

    if let Some(depth) = depth {
        let bid = top_qty(&depth.bids);
        let ask = top_qty(&depth.asks);
        if bid > ask * STACK_RATIO {
            view.score += 0.5;
            view.notes.push("Orderbook: heavy bid stacking (possible spoofing)".into());
        }
        if ask > bid * STACK_RATIO {
            view.score += 0.5;
            view.notes.push("Orderbook: heavy ask stacking (possible spoofing)".into());
        }
    }

    if let Some(ratio) = trades.and_then(|t| TradeFlow::from_trades(t).buy_ratio()) {
        if ratio > ONE_SIDED_HIGH || ratio < ONE_SIDED_LOW {
            view.score += 0.5;
            view.notes.push("Aggressive one-sided trade flow (possible layering)".into());
        }
    }

    view
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookLevel;

    fn depth(bid_qty: f64, ask_qty: f64) -> DepthSnapshot {
        DepthSnapshot {
            bids: vec![BookLevel { price: 99.0, qty: bid_qty }],
            asks: vec![BookLevel { price: 101.0, qty: ask_qty }],
        }
    }

    #[test]
    fn both_halves_add_up() {
        let trades = vec![Trade { price: 1.0, qty: 9.0, is_buyer_maker: false }];
        let v = detect_manipulation(Some(&depth(40.0, 10.0)), Some(&trades));
        assert_eq!(v.score, 1.0);
        assert_eq!(v.notes.len(), 2);
    }

    #[test]
    fn balanced_market_is_clean() {
        let trades = vec![
            Trade { price: 1.0, qty: 5.0, is_buyer_maker: false },
            Trade { price: 1.0, qty: 5.0, is_buyer_maker: true },
        ];
        let v = detect_manipulation(Some(&depth(10.0, 10.0)), Some(&trades));
        assert_eq!(v, ManipulationView::default());
    }

    #[test]
    fn missing_inputs_score_zero() {
        assert_eq!(detect_manipulation(None, None).score, 0.0);
    }
}
