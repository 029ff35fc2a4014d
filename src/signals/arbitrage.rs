// =============================================================================
// Cross-venue spread
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::types::ArbSide;

const ARB_THRESHOLD_PCT: f64 = 0.15;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArbitrageView {
    /// (venue - primary) / primary, in percent.
    pub spread_pct: f64,
    pub side: Option<ArbSide>,
}

/// Spread of the secondary venue over the primary exchange. Missing,
/// non-finite or zero primary prices give a flat view.
pub fn detect_arbitrage(primary: Option<f64>, venue: Option<f64>) -> ArbitrageView {
    let (Some(primary), Some(venue)) = (primary, venue) else {
        return ArbitrageView::default();
    };
    if !primary.is_finite() || !venue.is_finite() || primary == 0.0 {
        return ArbitrageView::default();
    }

    let spread_pct = (venue - primary) / primary * 100.0;
    let side = (spread_pct.abs() >= ARB_THRESHOLD_PCT).then(|| {
        if spread_pct > 0.0 {
            ArbSide::Up
        } else {
            ArbSide::Down
        }
    });

    ArbitrageView { spread_pct, side }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spread_sides() {
        assert_eq!(detect_arbitrage(Some(100.0), Some(100.2)).side, Some(ArbSide::Up));
        assert_eq!(detect_arbitrage(Some(100.0), Some(99.8)).side, Some(ArbSide::Down));
        let v = detect_arbitrage(Some(100.0), Some(100.1));
        assert!(v.side.is_none());
        assert!((v.spread_pct - 0.1).abs() < 1e-9);
    }

    #[test]
    fn failures_are_flat() {
        assert_eq!(detect_arbitrage(None, Some(1.0)), ArbitrageView::default());
        assert_eq!(detect_arbitrage(Some(0.0), Some(1.0)), ArbitrageView::default());
    }
}
