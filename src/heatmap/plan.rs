// =============================================================================
// Trade plan derived from the market-maker target
// =============================================================================
//
// Makers hunting SHORTS push price up through the short liquidations, so the
// plan rides that move: LONG with targets at the short cluster and the stop
// under the long cluster. Hunting LONGS is the mirror image.

use serde::{Deserialize, Serialize};

use super::levels::BestLevel;
use crate::types::{Direction, MmTarget};

const TP2_EXTENSION: f64 = 0.003;

/// Fallback distances in percent of entry, used when the heatmap has no
/// level on the side we need.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackPct {
    pub tp1: f64,
    pub tp2: f64,
    pub sl: f64,
}

impl Default for FallbackPct {
    fn default() -> Self {
        Self {
            tp1: 0.4,
            tp2: 0.8,
            sl: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradePlan {
    pub side: Direction,
    pub entry: f64,
    pub tp1: Option<f64>,
    pub tp2: Option<f64>,
    pub sl: Option<f64>,
}

fn apply_pct(price: f64, pct: f64, up: bool) -> f64 {
    let k = pct / 100.0;
    if up {
        price * (1.0 + k)
    } else {
        price * (1.0 - k)
    }
}

fn finite_or(level: Option<f64>, fallback: f64) -> f64 {
    level.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(fallback)
}

pub fn build_plan(
    price: f64,
    target: MmTarget,
    nearest_long: Option<&BestLevel>,
    nearest_short: Option<&BestLevel>,
    fallback: &FallbackPct,
) -> TradePlan {
    let short_px = nearest_short.map(|l| l.price);
    let long_px = nearest_long.map(|l| l.price);

    match target {
        MmTarget::Shorts => TradePlan {
            side: Direction::Long,
            entry: price,
            tp1: Some(finite_or(short_px, apply_pct(price, fallback.tp1, true))),
            tp2: Some(finite_or(
                short_px.map(|p| p * (1.0 + TP2_EXTENSION)),
                apply_pct(price, fallback.tp2, true),
            )),
            sl: Some(finite_or(long_px, apply_pct(price, fallback.sl, false))),
        },
        MmTarget::Longs => TradePlan {
            side: Direction::Short,
            entry: price,
            tp1: Some(finite_or(long_px, apply_pct(price, fallback.tp1, false))),
            tp2: Some(finite_or(
                long_px.map(|p| p * (1.0 - TP2_EXTENSION)),
                apply_pct(price, fallback.tp2, false),
            )),
            sl: Some(finite_or(short_px, apply_pct(price, fallback.sl, true))),
        },
        MmTarget::Unclear => TradePlan {
            side: Direction::Avoid,
            entry: price,
            tp1: None,
            tp2: None,
            sl: None,
        },
    }
}
