// =============================================================================
// Per-timeframe liquidation heatmap analysis
// =============================================================================
//
// For one timeframe the provider returns a cloud of liquidation levels. We
// look for the most attractive level on each side of price and compare the
// total liquidity resting on each side:
//
//   short pool > 1.15 × long pool  =>  makers are expected to hunt SHORTS
//   long pool  > 1.15 × short pool =>  makers are expected to hunt LONGS
//   otherwise                      =>  UNCLEAR
//
// A level is attractive when it is large and close: score = value / dist%,
// with the distance floored at 0.05 % so a level sitting on price does not
// dominate through division by ~0.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::feeds::HeatmapProvider;
use crate::pairs::base_asset;
use crate::types::{json_f64, HeatmapLevel, LevelSide, LiqSide, MmTarget};

/// Pool ratio required before one side counts as the target.
const TARGET_POOL_RATIO: f64 = 1.15;
/// Distance floor (percent) used when scoring levels.
const MIN_SCORE_DIST_PCT: f64 = 0.05;
/// Pool size that maps to full strength for BTC pairs.
const BTC_STRENGTH_BASE: f64 = 10_000_000.0;
/// Pool size that maps to full strength for every other pair.
const ALT_STRENGTH_BASE: f64 = 2_000_000.0;

/// The most attractive liquidation level on one side of price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestLevel {
    pub price: f64,
    pub value: f64,
    pub dist_pct: f64,
    pub score: f64,
}

/// Heatmap verdict for a single timeframe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeframeHeatmap {
    pub tf: String,
    pub mm_target: MmTarget,
    /// Largest pool relative to the symbol's base, in [0, 1].
    pub strength: f64,
    pub nearest_long: Option<BestLevel>,
    pub nearest_short: Option<BestLevel>,
    pub long_pool: f64,
    pub short_pool: f64,
}

/// Map a display timeframe onto the provider's interval parameter.
pub fn tf_to_interval(tf: &str) -> &'static str {
    match tf {
        "1h" => "1h",
        "12h" => "12h",
        _ => "1d",
    }
}

/// Extract liquidation levels from a provider response.
///
/// The level array has been seen under `data`, `data.liquidationMap`,
/// `data.map` and `data.data`. Level fields come as `price|p`,
/// `value|size|liq|amount` and `side|type`; numbers may be strings.
/// Levels without a non-zero price or a positive value are dropped.
pub fn derive_levels(body: &Value) -> Vec<HeatmapLevel> {
    let data = &body["data"];
    let container = ["liquidationMap", "map", "data"]
        .iter()
        .map(|k| &data[*k])
        .find(|v| is_truthy(v))
        .unwrap_or(data);

    let Some(raw) = container.as_array() else {
        return Vec::new();
    };

    raw.iter().filter_map(parse_level).collect()
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|x| x != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First field of `keys` that is present and not null.
fn first_present<'a>(x: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().map(|k| &x[*k]).find(|v| !v.is_null())
}

fn parse_level(x: &Value) -> Option<HeatmapLevel> {
    let price = first_present(x, &["price", "p"]).and_then(json_f64)?;
    let value = first_present(x, &["value", "size", "liq", "amount"]).and_then(json_f64)?;
    if price == 0.0 || value <= 0.0 {
        return None;
    }

    let side = first_present(x, &["side", "type"])
        .map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .and_then(|s| LevelSide::parse(&s));

    Some(HeatmapLevel { price, value, side })
}

/// Whether `level` may count towards `side` given its own side tag.
fn side_matches(level: &HeatmapLevel, side: LiqSide) -> bool {
    match (&level.side, side) {
        (None, _) => true,
        (Some(LevelSide::Long), LiqSide::Long) => true,
        (Some(LevelSide::Short), LiqSide::Short) => true,
        _ => false,
    }
}

/// Pick the highest-scoring level on `side`: long liquidations strictly below
/// price, short liquidations strictly above.
pub fn pick_best(levels: &[HeatmapLevel], price: f64, side: LiqSide) -> Option<BestLevel> {
    let mut best: Option<BestLevel> = None;

    for lvl in levels.iter().filter(|l| side_matches(l, side)) {
        let on_side = match side {
            LiqSide::Long => lvl.price < price,
            LiqSide::Short => lvl.price > price,
        };
        if !on_side {
            continue;
        }

        let dist_pct = (lvl.price - price).abs() / price * 100.0;
        let score = lvl.value / dist_pct.max(MIN_SCORE_DIST_PCT);

        if best.map_or(true, |b| score > b.score) {
            best = Some(BestLevel {
                price: lvl.price,
                value: lvl.value,
                dist_pct,
                score,
            });
        }
    }

    best
}

/// Total liquidation value resting on `side` of price.
pub fn sum_side(levels: &[HeatmapLevel], price: f64, side: LiqSide) -> f64 {
    levels
        .iter()
        .filter(|l| side_matches(l, side))
        .filter(|l| match side {
            LiqSide::Long => l.price < price,
            LiqSide::Short => l.price > price,
        })
        .map(|l| l.value)
        .sum()
}

/// Analyse one timeframe's levels around `price`.
pub fn analyze_levels(tf: &str, symbol: &str, price: f64, levels: &[HeatmapLevel]) -> TimeframeHeatmap {
    let nearest_long = pick_best(levels, price, LiqSide::Long);
    let nearest_short = pick_best(levels, price, LiqSide::Short);

    let long_pool = sum_side(levels, price, LiqSide::Long);
    let short_pool = sum_side(levels, price, LiqSide::Short);

    let mm_target = if short_pool > long_pool * TARGET_POOL_RATIO {
        MmTarget::Shorts
    } else if long_pool > short_pool * TARGET_POOL_RATIO {
        MmTarget::Longs
    } else {
        MmTarget::Unclear
    };

    let strength_base = if symbol.starts_with("BTC") {
        BTC_STRENGTH_BASE
    } else {
        ALT_STRENGTH_BASE
    };
    let strength = (long_pool.max(short_pool) / strength_base).min(1.0);

    TimeframeHeatmap {
        tf: tf.to_string(),
        mm_target,
        strength,
        nearest_long,
        nearest_short,
        long_pool,
        short_pool,
    }
}

/// Fetch and analyse one timeframe. The exchange-prefixed symbol
/// (`Binance_BTCUSDT`) is tried first, then the bare base asset.
pub async fn fetch_timeframe(
    provider: &dyn HeatmapProvider,
    symbol: &str,
    price: f64,
    tf: &str,
) -> Option<TimeframeHeatmap> {
    if !provider.is_configured() {
        return None;
    }

    let interval = tf_to_interval(tf);
    let prefixed = format!("Binance_{symbol}");

    let levels = match provider.timeframe_map(&prefixed, interval).await {
        Ok(levels) => levels,
        Err(e) => {
            debug!(symbol, tf, error = %e, "prefixed heatmap request failed, trying base asset");
            match provider.timeframe_map(&base_asset(symbol), interval).await {
                Ok(levels) => levels,
                Err(e) => {
                    warn!(symbol, tf, error = %e, "heatmap unavailable for timeframe");
                    return None;
                }
            }
        }
    };

    Some(analyze_levels(tf, symbol, price, &levels))
}
