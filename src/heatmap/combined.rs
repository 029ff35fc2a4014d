// =============================================================================
// Combined liquidation heatmap
// =============================================================================
//
// Merges two views of where liquidations sit:
//
//   * recent forced orders from the exchange, bucketed by price
//   * the heatmap provider's aggregate liquidation map
//
// The heat score summarises the merged cloud near price as the share of
// short liquidations: 1.0 means only shorts are stacked nearby, 0.0 only
// longs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ForceOrder, HeatmapLevel, LevelSide, LiqSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeatSource {
    Binance,
    Coinglass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedLevel {
    pub source: HeatSource,
    pub price: f64,
    pub side: Option<LevelSide>,
    pub size: f64,
    pub oi_change: Option<f64>,
    pub funding: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombinedHeatmap {
    pub levels: Vec<CombinedLevel>,
}

#[derive(Default)]
struct Bucket {
    long: f64,
    short: f64,
}

impl CombinedHeatmap {
    /// Bucket forced orders by `round(price / width) * width` and append the
    /// provider levels. Non-finite orders are skipped.
    pub fn build(
        orders: &[ForceOrder],
        bucket_width: f64,
        oi_change: Option<f64>,
        funding: Option<f64>,
        provider_levels: Vec<HeatmapLevel>,
    ) -> Self {
        let width = if bucket_width.is_finite() && bucket_width > 0.0 {
            bucket_width
        } else {
            50.0
        };

        let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();
        for o in orders {
            let notional = o.notional();
            if !o.price.is_finite() || !notional.is_finite() {
                continue;
            }
            let b = buckets.entry((o.price / width).round() as i64).or_default();
            match o.side {
                LiqSide::Long => b.long += notional,
                LiqSide::Short => b.short += notional,
            }
        }

        let mut levels: Vec<CombinedLevel> = buckets
            .into_iter()
            .map(|(idx, b)| CombinedLevel {
                source: HeatSource::Binance,
                price: idx as f64 * width,
                side: Some(if b.short > b.long {
                    LevelSide::Short
                } else {
                    LevelSide::Long
                }),
                size: b.long + b.short,
                oi_change,
                funding,
            })
            .collect();

        levels.extend(provider_levels.into_iter().map(|l| CombinedLevel {
            source: HeatSource::Coinglass,
            price: l.price,
            side: l.side,
            size: l.value,
            oi_change: None,
            funding: None,
        }));

        Self { levels }
    }

    pub fn count(&self, source: HeatSource) -> usize {
        self.levels.iter().filter(|l| l.source == source).count()
    }

    /// Share of short liquidation size among levels within `window_pct` of
    /// price. `None` when nothing tagged long or short sits in the window.
    pub fn heat_score(&self, price: f64, window_pct: f64) -> Option<f64> {
        if !price.is_finite() || price <= 0.0 {
            return None;
        }

        let (mut short, mut long) = (0.0, 0.0);
        for l in &self.levels {
            if !l.size.is_finite() || (l.price - price).abs() / price * 100.0 > window_pct {
                continue;
            }
            match l.side {
                Some(LevelSide::Short) => short += l.size,
                Some(LevelSide::Long) => long += l.size,
                _ => {}
            }
        }

        let total = short + long;
        (total > 0.0).then(|| short / total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(price: f64, qty: f64, side: LiqSide) -> ForceOrder {
        ForceOrder { price, qty, side }
    }

    #[test]
    fn buckets_take_the_heavier_side() {
        let orders = vec![
            order(60_010.0, 1.0, LiqSide::Short),
            order(59_990.0, 0.5, LiqSide::Long),
            order(60_130.0, 1.0, LiqSide::Long),
        ];
        let map = CombinedHeatmap::build(&orders, 50.0, Some(0.01), Some(0.0001), vec![]);

        assert_eq!(map.levels.len(), 2);
        let first = &map.levels[0];
        assert_eq!(first.price, 60_000.0);
        assert_eq!(first.side, Some(LevelSide::Short));
        assert!((first.size - (60_010.0 + 29_995.0)).abs() < 1e-6);
        assert_eq!(first.oi_change, Some(0.01));
        assert_eq!(map.levels[1].price, 60_150.0);
    }

    #[test]
    fn tied_bucket_counts_as_long() {
        let orders = vec![order(100.0, 1.0, LiqSide::Short), order(100.0, 1.0, LiqSide::Long)];
        let map = CombinedHeatmap::build(&orders, 50.0, None, None, vec![]);
        assert_eq!(map.levels[0].side, Some(LevelSide::Long));
    }

    #[test]
    fn heat_score_uses_window_only() {
        let provider = vec![
            HeatmapLevel { price: 101.0, value: 300.0, side: Some(LevelSide::Short) },
            HeatmapLevel { price: 99.0, value: 100.0, side: Some(LevelSide::Long) },
            HeatmapLevel { price: 120.0, value: 10_000.0, side: Some(LevelSide::Long) },
            HeatmapLevel { price: 100.5, value: 10_000.0, side: None },
        ];
        let map = CombinedHeatmap::build(&[], 50.0, None, None, provider);
        assert_eq!(map.count(HeatSource::Coinglass), 4);
        let heat = map.heat_score(100.0, 3.0).unwrap();
        assert!((heat - 0.75).abs() < 1e-9);
    }

    #[test]
    fn empty_window_has_no_score() {
        let map = CombinedHeatmap::default();
        assert!(map.heat_score(100.0, 3.0).is_none());
    }
}
