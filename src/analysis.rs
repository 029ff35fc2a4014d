// =============================================================================
// Per-symbol analysis
// =============================================================================
//
// One pass over every data source for a symbol:
//
//   price ── 2 × 1m spot klines (close, change %, volume spike)
//     │
//     ├── funding, OI + history, futures depth (liquidity map)
//     ├── spot trades (whales), spot + venue prices (arbitrage)
//     ├── spot depth + trades (manipulation), venue depth (confirmation)
//     │                                           all concurrently
//     └── OI/funding interpretation → long/short ratio → MM direction
//
// Every input is best effort. Only a missing or non-finite price aborts.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use crate::feeds::{ExchangeFeed, HeatmapProvider, SecondaryVenue};
use crate::futures_intel::{
    interpret_oi_funding, FundingRateMonitor, FundingState, LongShortMonitor, LsrContext, LsrState,
    OIState, OiFundingView, OpenInterestTracker,
};
use crate::heatmap::{
    build_plan, fetch_timeframe, resolve_target, CombinedHeatmap, FallbackPct, ResolveContext,
    TargetResolution, TimeframeHeatmap, TradePlan,
};
use crate::market_data::{DepthConfirmation, LiquidityMap, OrderBookState};
use crate::pairs::coinglass_symbol;
use crate::signals::{
    compute_mm_direction, detect_arbitrage, detect_manipulation, detect_pump_dump, detect_whales,
    ArbitrageView, ManipulationView, MmDirection, MmDirectionInput, PumpDumpView, WhaleFlow,
};
use crate::types::Kline;

const LIQUIDITY_DEPTH_LIMIT: u32 = 100;
const WHALE_TRADE_LIMIT: u32 = 100;
const MANIPULATION_DEPTH_LIMIT: u32 = 50;
const MANIPULATION_TRADE_LIMIT: u32 = 50;
const VENUE_DEPTH_LIMIT: u32 = 50;
const BOOK_SUMMARY_LEVELS: usize = 20;

/// Everything known about one symbol after a full analysis pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolAnalysis {
    pub symbol: String,
    pub price: f64,
    /// Close-to-close change of the last two 1m candles, in percent.
    pub change_pct: f64,
    /// Last candle volume over the previous one.
    pub vol_spike: f64,
    pub funding: Option<FundingState>,
    pub oi: OIState,
    pub liquidity: LiquidityMap,
    pub whales: WhaleFlow,
    pub arbitrage: ArbitrageView,
    pub manipulation: ManipulationView,
    /// Spot book summary over the manipulation sample, when depth answered.
    pub book: Option<OrderBookState>,
    pub depth_confirmation: DepthConfirmation,
    pub pump_dump: PumpDumpView,
    pub oi_funding: OiFundingView,
    pub lsr: LsrState,
    pub mm: MmDirection,
    pub analyzed_at: DateTime<Utc>,
}

impl SymbolAnalysis {
    pub fn funding_rate(&self) -> Option<f64> {
        self.funding.map(|f| f.rate)
    }
}

/// Multi-timeframe heatmap read built on top of an analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatmapView {
    pub results: Vec<TimeframeHeatmap>,
    pub resolution: TargetResolution,
    pub plan: TradePlan,
}

/// Price, change % and volume spike from the last two 1m candles.
pub fn price_context(klines: &[Kline]) -> Option<(f64, f64, f64)> {
    let last = klines.last()?;
    if !last.close.is_finite() {
        return None;
    }

    let (change_pct, vol_spike) = match klines.len().checked_sub(2).map(|i| &klines[i]) {
        Some(prev) => {
            let change = if prev.close.is_finite() && prev.close != 0.0 {
                (last.close - prev.close) / prev.close * 100.0
            } else {
                0.0
            };
            let spike = if prev.volume.is_finite() && prev.volume > 0.0 && last.volume.is_finite() {
                last.volume / prev.volume
            } else {
                1.0
            };
            (change, spike)
        }
        None => (0.0, 1.0),
    };

    Some((last.close, change_pct, vol_spike))
}

pub struct Analyzer {
    feed: Arc<dyn ExchangeFeed>,
    venue: Arc<dyn SecondaryVenue>,
    heatmap: Arc<dyn HeatmapProvider>,
    funding: FundingRateMonitor,
    oi: OpenInterestTracker,
    lsr: LongShortMonitor,
}

impl Analyzer {
    pub fn new(
        feed: Arc<dyn ExchangeFeed>,
        venue: Arc<dyn SecondaryVenue>,
        heatmap: Arc<dyn HeatmapProvider>,
    ) -> Self {
        Self {
            funding: FundingRateMonitor::new(feed.clone()),
            oi: OpenInterestTracker::new(feed.clone()),
            lsr: LongShortMonitor::new(feed.clone(), venue.clone()),
            feed,
            venue,
            heatmap,
        }
    }

    pub fn feed(&self) -> &dyn ExchangeFeed {
        self.feed.as_ref()
    }

    async fn liquidity(&self, symbol: &str, price: f64) -> LiquidityMap {
        match self.feed.futures_depth(symbol, LIQUIDITY_DEPTH_LIMIT).await {
            Ok(depth) => LiquidityMap::from_depth(symbol, price, &depth),
            Err(e) => {
                warn!(symbol, error = %e, "futures depth unavailable, neutral liquidity map");
                LiquidityMap::default()
            }
        }
    }

    async fn whales(&self, symbol: &str) -> WhaleFlow {
        match self.feed.spot_trades(symbol, WHALE_TRADE_LIMIT).await {
            Ok(trades) => detect_whales(symbol, &trades),
            Err(e) => {
                warn!(symbol, error = %e, "spot trades unavailable for whale detection");
                WhaleFlow::default()
            }
        }
    }

    async fn arbitrage(&self, symbol: &str) -> ArbitrageView {
        let (primary, venue) = tokio::join!(self.feed.spot_price(symbol), self.venue.price(symbol));
        let primary = primary
            .map_err(|e| warn!(symbol, error = %e, "spot price unavailable for arbitrage"))
            .ok();
        let venue = venue
            .map_err(|e| warn!(symbol, venue = self.venue.name(), error = %e, "venue price unavailable"))
            .ok();
        detect_arbitrage(primary, venue)
    }

    async fn manipulation(&self, symbol: &str) -> (ManipulationView, Option<OrderBookState>) {
        let (depth, trades) = tokio::join!(
            self.feed.spot_depth(symbol, MANIPULATION_DEPTH_LIMIT),
            self.feed.spot_trades(symbol, MANIPULATION_TRADE_LIMIT),
        );
        let depth = depth
            .map_err(|e| warn!(symbol, error = %e, "spot depth unavailable for manipulation check"))
            .ok();
        let trades = trades
            .map_err(|e| warn!(symbol, error = %e, "spot trades unavailable for manipulation check"))
            .ok();
        let book = depth
            .as_ref()
            .map(|d| OrderBookState::from_depth(symbol, d, BOOK_SUMMARY_LEVELS));
        (detect_manipulation(depth.as_ref(), trades.as_deref()), book)
    }

    async fn depth_confirmation(&self, symbol: &str) -> DepthConfirmation {
        match self.venue.depth(symbol, VENUE_DEPTH_LIMIT).await {
            Ok(depth) => DepthConfirmation::from_depth(&depth),
            Err(e) => {
                warn!(symbol, venue = self.venue.name(), error = %e, "venue depth unavailable");
                DepthConfirmation::unavailable("venue error")
            }
        }
    }

    /// Full analysis of `symbol`. `None` only when no usable price exists.
    #[instrument(skip(self), name = "analyze_symbol")]
    pub async fn analyze_symbol(&self, symbol: &str) -> Option<SymbolAnalysis> {
        let klines = match self.feed.spot_klines(symbol, "1m", 2).await {
            Ok(k) => k,
            Err(e) => {
                warn!(symbol, error = %e, "klines unavailable, skipping analysis");
                return None;
            }
        };
        let (price, change_pct, vol_spike) = price_context(&klines)?;

        let (funding, oi, liquidity, whales, arbitrage, (manipulation, book), depth_confirmation) = tokio::join!(
            self.funding.fetch(symbol),
            self.oi.fetch(symbol),
            self.liquidity(symbol, price),
            self.whales(symbol),
            self.arbitrage(symbol),
            self.manipulation(symbol),
            self.depth_confirmation(symbol),
        );

        let pump_dump = detect_pump_dump(change_pct, vol_spike);
        let funding_rate = funding.map(|f| f.rate);
        let oi_funding = interpret_oi_funding(oi.current, oi.previous, change_pct, funding_rate);

        let lsr = self
            .lsr
            .fetch(
                symbol,
                &LsrContext {
                    funding: funding_rate,
                    oi_bias: oi_funding.bias,
                    whale_side: whales.side,
                },
            )
            .await;

        let mm = compute_mm_direction(&MmDirectionInput {
            liq_score: Some(liquidity.score),
            oi_bias: oi_funding.bias,
            whale_side: whales.side,
            pump_dump: pump_dump.label,
            manip_score: manipulation.score,
            arb_side: arbitrage.side,
        });

        debug!(
            symbol,
            price,
            direction = %mm.direction,
            lsr = lsr.ratio,
            lsr_source = %lsr.source,
            "symbol analysed"
        );

        Some(SymbolAnalysis {
            symbol: symbol.to_string(),
            price,
            change_pct,
            vol_spike,
            funding,
            oi,
            liquidity,
            whales,
            arbitrage,
            manipulation,
            book,
            depth_confirmation,
            pump_dump,
            oi_funding,
            lsr,
            mm,
            analyzed_at: Utc::now(),
        })
    }

    /// Per-timeframe heatmap results, the resolved target and a plan built
    /// from the first timeframe's levels. Timeframes are fetched in order.
    #[instrument(skip(self, analysis, fallback), fields(symbol = %analysis.symbol))]
    pub async fn heatmap_view(
        &self,
        analysis: &SymbolAnalysis,
        timeframes: &[String],
        fallback: &FallbackPct,
    ) -> HeatmapView {
        let mut results = Vec::with_capacity(timeframes.len());
        for tf in timeframes {
            if let Some(r) = fetch_timeframe(self.heatmap.as_ref(), &analysis.symbol, analysis.price, tf).await {
                results.push(r);
            }
        }

        let resolution = resolve_target(
            &results,
            &ResolveContext {
                funding: analysis.funding_rate(),
                lsr: Some(analysis.lsr.ratio),
                oi_bias: Some(analysis.oi_funding.bias),
            },
        );

        let first = results.first();
        let plan = build_plan(
            analysis.price,
            resolution.target,
            first.and_then(|r| r.nearest_long.as_ref()),
            first.and_then(|r| r.nearest_short.as_ref()),
            fallback,
        );

        HeatmapView {
            results,
            resolution,
            plan,
        }
    }

    /// Forced liquidations over the lookback window merged with the
    /// provider's aggregate map.
    #[instrument(skip(self), name = "combined_heatmap")]
    pub async fn combined_heatmap(&self, symbol: &str, lookback_secs: u64, bucket_width: f64) -> CombinedHeatmap {
        let end_ms = Utc::now().timestamp_millis();
        let start_ms = end_ms - (lookback_secs as i64) * 1000;

        let provider_levels = async {
            if !self.heatmap.is_configured() {
                return Vec::new();
            }
            self.heatmap
                .liquidation_map(&coinglass_symbol(symbol))
                .await
                .unwrap_or_else(|e| {
                    warn!(symbol, error = %e, "provider liquidation map unavailable");
                    Vec::new()
                })
        };

        let (orders, oi_change, funding, provider_levels) = tokio::join!(
            self.feed.force_orders(symbol, start_ms, end_ms),
            self.oi.change(symbol),
            self.funding.fetch(symbol),
            provider_levels,
        );

        let orders = orders.unwrap_or_else(|e| {
            warn!(symbol, error = %e, "forced orders unavailable");
            Vec::new()
        });

        CombinedHeatmap::build(
            &orders,
            bucket_width,
            oi_change,
            funding.map(|f| f.rate),
            provider_levels,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::resolver::ResolutionReason;
    use crate::heatmap::HeatSource;
    use crate::test_support::{kline, StubExchange, StubHeatmap, StubVenue};
    use crate::types::{Direction, ForceOrder, HeatmapLevel, LevelSide, LiqSide, MmTarget};

    #[test]
    fn price_context_from_two_candles() {
        let k = vec![kline(100.0, 10.0), kline(101.0, 30.0)];
        let (price, change, spike) = price_context(&k).unwrap();
        assert_eq!(price, 101.0);
        assert!((change - 1.0).abs() < 1e-9);
        assert!((spike - 3.0).abs() < 1e-9);
    }

    #[test]
    fn price_context_edge_cases() {
        assert!(price_context(&[]).is_none());
        assert_eq!(price_context(&[kline(5.0, 1.0)]), Some((5.0, 0.0, 1.0)));
        let (_, _, spike) = price_context(&[kline(5.0, 0.0), kline(5.0, 9.0)]).unwrap();
        assert_eq!(spike, 1.0);
        assert!(price_context(&[kline(f64::NAN, 1.0)]).is_none());
    }

    #[tokio::test]
    async fn missing_price_aborts() {
        let analyzer = Analyzer::new(
            Arc::new(StubExchange::default()),
            Arc::new(StubVenue::default()),
            Arc::new(StubHeatmap::default()),
        );
        assert!(analyzer.analyze_symbol("BTCUSDT").await.is_none());
    }

    #[tokio::test]
    async fn degraded_sources_still_produce_analysis() {
        let feed = StubExchange {
            klines: Some(vec![kline(100.0, 1.0), kline(100.6, 3.0)]),
            ..Default::default()
        };
        let analyzer = Analyzer::new(
            Arc::new(feed),
            Arc::new(StubVenue::default()),
            Arc::new(StubHeatmap::default()),
        );

        let a = analyzer.analyze_symbol("BTCUSDT").await.unwrap();
        assert_eq!(a.price, 100.6);
        assert!(a.funding.is_none());
        assert!(a.book.is_none());
        assert_eq!(a.liquidity.score, 0.5);
        assert!(matches!(a.depth_confirmation, DepthConfirmation::Unavailable { .. }));
        // 0.6 % move with a 3× volume spike
        assert_eq!(a.pump_dump.label, Some(crate::types::PumpDumpLabel::Pump));
        assert_eq!(a.lsr.source, crate::futures_intel::long_short_ratio::LsrSource::Estimate);
    }

    #[tokio::test]
    async fn heatmap_view_without_provider_falls_back_to_funding() {
        let feed = StubExchange {
            klines: Some(vec![kline(100.0, 1.0), kline(100.0, 1.0)]),
            funding: Some(vec![crate::types::FundingRecord { rate: 0.0004, funding_time: 0 }]),
            ..Default::default()
        };
        let analyzer = Analyzer::new(
            Arc::new(feed),
            Arc::new(StubVenue::default()),
            Arc::new(StubHeatmap::default()),
        );
        let a = analyzer.analyze_symbol("BTCUSDT").await.unwrap();
        let view = analyzer
            .heatmap_view(&a, &["1h".to_string()], &FallbackPct::default())
            .await;

        assert!(view.results.is_empty());
        assert_eq!(view.resolution.reason, ResolutionReason::Funding);
        assert_eq!(view.resolution.target, MmTarget::Longs);
        assert_eq!(view.plan.side, Direction::Short);
        assert!((view.plan.tp1.unwrap() - 99.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn heatmap_view_uses_first_timeframe_levels() {
        let feed = StubExchange {
            klines: Some(vec![kline(100.0, 1.0), kline(100.0, 1.0)]),
            ..Default::default()
        };
        let provider = StubHeatmap::configured().with_timeframe_levels(vec![
            HeatmapLevel { price: 98.0, value: 1_000.0, side: None },
            HeatmapLevel { price: 102.0, value: 5_000.0, side: None },
        ]);
        let analyzer = Analyzer::new(Arc::new(feed), Arc::new(StubVenue::default()), Arc::new(provider));
        let a = analyzer.analyze_symbol("AVAXUSDT").await.unwrap();
        let tfs = vec!["1h".to_string(), "12h".to_string()];
        let view = analyzer.heatmap_view(&a, &tfs, &FallbackPct::default()).await;

        assert_eq!(view.results.len(), 2);
        assert_eq!(view.resolution.target, MmTarget::Shorts);
        assert_eq!(view.plan.side, Direction::Long);
        assert_eq!(view.plan.tp1, Some(102.0));
        assert_eq!(view.plan.sl, Some(98.0));
    }

    #[tokio::test]
    async fn combined_heatmap_merges_sources() {
        let feed = StubExchange {
            force_orders: Some(vec![ForceOrder { price: 100.0, qty: 2.0, side: LiqSide::Short }]),
            oi_history: Some(vec![100.0, 110.0]),
            ..Default::default()
        };
        let provider = StubHeatmap::configured().with_liquidation_levels(vec![HeatmapLevel {
            price: 99.0,
            value: 200.0,
            side: Some(LevelSide::Long),
        }]);
        let analyzer = Analyzer::new(Arc::new(feed), Arc::new(StubVenue::default()), Arc::new(provider));

        let map = analyzer.combined_heatmap("BTCUSDT", 300, 50.0).await;
        assert_eq!(map.count(HeatSource::Binance), 1);
        assert_eq!(map.count(HeatSource::Coinglass), 1);
        assert!((map.levels[0].oi_change.unwrap() - 0.1).abs() < 1e-9);
        assert!((map.heat_score(100.0, 3.0).unwrap() - 0.5).abs() < 1e-9);
    }
}
