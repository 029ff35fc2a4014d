// =============================================================================
// Long/Short Ratio Monitor: crowd positioning with a fallback chain
// =============================================================================
//
// Sources, first usable one wins:
//
//   1. BINANCE  last 5m taker buy/sell volume ratio
//   2. MEXC  taker buy/sell notional over recent secondary-venue trades
//   3. ESTIMATE  1 + oiBias×0.5 + funding×20 + whaleBias, clamped to [0.5, 2]
//
// The monitor never fails: the estimate is always available.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::feeds::{ExchangeFeed, SecondaryVenue};
use crate::market_data::TradeFlow;
use crate::types::FlowSide;

const TAKER_PERIOD: &str = "5m";
const ESTIMATE_MIN: f64 = 0.5;
const ESTIMATE_MAX: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LsrSource {
    Binance,
    Mexc,
    Estimate,
}

impl std::fmt::Display for LsrSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binance => write!(f, "BINANCE"),
            Self::Mexc => write!(f, "MEXC"),
            Self::Estimate => write!(f, "ESTIMATE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LsrState {
    pub source: LsrSource,
    pub ratio: f64,
}

/// Inputs for the estimate used when no venue answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct LsrContext {
    pub funding: Option<f64>,
    pub oi_bias: f64,
    pub whale_side: Option<FlowSide>,
}

/// Secondary-venue trade sample size per symbol.
fn venue_trade_limit(symbol: &str) -> u32 {
    match symbol {
        "BTCUSDT" => 500,
        "AVAXUSDT" => 300,
        _ => 200,
    }
}

pub fn estimate_ratio(ctx: &LsrContext) -> f64 {
    let whale_bias = match ctx.whale_side {
        Some(FlowSide::Buy) => 0.1,
        Some(FlowSide::Sell) => -0.1,
        None => 0.0,
    };
    let funding = ctx.funding.filter(|f| f.is_finite()).unwrap_or(0.0);
    let oi_bias = if ctx.oi_bias.is_finite() { ctx.oi_bias } else { 0.0 };

    (1.0 + oi_bias * 0.5 + funding * 20.0 + whale_bias).clamp(ESTIMATE_MIN, ESTIMATE_MAX)
}

pub struct LongShortMonitor {
    feed: Arc<dyn ExchangeFeed>,
    venue: Arc<dyn SecondaryVenue>,
}

impl LongShortMonitor {
    pub fn new(feed: Arc<dyn ExchangeFeed>, venue: Arc<dyn SecondaryVenue>) -> Self {
        Self { feed, venue }
    }

    async fn from_exchange(&self, symbol: &str) -> Option<f64> {
        let rows = match self.feed.taker_volume(symbol, TAKER_PERIOD, 1).await {
            Ok(rows) => rows,
            Err(e) => {
                debug!(symbol, error = %e, "taker long/short ratio unavailable");
                return None;
            }
        };
        let row = rows.last()?;
        if !row.buy_vol.is_finite() || !row.sell_vol.is_finite() || row.sell_vol == 0.0 {
            return None;
        }
        let ratio = row.buy_vol / row.sell_vol;
        (ratio.is_finite() && ratio > 0.0).then_some(ratio)
    }

    async fn from_venue(&self, symbol: &str) -> Option<f64> {
        let trades = match self.venue.trades(symbol, venue_trade_limit(symbol)).await {
            Ok(t) => t,
            Err(e) => {
                debug!(symbol, venue = self.venue.name(), error = %e, "venue trades unavailable");
                return None;
            }
        };
        let flow = TradeFlow::from_trades(&trades);
        (flow.buy_notional > 0.0 && flow.sell_notional > 0.0)
            .then(|| flow.buy_notional / flow.sell_notional)
    }

    /// Resolve the long/short ratio for `symbol`, walking the fallback chain.
    pub async fn fetch(&self, symbol: &str, ctx: &LsrContext) -> LsrState {
        if let Some(ratio) = self.from_exchange(symbol).await {
            return LsrState { source: LsrSource::Binance, ratio };
        }
        if let Some(ratio) = self.from_venue(symbol).await {
            return LsrState { source: LsrSource::Mexc, ratio };
        }

        let ratio = estimate_ratio(ctx);
        warn!(symbol, ratio, "long/short ratio estimated, no venue answered");
        LsrState { source: LsrSource::Estimate, ratio }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubExchange, StubVenue};
    use crate::types::{TakerVolume, Trade};

    fn monitor(feed: StubExchange, venue: StubVenue) -> LongShortMonitor {
        LongShortMonitor::new(Arc::new(feed), Arc::new(venue))
    }

    #[tokio::test]
    async fn exchange_ratio_first() {
        let feed = StubExchange {
            taker: Some(vec![TakerVolume { buy_vol: 150.0, sell_vol: 100.0 }]),
            ..Default::default()
        };
        let s = monitor(feed, StubVenue::default())
            .fetch("BTCUSDT", &LsrContext::default())
            .await;
        assert_eq!(s.source, LsrSource::Binance);
        assert!((s.ratio - 1.5).abs() < 1e-12);
    }

    #[tokio::test]
    async fn zero_sell_volume_falls_through_to_venue() {
        let feed = StubExchange {
            taker: Some(vec![TakerVolume { buy_vol: 150.0, sell_vol: 0.0 }]),
            ..Default::default()
        };
        let venue = StubVenue {
            trades: Some(vec![
                Trade { price: 10.0, qty: 3.0, is_buyer_maker: false },
                Trade { price: 10.0, qty: 1.0, is_buyer_maker: true },
            ]),
            ..Default::default()
        };
        let s = monitor(feed, venue).fetch("AVAXUSDT", &LsrContext::default()).await;
        assert_eq!(s.source, LsrSource::Mexc);
        assert!((s.ratio - 3.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn estimate_when_nothing_answers() {
        let ctx = LsrContext {
            funding: Some(0.01),
            oi_bias: 0.4,
            whale_side: Some(FlowSide::Buy),
        };
        let s = monitor(StubExchange::default(), StubVenue::default())
            .fetch("ETHUSDT", &ctx)
            .await;
        assert_eq!(s.source, LsrSource::Estimate);
        // 1 + 0.2 + 0.2 + 0.1
        assert!((s.ratio - 1.5).abs() < 1e-12);
    }

    #[test]
    fn estimate_is_clamped() {
        let ctx = LsrContext { funding: Some(1.0), ..Default::default() };
        assert_eq!(estimate_ratio(&ctx), ESTIMATE_MAX);
        let ctx = LsrContext { funding: Some(-1.0), ..Default::default() };
        assert_eq!(estimate_ratio(&ctx), ESTIMATE_MIN);
    }
}
