// =============================================================================
// Stub collaborators shared by unit tests
// =============================================================================

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;

use crate::analysis::{Analyzer, SymbolAnalysis};
use crate::app_state::{ApiSecrets, AppState};
use crate::feeds::{ExchangeFeed, HeatmapProvider, SecondaryVenue};
use crate::futures_intel::long_short_ratio::LsrSource;
use crate::futures_intel::{FundingState, LsrState, OIState, OiFundingView};
use crate::market_data::{DepthConfirmation, LiquidityMap};
use crate::runtime_config::RuntimeConfig;
use crate::signals::{
    compute_mm_direction, ArbitrageView, ManipulationView, MmDirectionInput, PumpDumpView,
    WhaleFlow,
};
use crate::telegram::Notifier;
use crate::types::{
    DepthSnapshot, ForceOrder, FundingRecord, HeatmapLevel, Kline, TakerVolume, Trade,
};

pub fn kline(close: f64, volume: f64) -> Kline {
    Kline {
        open_time: 0,
        open: close,
        high: close,
        low: close,
        close,
        volume,
        close_time: 59_999,
    }
}

fn or_fail<T: Clone>(v: &Option<T>, what: &str) -> Result<T> {
    match v {
        Some(v) => Ok(v.clone()),
        None => bail!("stub: no {what}"),
    }
}

/// Exchange feed answering from fixed data. `None` fields fail.
#[derive(Default, Clone)]
pub struct StubExchange {
    pub klines: Option<Vec<Kline>>,
    pub spot_price: Option<f64>,
    pub futures_price: Option<f64>,
    pub spot_depth: Option<DepthSnapshot>,
    pub futures_depth: Option<DepthSnapshot>,
    pub trades: Option<Vec<Trade>>,
    pub funding: Option<Vec<FundingRecord>>,
    pub open_interest: Option<f64>,
    pub oi_history: Option<Vec<f64>>,
    pub taker: Option<Vec<TakerVolume>>,
    pub force_orders: Option<Vec<ForceOrder>>,
}

#[async_trait]
impl ExchangeFeed for StubExchange {
    async fn spot_klines(&self, _symbol: &str, _interval: &str, _limit: u32) -> Result<Vec<Kline>> {
        or_fail(&self.klines, "klines")
    }

    async fn spot_price(&self, _symbol: &str) -> Result<f64> {
        or_fail(&self.spot_price, "spot price")
    }

    async fn futures_price(&self, _symbol: &str) -> Result<f64> {
        or_fail(&self.futures_price, "futures price")
    }

    async fn spot_depth(&self, _symbol: &str, _limit: u32) -> Result<DepthSnapshot> {
        or_fail(&self.spot_depth, "spot depth")
    }

    async fn futures_depth(&self, _symbol: &str, _limit: u32) -> Result<DepthSnapshot> {
        or_fail(&self.futures_depth, "futures depth")
    }

    async fn spot_trades(&self, _symbol: &str, _limit: u32) -> Result<Vec<Trade>> {
        or_fail(&self.trades, "trades")
    }

    async fn funding_rates(&self, _symbol: &str, _limit: u32) -> Result<Vec<FundingRecord>> {
        or_fail(&self.funding, "funding")
    }

    async fn open_interest(&self, _symbol: &str) -> Result<f64> {
        or_fail(&self.open_interest, "open interest")
    }

    async fn open_interest_history(&self, _symbol: &str, _period: &str, _limit: u32) -> Result<Vec<f64>> {
        or_fail(&self.oi_history, "oi history")
    }

    async fn taker_volume(&self, _symbol: &str, _period: &str, _limit: u32) -> Result<Vec<TakerVolume>> {
        or_fail(&self.taker, "taker volume")
    }

    async fn force_orders(&self, _symbol: &str, _start_ms: i64, _end_ms: i64) -> Result<Vec<ForceOrder>> {
        or_fail(&self.force_orders, "force orders")
    }
}

#[derive(Default, Clone)]
pub struct StubVenue {
    pub trades: Option<Vec<Trade>>,
    pub price: Option<f64>,
    pub depth: Option<DepthSnapshot>,
}

#[async_trait]
impl SecondaryVenue for StubVenue {
    fn name(&self) -> &str {
        "MEXC"
    }

    async fn price(&self, _symbol: &str) -> Result<f64> {
        or_fail(&self.price, "venue price")
    }

    async fn trades(&self, _symbol: &str, _limit: u32) -> Result<Vec<Trade>> {
        or_fail(&self.trades, "venue trades")
    }

    async fn depth(&self, _symbol: &str, _limit: u32) -> Result<DepthSnapshot> {
        or_fail(&self.depth, "venue depth")
    }
}

/// Heatmap provider stub. `default()` is unconfigured.
#[derive(Default)]
pub struct StubHeatmap {
    configured: bool,
    failing: Vec<String>,
    timeframe_levels: Vec<HeatmapLevel>,
    liquidation_levels: Vec<HeatmapLevel>,
    requested: Mutex<Vec<String>>,
}

impl StubHeatmap {
    pub fn configured() -> Self {
        Self {
            configured: true,
            ..Default::default()
        }
    }

    pub fn failing_symbol(mut self, symbol: &str) -> Self {
        self.failing.push(symbol.to_string());
        self
    }

    pub fn with_timeframe_levels(mut self, levels: Vec<HeatmapLevel>) -> Self {
        self.timeframe_levels = levels;
        self
    }

    pub fn with_liquidation_levels(mut self, levels: Vec<HeatmapLevel>) -> Self {
        self.liquidation_levels = levels;
        self
    }

    /// Symbols passed to `timeframe_map`, in call order.
    pub fn requested_symbols(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl HeatmapProvider for StubHeatmap {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn liquidation_map(&self, base: &str) -> Result<Vec<HeatmapLevel>> {
        if self.failing.iter().any(|s| s == base) {
            bail!("stub: liquidation map failed for {base}");
        }
        Ok(self.liquidation_levels.clone())
    }

    async fn timeframe_map(&self, symbol: &str, _interval: &str) -> Result<Vec<HeatmapLevel>> {
        self.requested.lock().push(symbol.to_string());
        if self.failing.iter().any(|s| s == symbol) {
            bail!("stub: timeframe map failed for {symbol}");
        }
        Ok(self.timeframe_levels.clone())
    }
}

/// Notifier that keeps every message instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    pub fail: bool,
    sent: Mutex<Vec<(String, Option<String>)>>,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// `(text, chat_id)` pairs in send order.
    pub fn sent(&self) -> Vec<(String, Option<String>)> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str, chat_id: Option<&str>) -> Result<()> {
        self.sent
            .lock()
            .push((text.to_string(), chat_id.map(str::to_string)));
        if self.fail {
            bail!("stub: notifier down");
        }
        Ok(())
    }
}

/// A plausible analysis without touching any collaborator.
pub fn sample_analysis(symbol: &str, price: f64) -> SymbolAnalysis {
    SymbolAnalysis {
        symbol: symbol.to_string(),
        price,
        change_pct: 0.0,
        vol_spike: 1.0,
        funding: Some(FundingState::from_rate(0.0001, 0)),
        oi: OIState {
            current: Some(1_000_000.0),
            previous: Some(990_000.0),
            change: 0.0101,
        },
        liquidity: LiquidityMap::default(),
        whales: WhaleFlow::default(),
        arbitrage: ArbitrageView::default(),
        manipulation: ManipulationView::default(),
        book: None,
        depth_confirmation: DepthConfirmation::unavailable("stub"),
        pump_dump: PumpDumpView::default(),
        oi_funding: OiFundingView::default(),
        lsr: LsrState {
            source: LsrSource::Estimate,
            ratio: 1.0,
        },
        mm: compute_mm_direction(&MmDirectionInput::default()),
        analyzed_at: Utc::now(),
    }
}

/// App state over the given collaborators, with a recording notifier.
pub fn state_with(
    config: RuntimeConfig,
    feed: StubExchange,
    venue: StubVenue,
    heatmap: StubHeatmap,
    notifier: Arc<RecordingNotifier>,
) -> Arc<AppState> {
    let analyzer = Analyzer::new(Arc::new(feed), Arc::new(venue), Arc::new(heatmap));
    let path = std::env::temp_dir().join(format!("liqbot_test_{}.json", uuid::Uuid::new_v4()));
    Arc::new(AppState::new(
        config,
        path,
        ApiSecrets {
            admin_token: Some("test-token".to_string()),
            webhook_secret: None,
        },
        analyzer,
        notifier,
    ))
}

/// App state where every data source fails.
pub fn test_state(config: RuntimeConfig) -> (Arc<AppState>, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let state = state_with(
        config,
        StubExchange::default(),
        StubVenue::default(),
        StubHeatmap::default(),
        notifier.clone(),
    );
    (state, notifier)
}
