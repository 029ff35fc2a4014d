// =============================================================================
// Market data collaborators
// =============================================================================
//
// The heuristics never talk HTTP directly. They consume plain data through
// these traits so that every venue can be swapped or stubbed:
//
//   ExchangeFeed  primary exchange, spot + USDⓈ-M futures (Binance)
//   SecondaryVenue  cross-check venue for price, flow and depth (MEXC)
//   HeatmapProvider  paid liquidation heatmap (Coinglass)

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{
    DepthSnapshot, ForceOrder, FundingRecord, HeatmapLevel, Kline, TakerVolume, Trade,
};

#[async_trait]
pub trait ExchangeFeed: Send + Sync {
    async fn spot_klines(&self, symbol: &str, interval: &str, limit: u32) -> Result<Vec<Kline>>;

    async fn spot_price(&self, symbol: &str) -> Result<f64>;

    /// Last traded price of the perpetual contract.
    async fn futures_price(&self, symbol: &str) -> Result<f64>;

    async fn spot_depth(&self, symbol: &str, limit: u32) -> Result<DepthSnapshot>;

    async fn futures_depth(&self, symbol: &str, limit: u32) -> Result<DepthSnapshot>;

    async fn spot_trades(&self, symbol: &str, limit: u32) -> Result<Vec<Trade>>;

    /// Funding history, oldest first.
    async fn funding_rates(&self, symbol: &str, limit: u32) -> Result<Vec<FundingRecord>>;

    async fn open_interest(&self, symbol: &str) -> Result<f64>;

    /// Aggregated open interest, oldest first.
    async fn open_interest_history(&self, symbol: &str, period: &str, limit: u32)
        -> Result<Vec<f64>>;

    /// Taker buy/sell volume, oldest first.
    async fn taker_volume(&self, symbol: &str, period: &str, limit: u32)
        -> Result<Vec<TakerVolume>>;

    async fn force_orders(&self, symbol: &str, start_ms: i64, end_ms: i64)
        -> Result<Vec<ForceOrder>>;
}

#[async_trait]
pub trait SecondaryVenue: Send + Sync {
    fn name(&self) -> &str;

    async fn price(&self, symbol: &str) -> Result<f64>;

    async fn trades(&self, symbol: &str, limit: u32) -> Result<Vec<Trade>>;

    async fn depth(&self, symbol: &str, limit: u32) -> Result<DepthSnapshot>;
}

#[async_trait]
pub trait HeatmapProvider: Send + Sync {
    /// False when no API key is available; callers then skip the provider.
    fn is_configured(&self) -> bool;

    /// Aggregate liquidation map for a base asset (e.g. "BTC").
    async fn liquidation_map(&self, base: &str) -> Result<Vec<HeatmapLevel>>;

    /// Liquidation map for one symbol and interval ("1h", "12h", "1d").
    /// An `Err` means the request itself failed.
    async fn timeframe_map(&self, symbol: &str, interval: &str) -> Result<Vec<HeatmapLevel>>;
}
