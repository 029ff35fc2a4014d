// =============================================================================
// Shared types used across the liqbot signal engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// One OHLCV candle from the spot klines endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

/// A single public trade.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Trade {
    pub price: f64,
    pub qty: f64,
    /// Buyer was the maker, i.e. the taker sold.
    pub is_buyer_maker: bool,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.price * self.qty
    }
}

/// One price level of an order book.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub qty: f64,
}

/// Order book snapshot, best levels first on both sides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DepthSnapshot {
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

/// One entry of the perpetual funding history.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FundingRecord {
    pub rate: f64,
    pub funding_time: i64,
}

/// Taker buy/sell volume for one aggregation period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TakerVolume {
    pub buy_vol: f64,
    pub sell_vol: f64,
}

/// A forced liquidation order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ForceOrder {
    pub price: f64,
    pub qty: f64,
    pub side: LiqSide,
}

impl ForceOrder {
    pub fn notional(&self) -> f64 {
        self.price * self.qty
    }
}

/// Side tag carried by a heatmap level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LevelSide {
    Long,
    Short,
    /// Any other non-empty tag. Matches neither side.
    Other(String),
}

impl LevelSide {
    /// Parse a provider side/type tag. Empty tags yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let tag = raw.trim().to_lowercase();
        match tag.as_str() {
            "" => None,
            "long" => Some(Self::Long),
            "short" => Some(Self::Short),
            _ => Some(Self::Other(tag)),
        }
    }
}

/// One liquidation level from a heatmap source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapLevel {
    pub price: f64,
    pub value: f64,
    pub side: Option<LevelSide>,
}

/// Which side of the market gets liquidated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiqSide {
    Long,
    Short,
}

impl std::fmt::Display for LiqSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "long"),
            Self::Short => write!(f, "short"),
        }
    }
}

/// Directional call for a trade plan or alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    Avoid,
}

impl Default for Direction {
    fn default() -> Self {
        Self::Avoid
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Long => write!(f, "LONG"),
            Self::Short => write!(f, "SHORT"),
            Self::Avoid => write!(f, "AVOID"),
        }
    }
}

/// Which crowd the market makers are expected to hunt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MmTarget {
    Longs,
    Shorts,
    Unclear,
}

impl std::fmt::Display for MmTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Longs => write!(f, "LONGS"),
            Self::Shorts => write!(f, "SHORTS"),
            Self::Unclear => write!(f, "UNCLEAR"),
        }
    }
}

/// Dominant taker flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowSide {
    Buy,
    Sell,
}

impl std::fmt::Display for FlowSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Which way a cross-venue spread leans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArbSide {
    Up,
    Down,
}

impl std::fmt::Display for ArbSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PumpDumpLabel {
    Pump,
    Dump,
}

impl std::fmt::Display for PumpDumpLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pump => write!(f, "PUMP"),
            Self::Dump => write!(f, "DUMP"),
        }
    }
}

/// Parse a JSON value that may be a number or a numeric string. Returns
/// `None` for anything non-finite.
pub fn json_f64(val: &serde_json::Value) -> Option<f64> {
    let n = match val {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
