// =============================================================================
// Funding Rate Monitor: crowding read from perpetual futures funding
// =============================================================================
//
// Funding rates are periodic payments between longs and shorts that anchor the
// perpetual contract price to spot.
//
//   rate > +0.05%  =>  LONG_CROWDED   (longs paying heavily)
//   rate < -0.05%  =>  SHORT_CROWDED  (shorts paying heavily)
//   otherwise      =>  NORMAL

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::feeds::ExchangeFeed;

const CROWDED_RATE: f64 = 0.0005;
const FUNDING_HISTORY_LIMIT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FundingCrowding {
    LongCrowded,
    ShortCrowded,
    Normal,
}

impl std::fmt::Display for FundingCrowding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LongCrowded => write!(f, "LONG_CROWDED"),
            Self::ShortCrowded => write!(f, "SHORT_CROWDED"),
            Self::Normal => write!(f, "NORMAL"),
        }
    }
}

/// Snapshot of the latest funding rate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FundingState {
    /// Raw funding rate as a decimal (e.g. 0.0001 = 0.01%).
    pub rate: f64,

    /// Funding rate as a percentage (e.g. 0.01).
    pub rate_pct: f64,

    pub crowding: FundingCrowding,

    /// Timestamp (ms) of the funding event.
    pub funding_time: i64,
}

impl FundingState {
    pub fn from_rate(rate: f64, funding_time: i64) -> Self {
        let crowding = if rate > CROWDED_RATE {
            FundingCrowding::LongCrowded
        } else if rate < -CROWDED_RATE {
            FundingCrowding::ShortCrowded
        } else {
            FundingCrowding::Normal
        };

        Self {
            rate,
            rate_pct: rate * 100.0,
            crowding,
            funding_time,
        }
    }
}

/// Reads the latest funding record through the exchange feed.
pub struct FundingRateMonitor {
    feed: Arc<dyn ExchangeFeed>,
}

impl FundingRateMonitor {
    pub fn new(feed: Arc<dyn ExchangeFeed>) -> Self {
        Self { feed }
    }

    /// Latest funding state for `symbol`, or `None` when the history is
    /// empty, the request failed or the rate is not finite.
    pub async fn fetch(&self, symbol: &str) -> Option<FundingState> {
        let history = match self.feed.funding_rates(symbol, FUNDING_HISTORY_LIMIT).await {
            Ok(h) => h,
            Err(e) => {
                warn!(symbol, error = %e, "funding rate unavailable");
                return None;
            }
        };

        let last = history.last()?;
        if !last.rate.is_finite() {
            return None;
        }

        let state = FundingState::from_rate(last.rate, last.funding_time);
        debug!(
            symbol,
            rate_pct = format!("{:.4}", state.rate_pct),
            crowding = %state.crowding,
            "funding rate fetched"
        );
        Some(state)
    }
}
