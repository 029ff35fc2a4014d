// =============================================================================
// Open Interest Tracker: participation signal
// =============================================================================
//
// Open Interest (OI) represents the total number of outstanding derivative
// contracts.  Changes in OI indicate market participation levels:
//
//   OI rising   => new money entering the market
//   OI falling  => positions being closed / liquidated
//
// The previous reading comes from the exchange's 5m OI history so the change
// is available on the first call, without tracking state between ticks.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::feeds::ExchangeFeed;

const HISTORY_PERIOD: &str = "5m";
const HISTORY_POINTS: u32 = 2;

/// Snapshot of current and previous open interest.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OIState {
    /// Current open interest in contracts.
    pub current: Option<f64>,

    /// Open interest one history period ago.
    pub previous: Option<f64>,

    /// Relative change across the history window.
    pub change: f64,
}

/// Relative change between the first and last point of an OI history.
/// Zero when fewer than two points are available or the first is zero.
pub fn oi_change(history: &[f64]) -> f64 {
    if history.len() < 2 {
        return 0.0;
    }
    let prev = history[0];
    let last = history[history.len() - 1];
    if prev == 0.0 || !prev.is_finite() || !last.is_finite() {
        return 0.0;
    }
    (last - prev) / prev
}

pub struct OpenInterestTracker {
    feed: Arc<dyn ExchangeFeed>,
}

impl OpenInterestTracker {
    pub fn new(feed: Arc<dyn ExchangeFeed>) -> Self {
        Self { feed }
    }

    /// Fetch current OI and the short history for `symbol`. Either half may
    /// be missing.
    pub async fn fetch(&self, symbol: &str) -> OIState {
        let (current, history) = tokio::join!(
            self.feed.open_interest(symbol),
            self.feed.open_interest_history(symbol, HISTORY_PERIOD, HISTORY_POINTS),
        );

        let current = match current {
            Ok(oi) if oi.is_finite() => Some(oi),
            Ok(_) => None,
            Err(e) => {
                warn!(symbol, error = %e, "open interest unavailable");
                None
            }
        };

        let history = history.unwrap_or_else(|e| {
            warn!(symbol, error = %e, "open interest history unavailable");
            Vec::new()
        });

        let previous = (history.len() >= 2)
            .then(|| history[0])
            .filter(|v| v.is_finite());

        let state = OIState {
            current,
            previous,
            change: oi_change(&history),
        };

        debug!(symbol, current = ?state.current, change = state.change, "open interest fetched");
        state
    }

    /// Only the history-derived change, used by the combined heatmap.
    pub async fn change(&self, symbol: &str) -> Option<f64> {
        match self
            .feed
            .open_interest_history(symbol, HISTORY_PERIOD, HISTORY_POINTS)
            .await
        {
            Ok(history) => Some(oi_change(&history)),
            Err(e) => {
                warn!(symbol, error = %e, "open interest history unavailable");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubExchange;

    #[test]
    fn change_needs_two_points() {
        assert_eq!(oi_change(&[]), 0.0);
        assert_eq!(oi_change(&[100.0]), 0.0);
        assert_eq!(oi_change(&[0.0, 100.0]), 0.0);
        assert!((oi_change(&[100.0, 103.0]) - 0.03).abs() < 1e-12);
    }

    #[tokio::test]
    async fn previous_comes_from_history() {
        let feed = StubExchange {
            open_interest: Some(110.0),
            oi_history: Some(vec![100.0, 105.0]),
            ..Default::default()
        };
        let state = OpenInterestTracker::new(Arc::new(feed)).fetch("BTCUSDT").await;
        assert_eq!(state.current, Some(110.0));
        assert_eq!(state.previous, Some(100.0));
        assert!((state.change - 0.05).abs() < 1e-12);
    }

    #[tokio::test]
    async fn failures_degrade_to_empty_state() {
        let state = OpenInterestTracker::new(Arc::new(StubExchange::default()))
            .fetch("BTCUSDT")
            .await;
        assert!(state.current.is_none());
        assert!(state.previous.is_none());
        assert_eq!(state.change, 0.0);
    }
}
