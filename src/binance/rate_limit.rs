// =============================================================================
// Rate-Limit Tracker: monitors Binance request weight to avoid 429s
// =============================================================================
//
// Binance reports the weight consumed in the current minute through the
// `X-MBX-USED-WEIGHT-1M` response header. Spot allows 6000/min and USDⓈ-M
// futures 2400/min; we cap ourselves well below either.
//
// The tracker keeps the last reported weight together with the minute it was
// reported in. A reading from an earlier minute is stale and counts as zero,
// so a blocked tracker unblocks itself when the exchange window rolls over.
// =============================================================================

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use tracing::{debug, warn};

/// Default hard ceiling at which we refuse to send additional requests.
pub const DEFAULT_WEIGHT_HARD_LIMIT: u32 = 1000;
/// Soft warning threshold as a fraction of the hard limit.
const WARN_FRACTION: f64 = 0.8;

/// Thread-safe request-weight tracker backed by atomic counters.
pub struct RateLimitTracker {
    label: &'static str,
    hard_limit: u32,
    used_weight_1m: AtomicU32,
    /// UNIX minute of the last header reading.
    reading_minute: AtomicU64,
}

/// Immutable snapshot of the current rate-limit state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSnapshot {
    pub label: String,
    pub used_weight_1m: u32,
    pub hard_limit: u32,
}

impl RateLimitTracker {
    pub fn new(label: &'static str, hard_limit: u32) -> Self {
        Self {
            label,
            hard_limit,
            used_weight_1m: AtomicU32::new(0),
            reading_minute: AtomicU64::new(0),
        }
    }

    fn current_minute() -> u64 {
        (chrono::Utc::now().timestamp().max(0) as u64) / 60
    }

    fn warn_threshold(&self) -> u32 {
        (self.hard_limit as f64 * WARN_FRACTION) as u32
    }

    /// Update the weight counter from the response headers returned by
    /// Binance.
    pub fn update_from_headers(&self, headers: &reqwest::header::HeaderMap) {
        let Some(w) = headers
            .get("X-MBX-USED-WEIGHT-1M")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u32>().ok())
        else {
            return;
        };
        self.record_weight(w, Self::current_minute());
    }

    fn record_weight(&self, w: u32, minute: u64) {
        let prev = self.used_weight_at(minute);
        self.used_weight_1m.store(w, Ordering::Relaxed);
        self.reading_minute.store(minute, Ordering::Relaxed);

        let warn_at = self.warn_threshold();
        if w >= warn_at && prev < warn_at {
            warn!(
                venue = self.label,
                used_weight = w,
                hard_limit = self.hard_limit,
                "rate-limit weight crossed warning threshold"
            );
        }
        debug!(venue = self.label, used_weight_1m = w, "rate-limit weight updated from header");
    }

    fn used_weight_at(&self, minute: u64) -> u32 {
        if self.reading_minute.load(Ordering::Relaxed) == minute {
            self.used_weight_1m.load(Ordering::Relaxed)
        } else {
            0
        }
    }

    /// Return `true` if we can afford to spend `weight` more request weight
    /// without exceeding the hard limit.
    pub fn can_send_request(&self, weight: u32) -> bool {
        self.can_send_at(weight, Self::current_minute())
    }

    fn can_send_at(&self, weight: u32, minute: u64) -> bool {
        let current = self.used_weight_at(minute);
        let allowed = current + weight <= self.hard_limit;
        if !allowed {
            warn!(
                venue = self.label,
                current_weight = current,
                requested_weight = weight,
                hard_limit = self.hard_limit,
                "request blocked, would exceed rate-limit"
            );
        }
        allowed
    }

    pub fn snapshot(&self) -> RateLimitSnapshot {
        RateLimitSnapshot {
            label: self.label.to_string(),
            used_weight_1m: self.used_weight_at(Self::current_minute()),
            hard_limit: self.hard_limit,
        }
    }
}

impl std::fmt::Debug for RateLimitTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitTracker")
            .field("label", &self.label)
            .field("used_weight_1m", &self.used_weight_1m.load(Ordering::Relaxed))
            .field("hard_limit", &self.hard_limit)
            .finish()
    }
}
