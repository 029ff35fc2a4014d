// =============================================================================
// Alert records and cooldown memory
// =============================================================================
//
// Every alert pushed by the tick is recorded for the admin API. Per symbol we
// also remember the last alerted side so the same call is not repeated
// within the cooldown window.
// =============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::signals::ConfidenceSignal;
use crate::types::Direction;

/// Auditable record of one delivered alert.
#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
    /// Unique identifier for this alert (UUID v4).
    pub id: String,

    pub symbol: String,

    pub side: Direction,

    pub confidence: u32,

    pub entry: f64,
    pub tp: f64,
    pub sl: f64,

    /// Short share of nearby liquidations that produced the signal.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heat: Option<f64>,

    /// Market-maker direction of the full analysis, when it succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mm_direction: Option<Direction>,

    /// ISO 8601 timestamp of when the alert was sent.
    pub created_at: String,
}

impl AlertRecord {
    pub fn from_signal(signal: &ConfidenceSignal, heat: Option<f64>, mm_direction: Option<Direction>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            symbol: signal.symbol.clone(),
            side: signal.side,
            confidence: signal.confidence,
            entry: signal.entry,
            tp: signal.tp,
            sl: signal.sl,
            heat,
            mm_direction,
            created_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Last alert sent for a symbol.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AlertMemory {
    pub side: Direction,
    pub at: DateTime<Utc>,
}

impl AlertMemory {
    /// True when an alert on `side` at `now` repeats this one inside the
    /// cooldown window. A cooldown too large for `Duration` never expires.
    pub fn suppresses(&self, side: Direction, now: DateTime<Utc>, cooldown_secs: u64) -> bool {
        if self.side != side {
            return false;
        }
        match i64::try_from(cooldown_secs).ok().and_then(Duration::try_seconds) {
            Some(cooldown) => now - self.at < cooldown,
            None => true,
        }
    }
}

/// Memory key for a symbol's alert state.
pub fn alert_key(symbol: &str) -> String {
    format!("state:{symbol}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_side_inside_window_is_suppressed() {
        let t0 = Utc::now();
        let mem = AlertMemory { side: Direction::Long, at: t0 };
        assert!(mem.suppresses(Direction::Long, t0 + Duration::seconds(60), 900));
        assert!(!mem.suppresses(Direction::Long, t0 + Duration::seconds(900), 900));
        assert!(!mem.suppresses(Direction::Short, t0 + Duration::seconds(60), 900));
    }

    #[test]
    fn oversized_cooldown_never_expires() {
        let t0 = Utc::now();
        let mem = AlertMemory { side: Direction::Short, at: t0 };
        let later = t0 + Duration::days(365);
        assert!(mem.suppresses(Direction::Short, later, u64::MAX));
        assert!(mem.suppresses(Direction::Short, later, 10_000_000_000_000_000));
        assert!(!mem.suppresses(Direction::Long, later, u64::MAX));
    }

    #[test]
    fn record_copies_signal() {
        let signal = ConfidenceSignal {
            symbol: "BTCUSDT".into(),
            side: Direction::Short,
            entry: 100.0,
            tp: 99.0,
            sl: 101.0,
            confidence: 64,
        };
        let rec = AlertRecord::from_signal(&signal, Some(0.4), None);
        assert_eq!(rec.symbol, "BTCUSDT");
        assert_eq!(rec.confidence, 64);
        assert_eq!(alert_key("BTCUSDT"), "state:BTCUSDT");
        assert!(uuid::Uuid::parse_str(&rec.id).is_ok());
    }
}
