// =============================================================================
// Heat-score confidence signal
// =============================================================================
//
// confidence = 40 + heat × 60, so a neutral heat of 0.5 maps to 70 and the
// extremes to 40 and 100. Heat at or above 0.5 (short liquidations
// dominating nearby) calls LONG; targets and stops sit 1 % from entry.

use serde::{Deserialize, Serialize};

use crate::types::Direction;

const TP_SL_PCT: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceSignal {
    pub symbol: String,
    pub side: Direction,
    pub entry: f64,
    pub tp: f64,
    pub sl: f64,
    pub confidence: u32,
}

pub fn build_signal(symbol: &str, price: f64, heat: Option<f64>, min_confidence: u32) -> Option<ConfidenceSignal> {
    if !price.is_finite() {
        return None;
    }

    let heat = heat.filter(|h| h.is_finite()).unwrap_or(0.0).clamp(0.0, 1.0);
    let confidence = (40.0 + heat * 60.0).round() as u32;
    if confidence < min_confidence {
        return None;
    }

    let side = if heat >= 0.5 { Direction::Long } else { Direction::Short };
    let (tp, sl) = match side {
        Direction::Long => (price * (1.0 + TP_SL_PCT), price * (1.0 - TP_SL_PCT)),
        _ => (price * (1.0 - TP_SL_PCT), price * (1.0 + TP_SL_PCT)),
    };

    Some(ConfidenceSignal {
        symbol: symbol.to_string(),
        side,
        entry: price,
        tp,
        sl,
        confidence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_heat_goes_long() {
        let s = build_signal("BTCUSDT", 100.0, Some(0.9), 60).unwrap();
        assert_eq!(s.side, Direction::Long);
        assert_eq!(s.confidence, 94);
        assert!((s.tp - 101.0).abs() < 1e-9);
        assert!((s.sl - 99.0).abs() < 1e-9);
    }

    #[test]
    fn low_heat_short_if_confident_enough() {
        let s = build_signal("BTCUSDT", 100.0, Some(0.4), 60).unwrap();
        assert_eq!(s.side, Direction::Short);
        assert_eq!(s.confidence, 64);
        assert!((s.tp - 99.0).abs() < 1e-9);

        assert!(build_signal("BTCUSDT", 100.0, Some(0.3), 60).is_none());
    }

    #[test]
    fn missing_heat_or_price() {
        // heat defaults to 0 → confidence 40
        assert!(build_signal("X", 100.0, None, 60).is_none());
        assert!(build_signal("X", 100.0, None, 40).is_some());
        assert!(build_signal("X", f64::NAN, Some(1.0), 0).is_none());
        assert_eq!(build_signal("X", 1.0, Some(7.0), 0).unwrap().confidence, 100);
    }
}
