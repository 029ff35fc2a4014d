// =============================================================================
// Pump / dump heuristic over the last two 1m candles
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::types::PumpDumpLabel;

const MOVE_PCT: f64 = 0.3;
const VOLUME_SPIKE: f64 = 2.0;
const SPIKE_MULTIPLIER: f64 = 1.2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PumpDumpView {
    pub pump_score: f64,
    pub dump_score: f64,
    pub label: Option<PumpDumpLabel>,
    pub notes: Vec<String>,
}

pub fn detect_pump_dump(change_pct: f64, vol_spike: f64) -> PumpDumpView {
    let mut view = PumpDumpView::default();
    let change_pct = if change_pct.is_finite() { change_pct } else { 0.0 };

    if change_pct > MOVE_PCT {
        view.pump_score += change_pct / MOVE_PCT;
        view.notes.push("Strong short-term move up".into());
    }
    if change_pct < -MOVE_PCT {
        view.dump_score += change_pct.abs() / MOVE_PCT;
        view.notes.push("Strong short-term move down".into());
    }

    if vol_spike.is_finite() && vol_spike > VOLUME_SPIKE {
        view.pump_score *= SPIKE_MULTIPLIER;
        view.dump_score *= SPIKE_MULTIPLIER;
        view.notes.push(format!("Volume spike: {vol_spike:.2}x"));
    }

    if view.pump_score > 1.0 && view.pump_score >= view.dump_score {
        view.label = Some(PumpDumpLabel::Pump);
    }
    if view.dump_score > 1.0 && view.dump_score > view.pump_score {
        view.label = Some(PumpDumpLabel::Dump);
    }

    view
}
