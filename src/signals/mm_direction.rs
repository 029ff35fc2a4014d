// =============================================================================
// Market-maker direction: weighted vote aggregation
// =============================================================================
//
// Each detector casts a fixed-weight vote for the long or the short side:
//
//   OI/funding bias  > ±0.05   0.5
//   whale flow       BUY/SELL  0.4
//   pump / dump      label     0.3
//   arbitrage        UP/DOWN   0.1
//
// High manipulation (> 0.7) damps both sides by 0.7 before the arbitrage
// vote. A side wins when it beats the other by 20 % and exceeds 0.4.

use serde::{Deserialize, Serialize};

use crate::types::{ArbSide, Direction, FlowSide, PumpDumpLabel};

const OI_BIAS_THRESHOLD: f64 = 0.05;
const STRONG_CLUSTER: f64 = 0.7;
const HIGH_MANIPULATION: f64 = 0.7;
const MANIPULATION_DAMPING: f64 = 0.7;
const WIN_RATIO: f64 = 1.2;
const MIN_WINNING_SCORE: f64 = 0.4;

/// Inputs to the vote, one per detector.
#[derive(Debug, Clone, Copy, Default)]
pub struct MmDirectionInput {
    pub liq_score: Option<f64>,
    pub oi_bias: f64,
    pub whale_side: Option<FlowSide>,
    pub pump_dump: Option<PumpDumpLabel>,
    pub manip_score: f64,
    pub arb_side: Option<ArbSide>,
}

/// How one vote moved the long and short scores.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteContribution {
    pub name: String,
    pub long: f64,
    pub short: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MmDirection {
    pub direction: Direction,
    pub score_long: f64,
    pub score_short: f64,
    pub total_score: f64,
    pub notes: Vec<String>,
    pub contributions: Vec<VoteContribution>,
}

#[derive(Default)]
struct Tally {
    long: f64,
    short: f64,
    notes: Vec<String>,
    contributions: Vec<VoteContribution>,
}

impl Tally {
    fn vote(&mut self, name: &str, long: f64, short: f64, note: &str) {
        self.long += long;
        self.short += short;
        self.notes.push(note.to_string());
        self.contributions.push(VoteContribution {
            name: name.to_string(),
            long,
            short,
        });
    }
}

pub fn compute_mm_direction(input: &MmDirectionInput) -> MmDirection {
    let mut t = Tally::default();

    if input.liq_score.is_some_and(|s| s > STRONG_CLUSTER) {
        t.notes.push("Strong liquidity cluster active".into());
    }

    if input.oi_bias > OI_BIAS_THRESHOLD {
        t.vote("oi_bias", 0.5, 0.0, "OI/funding bias supports LONG");
    } else if input.oi_bias < -OI_BIAS_THRESHOLD {
        t.vote("oi_bias", 0.0, 0.5, "OI/funding bias supports SHORT");
    }

    match input.whale_side {
        Some(FlowSide::Buy) => t.vote("whales", 0.4, 0.0, "Whale flow on the buy side"),
        Some(FlowSide::Sell) => t.vote("whales", 0.0, 0.4, "Whale flow on the sell side"),
        None => {}
    }

    match input.pump_dump {
        Some(PumpDumpLabel::Pump) => t.vote("pump_dump", 0.3, 0.0, "Pump detected"),
        Some(PumpDumpLabel::Dump) => t.vote("pump_dump", 0.0, 0.3, "Dump detected"),
        None => {}
    }

    if input.manip_score > HIGH_MANIPULATION {
        let dl = t.long * MANIPULATION_DAMPING - t.long;
        let ds = t.short * MANIPULATION_DAMPING - t.short;
        t.vote(
            "manipulation",
            dl,
            ds,
            "High manipulation risk, leaning neutral",
        );
    }

    match input.arb_side {
        Some(ArbSide::Up) => t.vote("arbitrage", 0.1, 0.0, "Arb: venue price higher (upward pressure)"),
        Some(ArbSide::Down) => t.vote("arbitrage", 0.0, 0.1, "Arb: venue price lower (downward pressure)"),
        None => {}
    }

    let direction = if t.long > t.short * WIN_RATIO && t.long > MIN_WINNING_SCORE {
        Direction::Long
    } else if t.short > t.long * WIN_RATIO && t.short > MIN_WINNING_SCORE {
        Direction::Short
    } else {
        Direction::Avoid
    };

    MmDirection {
        direction,
        score_long: t.long,
        score_short: t.short,
        total_score: t.long.max(t.short),
        notes: t.notes,
        contributions: t.contributions,
    }
}
