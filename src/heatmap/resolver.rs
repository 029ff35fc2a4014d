// =============================================================================
// Market-maker target resolution across timeframes
// =============================================================================
//
// Priority order, first match wins:
//
//   1. Heatmap majority  ≥ 2 timeframes agree            conf 66 + 12×strength
//   2. Funding  |rate| ≥ 0.03 %                  conf 62
//   3. Long/short ratio  ≥ 1.15 or ≤ 0.87                 conf 60
//   4. OI bias  |bias| ≥ 0.25 (weak, inverted)   conf 57
//   5. Heatmap pool sums  1.1× dominance                   conf 56
//   6. Nothing  UNCLEAR                          conf 55
//
// Crowded positioning is the target: positive funding or a high long/short
// ratio means longs are crowded, so makers are expected to hunt LONGS.

use serde::{Deserialize, Serialize};

use super::levels::TimeframeHeatmap;
use crate::types::MmTarget;

const FUNDING_THRESHOLD: f64 = 0.0003;
const LSR_LONG_CROWDED: f64 = 1.15;
const LSR_SHORT_CROWDED: f64 = 0.87;
const OI_BIAS_THRESHOLD: f64 = 0.25;
const POOL_SUM_RATIO: f64 = 1.1;

/// Which rule produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionReason {
    HeatmapMajority,
    Funding,
    LongShortRatio,
    OiBias,
    HeatmapSum,
    None,
}

impl std::fmt::Display for ResolutionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HeatmapMajority => write!(f, "HEATMAP_MAJ"),
            Self::Funding => write!(f, "FUNDING"),
            Self::LongShortRatio => write!(f, "LSR"),
            Self::OiBias => write!(f, "OI_BIAS"),
            Self::HeatmapSum => write!(f, "HEATMAP_SUM"),
            Self::None => write!(f, "NONE"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetResolution {
    pub target: MmTarget,
    /// Confidence in percent.
    pub conf: u32,
    pub reason: ResolutionReason,
}

impl TargetResolution {
    fn new(target: MmTarget, conf: u32, reason: ResolutionReason) -> Self {
        Self { target, conf, reason }
    }
}

/// Non-heatmap context consulted when the timeframes disagree.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext {
    pub funding: Option<f64>,
    pub lsr: Option<f64>,
    pub oi_bias: Option<f64>,
}

#[derive(Default)]
struct Votes {
    longs: u32,
    shorts: u32,
    max_strength: f64,
}

fn tally(results: &[TimeframeHeatmap]) -> Votes {
    let mut votes = Votes::default();
    for r in results {
        match r.mm_target {
            MmTarget::Longs => votes.longs += 1,
            MmTarget::Shorts => votes.shorts += 1,
            MmTarget::Unclear => {}
        }
        if r.strength.is_finite() {
            votes.max_strength = votes.max_strength.max(r.strength);
        }
    }
    votes
}

fn finite(x: Option<f64>) -> Option<f64> {
    x.filter(|v| v.is_finite())
}

/// Resolve the market-maker target from per-timeframe results, falling back
/// to funding, long/short ratio and OI bias in that order.
pub fn resolve_target(results: &[TimeframeHeatmap], ctx: &ResolveContext) -> TargetResolution {
    let votes = tally(results);
    let majority_conf = 66 + (votes.max_strength * 12.0).round() as u32;

    if votes.longs >= 2 {
        return TargetResolution::new(MmTarget::Longs, majority_conf, ResolutionReason::HeatmapMajority);
    }
    if votes.shorts >= 2 {
        return TargetResolution::new(MmTarget::Shorts, majority_conf, ResolutionReason::HeatmapMajority);
    }

    if let Some(funding) = finite(ctx.funding) {
        if funding >= FUNDING_THRESHOLD {
            return TargetResolution::new(MmTarget::Longs, 62, ResolutionReason::Funding);
        }
        if funding <= -FUNDING_THRESHOLD {
            return TargetResolution::new(MmTarget::Shorts, 62, ResolutionReason::Funding);
        }
    }

    if let Some(lsr) = finite(ctx.lsr) {
        if lsr >= LSR_LONG_CROWDED {
            return TargetResolution::new(MmTarget::Longs, 60, ResolutionReason::LongShortRatio);
        }
        if lsr <= LSR_SHORT_CROWDED {
            return TargetResolution::new(MmTarget::Shorts, 60, ResolutionReason::LongShortRatio);
        }
    }

    // A falling-OI bias points at a long squeeze, so longs are the target.
    if let Some(oi_bias) = finite(ctx.oi_bias) {
        if oi_bias <= -OI_BIAS_THRESHOLD {
            return TargetResolution::new(MmTarget::Longs, 57, ResolutionReason::OiBias);
        }
        if oi_bias >= OI_BIAS_THRESHOLD {
            return TargetResolution::new(MmTarget::Shorts, 57, ResolutionReason::OiBias);
        }
    }

    let long_sum: f64 = results.iter().map(|r| r.long_pool).filter(|v| v.is_finite()).sum();
    let short_sum: f64 = results.iter().map(|r| r.short_pool).filter(|v| v.is_finite()).sum();

    if short_sum > long_sum * POOL_SUM_RATIO {
        return TargetResolution::new(MmTarget::Shorts, 56, ResolutionReason::HeatmapSum);
    }
    if long_sum > short_sum * POOL_SUM_RATIO {
        return TargetResolution::new(MmTarget::Longs, 56, ResolutionReason::HeatmapSum);
    }

    TargetResolution::new(MmTarget::Unclear, 55, ResolutionReason::None)
}

/// Plain heatmap consensus without fallbacks, used for summary reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Consensus {
    pub target: MmTarget,
    pub conf: u32,
}

pub fn majority(results: &[TimeframeHeatmap]) -> Consensus {
    let votes = tally(results);

    let mut target = MmTarget::Unclear;
    if votes.longs >= 2 {
        target = MmTarget::Longs;
    }
    if votes.shorts >= 2 {
        target = MmTarget::Shorts;
    }

    let top = votes.longs.max(votes.shorts);
    let bonus = (votes.max_strength * 10.0).round() as u32;
    let conf = match top {
        n if n >= 3 => 82 + bonus,
        2 => 66 + bonus,
        _ => 55,
    };

    Consensus { target, conf }
}
