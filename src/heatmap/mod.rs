pub mod combined;
pub mod levels;
pub mod plan;
pub mod resolver;

pub use combined::{CombinedHeatmap, HeatSource};
pub use levels::{fetch_timeframe, TimeframeHeatmap};
pub use plan::{build_plan, FallbackPct, TradePlan};
pub use resolver::{majority, resolve_target, Consensus, ResolveContext, TargetResolution};
