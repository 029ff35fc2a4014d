// =============================================================================
// Futures Intelligence Module
// =============================================================================
//
// Derivatives positioning for a single symbol, read from the primary
// exchange's USDⓈ-M futures endpoints:
//
//   1. Funding Rate  who pays whom; extreme funding means crowding
//   2. Open Interest  participation; OI vs price separates trend from squeeze
//   3. Long/Short Ratio  taker flow ratio, with venue and estimate fallbacks
//
// Each monitor is best effort. A failed fetch degrades to `None` (or the
// estimate, for long/short) and never fails the analysis that asked for it.

pub mod funding_rate;
pub mod long_short_ratio;
pub mod oi_funding;
pub mod open_interest;

pub use funding_rate::{FundingRateMonitor, FundingState};
pub use long_short_ratio::{LongShortMonitor, LsrContext, LsrState};
pub use oi_funding::{interpret_oi_funding, OiFundingView};
pub use open_interest::{OIState, OpenInterestTracker};
