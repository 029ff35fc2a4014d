// =============================================================================
// Signals Module
// =============================================================================
//
// Heuristic detectors over fetched market data:
// - Whale prints and dominant taker side
// - Cross-venue arbitrage spread
// - Book stacking / one-sided tape (manipulation)
// - Pump / dump over the last minute
// - Market-maker direction vote combining the above
// - Heat-score confidence signal for the polling tick

pub mod arbitrage;
pub mod confidence;
pub mod manipulation;
pub mod mm_direction;
pub mod pump_dump;
pub mod whale;

pub use arbitrage::{detect_arbitrage, ArbitrageView};
pub use confidence::{build_signal, ConfidenceSignal};
pub use manipulation::{detect_manipulation, ManipulationView};
pub use mm_direction::{compute_mm_direction, MmDirection, MmDirectionInput};
pub use pump_dump::{detect_pump_dump, PumpDumpView};
pub use whale::{detect_whales, WhaleFlow};
