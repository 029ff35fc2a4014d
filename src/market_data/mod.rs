pub mod liquidity;
pub mod orderbook;
pub mod trade_flow;

pub use liquidity::LiquidityMap;
pub use orderbook::{DepthConfirmation, OrderBookState};
pub use trade_flow::TradeFlow;
