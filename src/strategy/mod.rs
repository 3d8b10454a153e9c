//! Arbitrage detection and the cycle engine

pub mod arbitrage;
pub mod economics;
pub mod scanner;

pub use arbitrage::{ArbitrageEngine, CycleReport, StrategyState, StrategyStatistics};
pub use economics::TradeEconomics;
pub use scanner::{Opportunity, SpreadScanner};
