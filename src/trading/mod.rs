//! Trade execution and the portfolio ledger

pub mod executor;
pub mod portfolio;

pub use executor::{LegIntent, LegOutcome, TradeAttempt, TradeExecutor, TradeOutcome, TradeRecord};
pub use portfolio::{Portfolio, PortfolioSnapshot};
