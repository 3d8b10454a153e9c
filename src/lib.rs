//! Multi-Venue Spot Arbitrage
//!
//! Polls ask prices for a fixed set of instruments across several venues, detects
//! pairwise spreads that stay profitable after fees and captures them with a pair of
//! simultaneous market orders. A synthetic price generator stands in for the venues
//! when no live connectivity is configured.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod connectors;
pub mod data;
pub mod reporting;
pub mod strategy;
pub mod trading;
pub mod utils;

// Re-export commonly used types
pub use config::ArbitrageConfig;
pub use connectors::{Mode, VenueAdapter, VenueSet};
pub use data::{Instrument, PriceBoard, PriceSnapshot, Quote, Venue};
pub use reporting::{ReportEvent, ReportSink};
pub use strategy::{ArbitrageEngine, Opportunity, SpreadScanner};
pub use trading::{Portfolio, PortfolioSnapshot, TradeExecutor, TradeOutcome};

/// Result type used throughout the application
pub type Result<T> = anyhow::Result<T>;

/// Common error types for the arbitrage system
#[derive(thiserror::Error, Debug)]
pub enum ArbitrageError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Data parsing error
    #[error("Data parsing error: {0}")]
    DataParsing(String),

    /// A single ask fetch failed; the previous board entry stays in place
    #[error("Quote unavailable for {instrument} on {venue}: {reason}")]
    QuoteUnavailable {
        /// Venue that was polled
        venue: String,
        /// Instrument that was requested
        instrument: String,
        /// Underlying cause
        reason: String,
    },

    /// One leg of a paired execution did not fill
    #[error("{side} order failed on {venue}: {reason}")]
    OrderFailed {
        /// Venue the leg was sent to
        venue: String,
        /// Leg side
        side: String,
        /// Underlying cause
        reason: String,
    },

    /// Unanticipated failure of a whole polling cycle
    #[error("Cycle failure: {0}")]
    CycleFailure(String),

    /// Timeout error
    #[error("Timeout error: {0}")]
    Timeout(String),
}

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
