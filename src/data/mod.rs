//! Market data model: instruments, venues, quotes and the price board

pub mod price_board;

pub use price_board::{PriceBoard, PriceSnapshot};

use crate::{ArbitrageError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tradable pair such as `BTC/USDT`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instrument(String);

impl Instrument {
    /// Create an instrument identifier
    pub fn new(symbol: impl Into<String>) -> Self {
        Self(symbol.into())
    }

    /// Full symbol as configured
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Base asset (`BTC` in `BTC/USDT`)
    pub fn base(&self) -> &str {
        self.0.split('/').next().unwrap_or(&self.0)
    }

    /// Quote asset (`USDT` in `BTC/USDT`), empty when the symbol has no separator
    pub fn quote(&self) -> &str {
        self.0.split_once('/').map(|(_, quote)| quote).unwrap_or("")
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Instrument {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

/// Exchange or price source alias such as `Exchange A`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Venue(String);

impl Venue {
    /// Create a venue identifier
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Venue alias
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Venue {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Latest observed ask price for an instrument on a venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Instrument quoted
    pub instrument: Instrument,
    /// Venue that supplied the price
    pub venue: Venue,
    /// Best ask, always strictly positive
    pub ask_price: f64,
    /// When the price was observed
    pub observed_at: DateTime<Utc>,
}

impl Quote {
    /// Build a quote, rejecting non-positive or non-finite prices
    pub fn new(
        instrument: Instrument,
        venue: Venue,
        ask_price: f64,
        observed_at: DateTime<Utc>,
    ) -> Result<Self> {
        if !ask_price.is_finite() || ask_price <= 0.0 {
            return Err(ArbitrageError::QuoteUnavailable {
                venue: venue.to_string(),
                instrument: instrument.to_string(),
                reason: format!("invalid ask price {}", ask_price),
            }
            .into());
        }

        Ok(Self {
            instrument,
            venue,
            ask_price,
            observed_at,
        })
    }

    /// Quote observed now
    pub fn observed_now(instrument: Instrument, venue: Venue, ask_price: f64) -> Result<Self> {
        Self::new(instrument, venue, ask_price, Utc::now())
    }
}
