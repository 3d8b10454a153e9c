//! Venue adapter traits and common types

use crate::{data::{Instrument, Venue}, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Capability every price source / execution venue exposes to the engine.
///
/// Implementations never retry internally; timeouts are applied by the caller.
#[async_trait]
pub trait VenueAdapter: Send + Sync {
    /// Venue this adapter talks to
    fn venue(&self) -> &Venue;

    /// Current best ask for `instrument`
    async fn fetch_ask(&self, instrument: &Instrument) -> Result<f64>;

    /// Submit a market buy for `amount` units of the base asset, returning the order id
    async fn submit_market_buy(&self, instrument: &Instrument, amount: f64) -> Result<String>;

    /// Submit a market sell for `amount` units of the base asset, returning the order id
    async fn submit_market_sell(&self, instrument: &Instrument, amount: f64) -> Result<String>;

    /// Release connection resources; calling it twice is a no-op
    async fn close(&self) -> Result<()>;
}

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    /// Buy order
    Buy,
    /// Sell order
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Market order request in exchange terms
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketOrder {
    /// Exchange-native symbol
    pub symbol: String,
    /// Order side
    pub side: OrderSide,
    /// Base asset quantity, already formatted for the wire
    pub quantity: String,
    /// Client order ID
    pub client_order_id: String,
}

/// API credentials for signed endpoints
#[derive(Clone)]
pub struct Credentials {
    /// API key
    pub api_key: String,
    /// Secret key
    pub secret_key: String,
    /// API passphrase, required by some exchanges
    pub passphrase: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("secret_key", &"***")
            .field("passphrase", &self.passphrase.as_ref().map(|_| "***"))
            .finish()
    }
}
