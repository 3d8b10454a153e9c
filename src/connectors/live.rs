//! Live REST venue adapter

use crate::{
    config::VenueConfig,
    connectors::{
        ConnectionStatus, Credentials, Exchange, MarketOrder, OrderSide, VenueAdapter,
    },
    data::{Instrument, Venue},
    ArbitrageError, Result,
};
use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Base asset decimals sent on the wire; both legs are truncated identically
const QUANTITY_DECIMALS: u32 = 8;

/// Wire protocol of one exchange: request shapes and response parsing
pub trait ExchangeProtocol: Send + Sync {
    /// Exchange implemented
    fn exchange(&self) -> Exchange;

    /// Production REST base URL
    fn default_base_url(&self) -> &'static str;

    /// Exchange-native symbol for an instrument
    fn market_symbol(&self, instrument: &Instrument) -> String;

    /// Public ticker request
    fn ask_request(&self, client: &reqwest::Client, base_url: &str, symbol: &str) -> reqwest::RequestBuilder;

    /// Extract the best ask from a ticker response body
    fn parse_ask(&self, body: &str) -> Result<f64>;

    /// Signed market order request
    fn order_request(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        credentials: &Credentials,
        order: &MarketOrder,
    ) -> Result<reqwest::RequestBuilder>;

    /// Extract the order id from an order response body
    fn parse_order_id(&self, body: &str) -> Result<String>;
}

/// Parse a decimal price string, rejecting non-positive values
pub(crate) fn parse_price(raw: &str, field: &str) -> Result<f64> {
    let price: f64 = raw
        .trim()
        .parse()
        .map_err(|e| ArbitrageError::DataParsing(format!("Invalid {}: {}", field, e)))?;

    if !price.is_finite() || price <= 0.0 {
        return Err(ArbitrageError::DataParsing(format!("Non-positive {}: {}", field, raw)).into());
    }

    Ok(price)
}

/// Format a base asset quantity for order submission
pub fn format_quantity(amount: f64) -> Result<String> {
    let quantity = Decimal::from_f64_retain(amount)
        .ok_or_else(|| ArbitrageError::DataParsing(format!("Unrepresentable quantity: {}", amount)))?
        .round_dp_with_strategy(QUANTITY_DECIMALS, RoundingStrategy::ToZero)
        .normalize();

    if quantity <= Decimal::ZERO {
        return Err(ArbitrageError::DataParsing(format!("Quantity rounds to zero: {}", amount)).into());
    }

    Ok(quantity.to_string())
}

/// Venue backed by an exchange REST API
pub struct LiveVenueAdapter {
    venue: Venue,
    protocol: Box<dyn ExchangeProtocol>,
    base_url: String,
    credentials: Credentials,
    client: reqwest::Client,
    status: RwLock<ConnectionStatus>,
}

impl LiveVenueAdapter {
    /// Build an adapter from venue configuration; fails without credentials
    pub fn from_config(config: &VenueConfig, request_timeout: Duration) -> Result<Self> {
        let exchange: Exchange = config.exchange.parse()?;

        let (Some(api_key), Some(secret_key)) = (config.api_key.clone(), config.secret_key.clone()) else {
            return Err(ArbitrageError::Config(format!("Venue {} has no API credentials", config.name)).into());
        };

        if exchange.requires_passphrase() && config.passphrase.is_none() {
            return Err(ArbitrageError::Config(format!(
                "Venue {} ({}) requires an API passphrase",
                config.name, exchange
            ))
            .into());
        }

        let credentials = Credentials {
            api_key,
            secret_key,
            passphrase: config.passphrase.clone(),
        };

        Self::new(
            Venue::new(config.name.as_str()),
            exchange.protocol(),
            config.rest_api_url.as_deref(),
            credentials,
            request_timeout,
        )
    }

    /// Build an adapter around an explicit protocol
    pub fn new(
        venue: Venue,
        protocol: Box<dyn ExchangeProtocol>,
        base_url: Option<&str>,
        credentials: Credentials,
        request_timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ArbitrageError::Connection(format!("Failed to create HTTP client: {}", e)))?;

        let base_url = base_url
            .unwrap_or(protocol.default_base_url())
            .trim_end_matches('/')
            .to_string();

        info!(venue = %venue, exchange = %protocol.exchange(), base_url = %base_url, "Live venue initialised");

        Ok(Self {
            venue,
            protocol,
            base_url,
            credentials,
            client,
            status: RwLock::new(ConnectionStatus::Connected),
        })
    }

    /// Exchange behind this venue
    pub fn exchange(&self) -> Exchange {
        self.protocol.exchange()
    }

    /// Current connection status
    pub async fn connection_status(&self) -> ConnectionStatus {
        *self.status.read().await
    }

    async fn ensure_open(&self) -> Result<()> {
        if *self.status.read().await == ConnectionStatus::Disconnected {
            return Err(ArbitrageError::Connection(format!("Venue {} is closed", self.venue)).into());
        }
        Ok(())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String> {
        let response = request
            .send()
            .await
            .map_err(|e| ArbitrageError::Connection(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ArbitrageError::Connection(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            return Err(ArbitrageError::Connection(format!(
                "HTTP request failed with status {}: {}",
                status, body
            ))
            .into());
        }

        Ok(body)
    }

    async fn submit_market(&self, side: OrderSide, instrument: &Instrument, amount: f64) -> Result<String> {
        let order_failed = |reason: String| ArbitrageError::OrderFailed {
            venue: self.venue.to_string(),
            side: side.to_string(),
            reason,
        };

        self.ensure_open().await.map_err(|e| order_failed(e.to_string()))?;

        let order = MarketOrder {
            symbol: self.protocol.market_symbol(instrument),
            side,
            quantity: format_quantity(amount).map_err(|e| order_failed(e.to_string()))?,
            client_order_id: Uuid::new_v4().simple().to_string(),
        };

        debug!(venue = %self.venue, ?order, "Submitting market order");

        let request = self
            .protocol
            .order_request(&self.client, &self.base_url, &self.credentials, &order)
            .map_err(|e| order_failed(e.to_string()))?;

        let body = self.send(request).await.map_err(|e| order_failed(e.to_string()))?;
        let order_id = self
            .protocol
            .parse_order_id(&body)
            .map_err(|e| order_failed(e.to_string()))?;

        Ok(order_id)
    }
}

#[async_trait]
impl VenueAdapter for LiveVenueAdapter {
    fn venue(&self) -> &Venue {
        &self.venue
    }

    async fn fetch_ask(&self, instrument: &Instrument) -> Result<f64> {
        let unavailable = |reason: String| ArbitrageError::QuoteUnavailable {
            venue: self.venue.to_string(),
            instrument: instrument.to_string(),
            reason,
        };

        self.ensure_open().await.map_err(|e| unavailable(e.to_string()))?;

        let symbol = self.protocol.market_symbol(instrument);
        let request = self.protocol.ask_request(&self.client, &self.base_url, &symbol);
        let body = self.send(request).await.map_err(|e| unavailable(e.to_string()))?;

        let ask = self.protocol.parse_ask(&body).map_err(|e| unavailable(e.to_string()))?;
        Ok(ask)
    }

    async fn submit_market_buy(&self, instrument: &Instrument, amount: f64) -> Result<String> {
        self.submit_market(OrderSide::Buy, instrument, amount).await
    }

    async fn submit_market_sell(&self, instrument: &Instrument, amount: f64) -> Result<String> {
        self.submit_market(OrderSide::Sell, instrument, amount).await
    }

    async fn close(&self) -> Result<()> {
        let mut status = self.status.write().await;
        if *status == ConnectionStatus::Disconnected {
            return Ok(());
        }

        *status = ConnectionStatus::Disconnected;
        info!(venue = %self.venue, exchange = %self.protocol.exchange(), "Disconnected from venue");
        Ok(())
    }
}

impl Drop for LiveVenueAdapter {
    fn drop(&mut self) {
        if *self.status.get_mut() != ConnectionStatus::Disconnected {
            warn!(venue = %self.venue, "Live venue dropped without close()");
        }
    }
}
