//! Binance spot REST protocol

use crate::{
    connectors::{
        live::{parse_price, ExchangeProtocol},
        signing, Credentials, Exchange, MarketOrder,
    },
    data::Instrument,
    ArbitrageError, Result,
};
use serde::Deserialize;

const RECV_WINDOW_MS: u64 = 5000;

/// Binance spot protocol
#[derive(Debug, Default, Clone, Copy)]
pub struct BinanceProtocol;

impl BinanceProtocol {
    /// Signed query string for a market order at `timestamp_ms`
    pub fn signed_order_query(order: &MarketOrder, secret: &str, timestamp_ms: i64) -> Result<String> {
        let query = format!(
            "symbol={}&side={}&type=MARKET&quantity={}&newClientOrderId={}&recvWindow={}&timestamp={}",
            order.symbol, order.side, order.quantity, order.client_order_id, RECV_WINDOW_MS, timestamp_ms
        );
        let signature = signing::hmac_sha256_hex(secret, &query)?;
        Ok(format!("{}&signature={}", query, signature))
    }
}

impl ExchangeProtocol for BinanceProtocol {
    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    fn default_base_url(&self) -> &'static str {
        "https://api.binance.com"
    }

    fn market_symbol(&self, instrument: &Instrument) -> String {
        format!("{}{}", instrument.base(), instrument.quote()).to_uppercase()
    }

    fn ask_request(&self, client: &reqwest::Client, base_url: &str, symbol: &str) -> reqwest::RequestBuilder {
        client
            .get(format!("{}/api/v3/ticker/bookTicker", base_url))
            .query(&[("symbol", symbol)])
    }

    fn parse_ask(&self, body: &str) -> Result<f64> {
        let ticker: BinanceBookTicker = serde_json::from_str(body)
            .map_err(|e| ArbitrageError::DataParsing(format!("Failed to parse book ticker: {}", e)))?;
        parse_price(&ticker.ask_price, "askPrice")
    }

    fn order_request(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        credentials: &Credentials,
        order: &MarketOrder,
    ) -> Result<reqwest::RequestBuilder> {
        let query = Self::signed_order_query(order, &credentials.secret_key, chrono::Utc::now().timestamp_millis())?;

        Ok(client
            .post(format!("{}/api/v3/order?{}", base_url, query))
            .header("X-MBX-APIKEY", &credentials.api_key))
    }

    fn parse_order_id(&self, body: &str) -> Result<String> {
        let response: BinanceOrderResponse = serde_json::from_str(body)
            .map_err(|e| ArbitrageError::DataParsing(format!("Failed to parse order response: {}", e)))?;
        Ok(response.order_id.to_string())
    }
}

// Binance API response types
#[derive(Debug, Deserialize)]
struct BinanceBookTicker {
    #[serde(rename = "askPrice")]
    ask_price: String,
}

#[derive(Debug, Deserialize)]
struct BinanceOrderResponse {
    #[serde(rename = "orderId")]
    order_id: u64,
}
