//! Kraken spot REST protocol

use crate::{
    connectors::{
        live::{parse_price, ExchangeProtocol},
        signing, Credentials, Exchange, MarketOrder, OrderSide,
    },
    data::Instrument,
    ArbitrageError, Result,
};
use serde::Deserialize;
use std::collections::HashMap;

const ADD_ORDER_PATH: &str = "/0/private/AddOrder";

/// Kraken spot protocol
#[derive(Debug, Default, Clone, Copy)]
pub struct KrakenProtocol;

impl KrakenProtocol {
    /// Kraken names bitcoin `XBT`
    fn asset_code(asset: &str) -> String {
        match asset.to_uppercase().as_str() {
            "BTC" => "XBT".to_string(),
            other => other.to_string(),
        }
    }

    /// Form-encoded AddOrder body at `nonce`
    pub fn order_body(order: &MarketOrder, nonce: i64) -> String {
        let side = match order.side {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        };
        format!(
            "nonce={}&ordertype=market&type={}&volume={}&pair={}&cl_ord_id={}",
            nonce, side, order.quantity, order.symbol, order.client_order_id
        )
    }

    fn check_errors(errors: &[String]) -> Result<()> {
        if !errors.is_empty() {
            return Err(ArbitrageError::DataParsing(format!("Kraken error: {}", errors.join(", "))).into());
        }
        Ok(())
    }
}

impl ExchangeProtocol for KrakenProtocol {
    fn exchange(&self) -> Exchange {
        Exchange::Kraken
    }

    fn default_base_url(&self) -> &'static str {
        "https://api.kraken.com"
    }

    fn market_symbol(&self, instrument: &Instrument) -> String {
        format!("{}{}", Self::asset_code(instrument.base()), Self::asset_code(instrument.quote()))
    }

    fn ask_request(&self, client: &reqwest::Client, base_url: &str, symbol: &str) -> reqwest::RequestBuilder {
        client
            .get(format!("{}/0/public/Ticker", base_url))
            .query(&[("pair", symbol)])
    }

    fn parse_ask(&self, body: &str) -> Result<f64> {
        let response: KrakenResponse<HashMap<String, KrakenTicker>> = serde_json::from_str(body)
            .map_err(|e| ArbitrageError::DataParsing(format!("Failed to parse ticker: {}", e)))?;
        Self::check_errors(&response.error)?;

        // The result is keyed by Kraken's canonical pair name, which may differ from the request
        let ticker = response
            .result
            .and_then(|result| result.into_values().next())
            .ok_or_else(|| ArbitrageError::DataParsing("Ticker result is empty".to_string()))?;

        let ask = ticker
            .a
            .first()
            .ok_or_else(|| ArbitrageError::DataParsing("Ticker has no ask".to_string()))?;
        parse_price(ask, "ask")
    }

    fn order_request(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        credentials: &Credentials,
        order: &MarketOrder,
    ) -> Result<reqwest::RequestBuilder> {
        let nonce = chrono::Utc::now().timestamp_millis();
        let body = Self::order_body(order, nonce);
        let signature = signing::kraken_signature(&credentials.secret_key, ADD_ORDER_PATH, &nonce.to_string(), &body)?;

        Ok(client
            .post(format!("{}{}", base_url, ADD_ORDER_PATH))
            .header("API-Key", &credentials.api_key)
            .header("API-Sign", signature)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body))
    }

    fn parse_order_id(&self, body: &str) -> Result<String> {
        let response: KrakenResponse<KrakenAddOrderResult> = serde_json::from_str(body)
            .map_err(|e| ArbitrageError::DataParsing(format!("Failed to parse order response: {}", e)))?;
        Self::check_errors(&response.error)?;

        response
            .result
            .and_then(|result| result.txid.into_iter().next())
            .ok_or_else(|| ArbitrageError::DataParsing("Order response has no txid".to_string()).into())
    }
}

// Kraken API response types
#[derive(Debug, Deserialize)]
struct KrakenResponse<T> {
    #[serde(default)]
    error: Vec<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct KrakenTicker {
    /// `[price, whole lot volume, lot volume]`
    a: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct KrakenAddOrderResult {
    #[serde(default)]
    txid: Vec<String>,
}
