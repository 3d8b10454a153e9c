//! Bybit v5 spot REST protocol

use crate::{
    connectors::{
        live::{parse_price, ExchangeProtocol},
        signing, Credentials, Exchange, MarketOrder, OrderSide,
    },
    data::Instrument,
    ArbitrageError, Result,
};
use serde::{Deserialize, Serialize};

const RECV_WINDOW_MS: &str = "5000";

/// Bybit spot protocol
#[derive(Debug, Default, Clone, Copy)]
pub struct BybitProtocol;

impl BybitProtocol {
    /// JSON body for a market order; quantity is in base coin
    pub fn order_body(order: &MarketOrder) -> Result<String> {
        let body = BybitOrderRequest {
            category: "spot",
            symbol: &order.symbol,
            side: match order.side {
                OrderSide::Buy => "Buy",
                OrderSide::Sell => "Sell",
            },
            order_type: "Market",
            qty: &order.quantity,
            market_unit: "baseCoin",
            order_link_id: &order.client_order_id,
        };

        serde_json::to_string(&body)
            .map_err(|e| ArbitrageError::DataParsing(format!("Failed to encode order: {}", e)).into())
    }

    /// `X-BAPI-SIGN` over timestamp, key, receive window and body
    pub fn sign(credentials: &Credentials, timestamp_ms: i64, body: &str) -> Result<String> {
        let payload = format!("{}{}{}{}", timestamp_ms, credentials.api_key, RECV_WINDOW_MS, body);
        signing::hmac_sha256_hex(&credentials.secret_key, &payload)
    }

    fn check_ret_code(ret_code: i64, ret_msg: &str) -> Result<()> {
        if ret_code != 0 {
            return Err(ArbitrageError::DataParsing(format!("Bybit error {}: {}", ret_code, ret_msg)).into());
        }
        Ok(())
    }
}

impl ExchangeProtocol for BybitProtocol {
    fn exchange(&self) -> Exchange {
        Exchange::Bybit
    }

    fn default_base_url(&self) -> &'static str {
        "https://api.bybit.com"
    }

    fn market_symbol(&self, instrument: &Instrument) -> String {
        format!("{}{}", instrument.base(), instrument.quote()).to_uppercase()
    }

    fn ask_request(&self, client: &reqwest::Client, base_url: &str, symbol: &str) -> reqwest::RequestBuilder {
        client
            .get(format!("{}/v5/market/tickers", base_url))
            .query(&[("category", "spot"), ("symbol", symbol)])
    }

    fn parse_ask(&self, body: &str) -> Result<f64> {
        let response: BybitResponse<BybitTickerResult> = serde_json::from_str(body)
            .map_err(|e| ArbitrageError::DataParsing(format!("Failed to parse ticker: {}", e)))?;
        Self::check_ret_code(response.ret_code, &response.ret_msg)?;

        let ticker = response
            .result
            .and_then(|result| result.list.into_iter().next())
            .ok_or_else(|| ArbitrageError::DataParsing("Ticker list is empty".to_string()))?;

        parse_price(&ticker.ask1_price, "ask1Price")
    }

    fn order_request(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        credentials: &Credentials,
        order: &MarketOrder,
    ) -> Result<reqwest::RequestBuilder> {
        let body = Self::order_body(order)?;
        let timestamp = chrono::Utc::now().timestamp_millis();
        let signature = Self::sign(credentials, timestamp, &body)?;

        Ok(client
            .post(format!("{}/v5/order/create", base_url))
            .header("X-BAPI-API-KEY", &credentials.api_key)
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", RECV_WINDOW_MS)
            .header("X-BAPI-SIGN", signature)
            .header("Content-Type", "application/json")
            .body(body))
    }

    fn parse_order_id(&self, body: &str) -> Result<String> {
        let response: BybitResponse<BybitOrderResult> = serde_json::from_str(body)
            .map_err(|e| ArbitrageError::DataParsing(format!("Failed to parse order response: {}", e)))?;
        Self::check_ret_code(response.ret_code, &response.ret_msg)?;

        response
            .result
            .map(|result| result.order_id)
            .ok_or_else(|| ArbitrageError::DataParsing("Order response has no result".to_string()).into())
    }
}

// Bybit API request/response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BybitOrderRequest<'a> {
    category: &'a str,
    symbol: &'a str,
    side: &'a str,
    order_type: &'a str,
    qty: &'a str,
    market_unit: &'a str,
    order_link_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct BybitResponse<T> {
    #[serde(rename = "retCode")]
    ret_code: i64,
    #[serde(rename = "retMsg", default)]
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct BybitTickerResult {
    #[serde(default)]
    list: Vec<BybitTicker>,
}

#[derive(Debug, Deserialize)]
struct BybitTicker {
    #[serde(rename = "ask1Price")]
    ask1_price: String,
}

#[derive(Debug, Deserialize)]
struct BybitOrderResult {
    #[serde(rename = "orderId")]
    order_id: String,
}
