//! KuCoin spot REST protocol

use crate::{
    connectors::{
        live::{parse_price, ExchangeProtocol},
        signing, Credentials, Exchange, MarketOrder, OrderSide,
    },
    data::Instrument,
    ArbitrageError, Result,
};
use serde::{Deserialize, Serialize};

const ORDERS_PATH: &str = "/api/v1/orders";
const SUCCESS_CODE: &str = "200000";

/// KuCoin spot protocol
#[derive(Debug, Default, Clone, Copy)]
pub struct KucoinProtocol;

/// KuCoin authentication headers for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KucoinAuthHeaders {
    /// `KC-API-SIGN`
    pub signature: String,
    /// `KC-API-PASSPHRASE`, signed with the secret (key version 2)
    pub passphrase: String,
    /// `KC-API-TIMESTAMP`
    pub timestamp: String,
}

impl KucoinProtocol {
    /// Sign a request at `timestamp_ms`
    pub fn auth_headers(
        credentials: &Credentials,
        timestamp_ms: i64,
        method: &str,
        path: &str,
        body: &str,
    ) -> Result<KucoinAuthHeaders> {
        let passphrase = credentials
            .passphrase
            .as_deref()
            .ok_or_else(|| ArbitrageError::Config("KuCoin requires an API passphrase".to_string()))?;

        let timestamp = timestamp_ms.to_string();
        let payload = format!("{}{}{}{}", timestamp, method, path, body);

        Ok(KucoinAuthHeaders {
            signature: signing::hmac_sha256_base64(&credentials.secret_key, &payload)?,
            passphrase: signing::hmac_sha256_base64(&credentials.secret_key, passphrase)?,
            timestamp,
        })
    }

    fn check_code(code: &str, msg: Option<&str>) -> Result<()> {
        if code != SUCCESS_CODE {
            return Err(ArbitrageError::DataParsing(format!(
                "KuCoin error {}: {}",
                code,
                msg.unwrap_or("unknown")
            ))
            .into());
        }
        Ok(())
    }
}

impl ExchangeProtocol for KucoinProtocol {
    fn exchange(&self) -> Exchange {
        Exchange::Kucoin
    }

    fn default_base_url(&self) -> &'static str {
        "https://api.kucoin.com"
    }

    fn market_symbol(&self, instrument: &Instrument) -> String {
        format!("{}-{}", instrument.base(), instrument.quote()).to_uppercase()
    }

    fn ask_request(&self, client: &reqwest::Client, base_url: &str, symbol: &str) -> reqwest::RequestBuilder {
        client
            .get(format!("{}/api/v1/market/orderbook/level1", base_url))
            .query(&[("symbol", symbol)])
    }

    fn parse_ask(&self, body: &str) -> Result<f64> {
        let response: KucoinResponse<KucoinLevel1> = serde_json::from_str(body)
            .map_err(|e| ArbitrageError::DataParsing(format!("Failed to parse level1 ticker: {}", e)))?;
        Self::check_code(&response.code, response.msg.as_deref())?;

        let best_ask = response
            .data
            .and_then(|data| data.best_ask)
            .ok_or_else(|| ArbitrageError::DataParsing("Level1 ticker has no best ask".to_string()))?;

        parse_price(&best_ask, "bestAsk")
    }

    fn order_request(
        &self,
        client: &reqwest::Client,
        base_url: &str,
        credentials: &Credentials,
        order: &MarketOrder,
    ) -> Result<reqwest::RequestBuilder> {
        let request = KucoinOrderRequest {
            client_oid: &order.client_order_id,
            side: match order.side {
                OrderSide::Buy => "buy",
                OrderSide::Sell => "sell",
            },
            symbol: &order.symbol,
            order_type: "market",
            size: &order.quantity,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| ArbitrageError::DataParsing(format!("Failed to encode order: {}", e)))?;

        let auth = Self::auth_headers(
            credentials,
            chrono::Utc::now().timestamp_millis(),
            "POST",
            ORDERS_PATH,
            &body,
        )?;

        Ok(client
            .post(format!("{}{}", base_url, ORDERS_PATH))
            .header("KC-API-KEY", &credentials.api_key)
            .header("KC-API-SIGN", auth.signature)
            .header("KC-API-TIMESTAMP", auth.timestamp)
            .header("KC-API-PASSPHRASE", auth.passphrase)
            .header("KC-API-KEY-VERSION", "2")
            .header("Content-Type", "application/json")
            .body(body))
    }

    fn parse_order_id(&self, body: &str) -> Result<String> {
        let response: KucoinResponse<KucoinOrderResult> = serde_json::from_str(body)
            .map_err(|e| ArbitrageError::DataParsing(format!("Failed to parse order response: {}", e)))?;
        Self::check_code(&response.code, response.msg.as_deref())?;

        response
            .data
            .map(|data| data.order_id)
            .ok_or_else(|| ArbitrageError::DataParsing("Order response has no data".to_string()).into())
    }
}

// KuCoin API request/response types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct KucoinOrderRequest<'a> {
    client_oid: &'a str,
    side: &'a str,
    symbol: &'a str,
    #[serde(rename = "type")]
    order_type: &'a str,
    size: &'a str,
}

#[derive(Debug, Deserialize)]
struct KucoinResponse<T> {
    code: String,
    msg: Option<String>,
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct KucoinLevel1 {
    #[serde(rename = "bestAsk")]
    best_ask: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KucoinOrderResult {
    #[serde(rename = "orderId")]
    order_id: String,
}
