//! Settings management utilities

use crate::{ArbitrageError, Result};
use std::env;

/// Environment variable expansion utility
pub struct EnvExpander;

impl EnvExpander {
    /// Expand environment variables in a string
    /// Supports the ${VAR_NAME} pattern; substituted values are not expanded again
    pub fn expand(input: &str) -> Result<String> {
        let mut result = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(start) = rest.find("${") {
            let Some(end) = rest[start..].find('}') else {
                return Err(ArbitrageError::Config(
                    "Unclosed environment variable reference".to_string(),
                )
                .into());
            };

            let var_name = &rest[start + 2..start + end];
            let var_value = env::var(var_name).map_err(|_| {
                ArbitrageError::Config(format!("Environment variable '{}' not found", var_name))
            })?;

            result.push_str(&rest[..start]);
            result.push_str(&var_value);
            rest = &rest[start + end + 1..];
        }

        result.push_str(rest);
        Ok(result)
    }

    /// Expand an optional credential field.
    ///
    /// A reference to an unset variable or an empty result yields `None` rather
    /// than an error: a venue without credentials is simply not tradable live.
    pub fn expand_optional(value: Option<&str>) -> Option<String> {
        let expanded = Self::expand(value?).ok()?;
        let trimmed = expanded.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate an instrument symbol of the form `BASE/QUOTE`
    pub fn validate_instrument(symbol: &str) -> Result<()> {
        let Some((base, quote)) = symbol.split_once('/') else {
            return Err(ArbitrageError::Config(format!(
                "Instrument '{}' must have the form BASE/QUOTE",
                symbol
            ))
            .into());
        };

        let valid_part = |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric());
        if !valid_part(base) || !valid_part(quote) {
            return Err(ArbitrageError::Config(format!(
                "Instrument '{}' must contain only alphanumeric assets",
                symbol
            ))
            .into());
        }

        Ok(())
    }

    /// Validate a rate in the half-open range [0.0, 1.0)
    pub fn validate_fraction(value: f64, name: &str) -> Result<()> {
        if !(0.0..1.0).contains(&value) {
            return Err(ArbitrageError::Config(format!(
                "{} must be in [0.0, 1.0)",
                name
            ))
            .into());
        }
        Ok(())
    }

    /// Validate a positive value
    pub fn validate_positive(value: f64, name: &str) -> Result<()> {
        if !(value > 0.0 && value.is_finite()) {
            return Err(ArbitrageError::Config(format!("{} must be positive", name)).into());
        }
        Ok(())
    }

    /// Validate a URL format
    pub fn validate_url(url: &str, name: &str) -> Result<()> {
        if url.is_empty() {
            return Err(ArbitrageError::Config(format!("{} cannot be empty", name)).into());
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ArbitrageError::Config(format!("{} must be a valid URL", name)).into());
        }

        url::Url::parse(url)
            .map_err(|e| ArbitrageError::Config(format!("{} is not a valid URL: {}", name, e)))?;

        Ok(())
    }
}

/// Configuration defaults
pub struct ConfigDefaults;

impl ConfigDefaults {
    /// Starting cash balance in quote currency
    pub const INITIAL_CASH: f64 = 100.0;

    /// Minimum net spread for an opportunity to be actionable (0.5%)
    pub const THRESHOLD: f64 = 0.005;

    /// Notional of every trade in quote currency
    pub const TRADE_SIZE: f64 = 100.0;

    /// Fee charged on each leg (0.1%)
    pub const FEE_RATE: f64 = 0.001;

    /// Delay between polling cycles in milliseconds
    pub const POLL_INTERVAL_MS: u64 = 1500;

    /// Timeout of a single ticker fetch in milliseconds
    pub const FETCH_TIMEOUT_MS: u64 = 10_000;

    /// Timeout of a single order submission in milliseconds
    pub const ORDER_TIMEOUT_MS: u64 = 10_000;

    /// Wait after a failed cycle in milliseconds
    pub const CYCLE_BACKOFF_MS: u64 = 5000;

    /// Maximum relative price move per simulated tick (0.5%)
    pub const SIMULATION_VOLATILITY: f64 = 0.005;

    /// Floor applied to simulated prices
    pub const SIMULATION_MIN_PRICE: f64 = 0.01;

    /// Prometheus exporter listen address
    pub const METRICS_LISTEN_ADDR: &'static str = "127.0.0.1:9000";
}
