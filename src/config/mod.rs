//! Configuration management module

pub mod settings;

pub use settings::*;

use crate::{
    connectors::Exchange,
    data::{Instrument, Venue},
    ArbitrageError, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::warn;

/// Main configuration structure for the arbitrage system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageConfig {
    /// Strategy configuration
    pub strategy: StrategyConfig,
    /// Execution configuration
    pub execution: ExecutionConfig,
    /// Price simulation configuration
    pub simulation: SimulationConfig,
    /// Monitoring configuration
    pub monitoring: MonitoringConfig,
    /// Venue configuration, in scan order
    pub venues: Vec<VenueConfig>,
}

/// Strategy-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Instruments to poll, in scan order (`BASE/QUOTE`)
    pub instruments: Vec<String>,
    /// Notional of every trade in quote currency
    pub trade_size: f64,
    /// Fee rate charged on each leg
    pub fee_rate: f64,
    /// Minimum net spread (exclusive) for an opportunity to be actionable
    pub threshold: f64,
    /// Starting cash balance
    pub initial_cash: f64,
}

/// Which price source family to run with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModePreference {
    /// Live when at least two venues have credentials, simulated otherwise
    #[default]
    Auto,
    /// Live only; startup fails without two usable venues
    Live,
    /// Always simulate
    Simulated,
}

/// Execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Live/simulated selection
    #[serde(default)]
    pub mode: ModePreference,
    /// Delay between polling cycles in milliseconds
    pub poll_interval_ms: u64,
    /// Timeout of a single ticker fetch in milliseconds
    pub fetch_timeout_ms: u64,
    /// Timeout of a single order submission in milliseconds
    pub order_timeout_ms: u64,
    /// Wait after a failed cycle in milliseconds
    pub cycle_backoff_ms: u64,
    /// Stop after this many cycles (runs until interrupted when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cycles: Option<u64>,
}

/// Synthetic price generator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Maximum relative move per tick
    pub volatility: f64,
    /// Floor applied to every simulated price
    pub min_price: f64,
    /// Fixed RNG seed for reproducible runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Starting price per instrument, per venue
    pub base_prices: BTreeMap<String, BTreeMap<String, f64>>,
}

/// Monitoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Enable the Prometheus exporter
    pub enable_metrics: bool,
    /// Exporter listen address
    pub metrics_listen_addr: String,
    /// Print the status table after every cycle
    pub status_table: bool,
}

/// Individual venue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Alias used in reports, e.g. `Exchange A`
    pub name: String,
    /// Exchange behind the alias (`binance`, `bybit`, `kraken`, `kucoin`)
    pub exchange: String,
    /// REST API base URL override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_api_url: Option<String>,
    /// API key, `${VAR}` references are expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Secret key, `${VAR}` references are expanded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,
    /// API passphrase (kucoin only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
}

impl VenueConfig {
    /// Whether both key and secret are present
    pub fn has_credentials(&self) -> bool {
        let present = |value: &Option<String>| value.as_deref().is_some_and(|v| !v.is_empty());
        present(&self.api_key) && present(&self.secret_key)
    }
}

impl ArbitrageConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ArbitrageError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text and expand credential references
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: ArbitrageConfig = toml::from_str(content)
            .map_err(|e| ArbitrageError::Config(format!("Failed to parse config: {}", e)))?;

        config.expand_env_vars();

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Strategy
        if self.strategy.instruments.is_empty() {
            return Err(ArbitrageError::Config("At least one instrument must be configured".to_string()).into());
        }

        let mut seen = HashSet::new();
        for symbol in &self.strategy.instruments {
            ConfigValidator::validate_instrument(symbol)?;
            if !seen.insert(symbol.as_str()) {
                return Err(ArbitrageError::Config(format!("Duplicate instrument: {}", symbol)).into());
            }
        }

        ConfigValidator::validate_positive(self.strategy.trade_size, "Trade size")?;
        ConfigValidator::validate_positive(self.strategy.initial_cash, "Initial cash")?;
        ConfigValidator::validate_fraction(self.strategy.fee_rate, "Fee rate")?;

        if !(self.strategy.threshold >= 0.0 && self.strategy.threshold.is_finite()) {
            return Err(ArbitrageError::Config("Threshold must be a non-negative number".to_string()).into());
        }

        // Execution
        for (value, name) in [
            (self.execution.poll_interval_ms, "Poll interval"),
            (self.execution.fetch_timeout_ms, "Fetch timeout"),
            (self.execution.order_timeout_ms, "Order timeout"),
            (self.execution.cycle_backoff_ms, "Cycle backoff"),
        ] {
            if value == 0 {
                return Err(ArbitrageError::Config(format!("{} must be greater than 0", name)).into());
            }
        }

        // Simulation
        ConfigValidator::validate_fraction(self.simulation.volatility, "Simulation volatility")?;
        ConfigValidator::validate_positive(self.simulation.min_price, "Simulation minimum price")?;

        // Venues
        if self.venues.len() < 2 {
            return Err(ArbitrageError::Config("At least two venues required for arbitrage".to_string()).into());
        }

        let mut names = HashSet::new();
        for venue in &self.venues {
            if venue.name.trim().is_empty() {
                return Err(ArbitrageError::Config("Venue name cannot be empty".to_string()).into());
            }
            if !names.insert(venue.name.as_str()) {
                return Err(ArbitrageError::Config(format!("Duplicate venue: {}", venue.name)).into());
            }
            venue.exchange.parse::<Exchange>()?;
            if let Some(url) = &venue.rest_api_url {
                ConfigValidator::validate_url(url, &format!("{} REST API URL", venue.name))?;
            }
        }

        Ok(())
    }

    /// Configured instruments in scan order
    pub fn instruments(&self) -> Vec<Instrument> {
        self.strategy.instruments.iter().map(|s| Instrument::new(s.as_str())).collect()
    }

    /// Configured venues in scan order
    pub fn venues(&self) -> Vec<Venue> {
        self.venues.iter().map(|v| Venue::new(v.name.as_str())).collect()
    }

    /// Simulation base price for a key
    pub fn base_price(&self, instrument: &Instrument, venue: &Venue) -> Option<f64> {
        self.simulation
            .base_prices
            .get(instrument.as_str())
            .and_then(|prices| prices.get(venue.as_str()))
            .copied()
    }

    /// Delay between cycles
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.execution.poll_interval_ms)
    }

    /// Per-fetch timeout
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.execution.fetch_timeout_ms)
    }

    /// Per-order timeout
    pub fn order_timeout(&self) -> Duration {
        Duration::from_millis(self.execution.order_timeout_ms)
    }

    /// Wait after a failed cycle
    pub fn cycle_backoff(&self) -> Duration {
        Duration::from_millis(self.execution.cycle_backoff_ms)
    }

    /// Expand `${VAR}` references in venue credentials
    fn expand_env_vars(&mut self) {
        for venue in &mut self.venues {
            let had_key = venue.api_key.is_some();
            venue.api_key = EnvExpander::expand_optional(venue.api_key.as_deref());
            venue.secret_key = EnvExpander::expand_optional(venue.secret_key.as_deref());
            venue.passphrase = EnvExpander::expand_optional(venue.passphrase.as_deref());

            if had_key && venue.api_key.is_none() {
                warn!(venue = %venue.name, "API key reference could not be resolved, venue has no credentials");
            }
        }
    }
}

impl Default for ArbitrageConfig {
    fn default() -> Self {
        let venues = [
            ("Exchange A", "binance"),
            ("Exchange B", "kraken"),
            ("Exchange C", "kucoin"),
        ];

        let base_prices: BTreeMap<String, BTreeMap<String, f64>> = [
            ("BTC/USDT", [60000.0, 60150.0, 59900.0]),
            ("ETH/USDT", [3200.0, 3205.0, 3195.0]),
            ("XRP/USDT", [0.52, 0.51, 0.525]),
        ]
        .into_iter()
        .map(|(symbol, prices)| {
            let per_venue: BTreeMap<String, f64> = venues
                .iter()
                .zip(prices)
                .map(|((name, _), price)| (name.to_string(), price))
                .collect();
            (symbol.to_string(), per_venue)
        })
        .collect();

        Self {
            strategy: StrategyConfig {
                instruments: vec![
                    "BTC/USDT".to_string(),
                    "ETH/USDT".to_string(),
                    "XRP/USDT".to_string(),
                ],
                trade_size: ConfigDefaults::TRADE_SIZE,
                fee_rate: ConfigDefaults::FEE_RATE,
                threshold: ConfigDefaults::THRESHOLD,
                initial_cash: ConfigDefaults::INITIAL_CASH,
            },
            execution: ExecutionConfig {
                mode: ModePreference::Auto,
                poll_interval_ms: ConfigDefaults::POLL_INTERVAL_MS,
                fetch_timeout_ms: ConfigDefaults::FETCH_TIMEOUT_MS,
                order_timeout_ms: ConfigDefaults::ORDER_TIMEOUT_MS,
                cycle_backoff_ms: ConfigDefaults::CYCLE_BACKOFF_MS,
                max_cycles: None,
            },
            simulation: SimulationConfig {
                volatility: ConfigDefaults::SIMULATION_VOLATILITY,
                min_price: ConfigDefaults::SIMULATION_MIN_PRICE,
                seed: None,
                base_prices,
            },
            monitoring: MonitoringConfig {
                enable_metrics: false,
                metrics_listen_addr: ConfigDefaults::METRICS_LISTEN_ADDR.to_string(),
                status_table: true,
            },
            venues: venues
                .iter()
                .map(|(name, exchange)| VenueConfig {
                    name: name.to_string(),
                    exchange: exchange.to_string(),
                    rest_api_url: None,
                    api_key: None,
                    secret_key: None,
                    passphrase: None,
                })
                .collect(),
        }
    }
}
