//! Venue adapters: live exchange connectors and the simulated price source

pub mod traits;
pub mod binance;
pub mod bybit;
pub mod kraken;
pub mod kucoin;
pub mod live;
pub mod signing;
pub mod simulated;

pub use traits::*;
pub use binance::BinanceProtocol;
pub use bybit::BybitProtocol;
pub use kraken::KrakenProtocol;
pub use kucoin::KucoinProtocol;
pub use live::{ExchangeProtocol, LiveVenueAdapter};
pub use simulated::SimulatedVenueAdapter;

use crate::{
    config::{ArbitrageConfig, ModePreference},
    data::Venue,
    ArbitrageError, Result,
};
use futures_util::future::join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, sync::Arc};
use tracing::{info, warn};

/// Supported exchanges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// Binance exchange
    Binance,
    /// Bybit exchange
    Bybit,
    /// Kraken exchange
    Kraken,
    /// KuCoin exchange
    Kucoin,
}

impl Exchange {
    /// Wire protocol for this exchange
    pub fn protocol(&self) -> Box<dyn ExchangeProtocol> {
        match self {
            Exchange::Binance => Box::new(BinanceProtocol),
            Exchange::Bybit => Box::new(BybitProtocol),
            Exchange::Kraken => Box::new(KrakenProtocol),
            Exchange::Kucoin => Box::new(KucoinProtocol),
        }
    }

    /// Whether signed requests need an API passphrase
    pub fn requires_passphrase(&self) -> bool {
        matches!(self, Exchange::Kucoin)
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exchange::Binance => write!(f, "binance"),
            Exchange::Bybit => write!(f, "bybit"),
            Exchange::Kraken => write!(f, "kraken"),
            Exchange::Kucoin => write!(f, "kucoin"),
        }
    }
}

impl std::str::FromStr for Exchange {
    type Err = ArbitrageError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "binance" => Ok(Exchange::Binance),
            "bybit" => Ok(Exchange::Bybit),
            "kraken" => Ok(Exchange::Kraken),
            "kucoin" => Ok(Exchange::Kucoin),
            _ => Err(ArbitrageError::Config(format!("Unknown exchange: {}", s))),
        }
    }
}

/// Connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Disconnected
    Disconnected,
    /// Connected
    Connected,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "disconnected"),
            ConnectionStatus::Connected => write!(f, "connected"),
        }
    }
}

/// Which adapter family serves the run; chosen once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Real exchanges, real orders
    Live,
    /// Synthetic prices, orders fill immediately
    Simulated,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Live => write!(f, "live"),
            Mode::Simulated => write!(f, "simulated"),
        }
    }
}

/// Whether this build may talk to real exchanges
pub const fn live_trading_enabled() -> bool {
    cfg!(feature = "live-trading") && !cfg!(feature = "dry-run-only")
}

/// The venues of one run, all of a single [`Mode`], in configured order
pub struct VenueSet {
    mode: Mode,
    adapters: IndexMap<Venue, Arc<dyn VenueAdapter>>,
}

impl VenueSet {
    /// Assemble a venue set from prebuilt adapters
    pub fn new(mode: Mode, adapters: Vec<Arc<dyn VenueAdapter>>) -> Result<Self> {
        let mut by_venue = IndexMap::with_capacity(adapters.len());
        for adapter in adapters {
            let venue = adapter.venue().clone();
            if by_venue.insert(venue.clone(), adapter).is_some() {
                return Err(ArbitrageError::Config(format!("Duplicate venue: {}", venue)).into());
            }
        }

        if by_venue.len() < 2 {
            return Err(ArbitrageError::Config(format!(
                "At least two venues are required, got {}",
                by_venue.len()
            ))
            .into());
        }

        Ok(Self { mode, adapters: by_venue })
    }

    /// Build the venue set the configuration asks for
    pub fn build(config: &ArbitrageConfig) -> Result<Self> {
        Self::build_with(config, config.execution.mode)
    }

    /// Build with an explicit mode preference
    pub fn build_with(config: &ArbitrageConfig, preference: ModePreference) -> Result<Self> {
        if !live_trading_enabled() {
            if preference == ModePreference::Live {
                return Err(ArbitrageError::Config("Live trading is disabled in this build".to_string()).into());
            }
            info!("Live trading disabled at compile time, using simulated venues");
            return Self::simulated(config);
        }

        match preference {
            ModePreference::Simulated => Self::simulated(config),
            ModePreference::Live => {
                let live = Self::live_adapters(config);
                if live.len() < 2 {
                    return Err(ArbitrageError::Config(format!(
                        "Live mode needs at least two venues with usable credentials, found {}",
                        live.len()
                    ))
                    .into());
                }
                Self::new(Mode::Live, live)
            }
            ModePreference::Auto => {
                let live = Self::live_adapters(config);
                if live.len() >= 2 {
                    return Self::new(Mode::Live, live);
                }

                warn!(
                    live_venues = live.len(),
                    "Fewer than two live venues available, falling back to simulation"
                );
                Self::simulated(config)
            }
        }
    }

    /// Simulated adapters for every configured venue
    pub fn simulated(config: &ArbitrageConfig) -> Result<Self> {
        let instruments = config.instruments();
        let mut adapters: Vec<Arc<dyn VenueAdapter>> = Vec::new();

        for (index, venue) in config.venues().into_iter().enumerate() {
            let mut base_prices = HashMap::with_capacity(instruments.len());
            for instrument in &instruments {
                let price = config.base_price(instrument, &venue).ok_or_else(|| {
                    ArbitrageError::Config(format!("No simulation base price for {} on {}", instrument, venue))
                })?;
                base_prices.insert(instrument.clone(), price);
            }

            // Distinct per-venue streams from one configured seed
            let seed = config.simulation.seed.map(|seed| seed.wrapping_add(index as u64));

            adapters.push(Arc::new(SimulatedVenueAdapter::new(
                venue,
                base_prices,
                config.simulation.volatility,
                config.simulation.min_price,
                seed,
            )));
        }

        info!(venues = adapters.len(), "Using simulated venues");
        Self::new(Mode::Simulated, adapters)
    }

    fn live_adapters(config: &ArbitrageConfig) -> Vec<Arc<dyn VenueAdapter>> {
        let mut adapters: Vec<Arc<dyn VenueAdapter>> = Vec::new();

        for venue in &config.venues {
            if !venue.has_credentials() {
                warn!(venue = %venue.name, "No API credentials, venue excluded from live trading");
                continue;
            }

            match LiveVenueAdapter::from_config(venue, config.fetch_timeout().max(config.order_timeout())) {
                Ok(adapter) => adapters.push(Arc::new(adapter)),
                Err(e) => warn!(venue = %venue.name, error = %e, "Failed to create live venue"),
            }
        }

        adapters
    }

    /// Mode of every adapter in the set
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Adapter for `venue`
    pub fn get(&self, venue: &Venue) -> Option<&Arc<dyn VenueAdapter>> {
        self.adapters.get(venue)
    }

    /// Adapters in configured order
    pub fn adapters(&self) -> impl Iterator<Item = &Arc<dyn VenueAdapter>> {
        self.adapters.values()
    }

    /// Venues in configured order
    pub fn venues(&self) -> Vec<Venue> {
        self.adapters.keys().cloned().collect()
    }

    /// Number of venues
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Always false for a constructed set
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Close every adapter; failures are logged, never propagated
    pub async fn close_all(&self) {
        let results = join_all(self.adapters.values().map(|adapter| adapter.close())).await;

        for (venue, result) in self.adapters.keys().zip(results) {
            if let Err(e) = result {
                warn!(venue = %venue, error = %e, "Failed to close venue");
            }
        }

        info!(mode = %self.mode, venues = self.adapters.len(), "All venues closed");
    }
}
