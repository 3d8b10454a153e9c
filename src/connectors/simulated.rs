//! Synthetic price source used when no live venue is available

use crate::{
    connectors::VenueAdapter,
    data::{Instrument, Venue},
    ArbitrageError, Result,
};
use async_trait::async_trait;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

struct SimulationState {
    prices: HashMap<Instrument, f64>,
    rng: StdRng,
}

/// Random-walk ask prices seeded from fixed base prices.
///
/// Every fetch moves the previous price by a uniform relative delta in
/// `[-volatility, +volatility]` and floors it at `min_price`. Orders always fill.
pub struct SimulatedVenueAdapter {
    venue: Venue,
    volatility: f64,
    min_price: f64,
    state: Mutex<SimulationState>,
}

impl SimulatedVenueAdapter {
    /// Create a simulated venue; a fixed `seed` makes the walk reproducible
    pub fn new(
        venue: Venue,
        base_prices: HashMap<Instrument, f64>,
        volatility: f64,
        min_price: f64,
        seed: Option<u64>,
    ) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            venue,
            volatility,
            min_price,
            state: Mutex::new(SimulationState {
                prices: base_prices,
                rng,
            }),
        }
    }

    /// Last generated price, without advancing the walk
    pub async fn last_price(&self, instrument: &Instrument) -> Option<f64> {
        self.state.lock().await.prices.get(instrument).copied()
    }
}

#[async_trait]
impl VenueAdapter for SimulatedVenueAdapter {
    fn venue(&self) -> &Venue {
        &self.venue
    }

    async fn fetch_ask(&self, instrument: &Instrument) -> Result<f64> {
        let mut state = self.state.lock().await;
        let SimulationState { prices, rng } = &mut *state;

        let price = prices.get_mut(instrument).ok_or_else(|| ArbitrageError::QuoteUnavailable {
            venue: self.venue.to_string(),
            instrument: instrument.to_string(),
            reason: "no base price configured".to_string(),
        })?;

        let delta = if self.volatility > 0.0 {
            rng.gen_range(-self.volatility..=self.volatility)
        } else {
            0.0
        };

        let next = (*price * (1.0 + delta)).max(self.min_price);
        trace!(venue = %self.venue, instrument = %instrument, previous = *price, next, "Simulated tick");
        *price = next;

        Ok(next)
    }

    async fn submit_market_buy(&self, instrument: &Instrument, amount: f64) -> Result<String> {
        debug!(venue = %self.venue, instrument = %instrument, amount, "Simulated market buy");
        Ok(format!("sim-{}", Uuid::new_v4().simple()))
    }

    async fn submit_market_sell(&self, instrument: &Instrument, amount: f64) -> Result<String> {
        debug!(venue = %self.venue, instrument = %instrument, amount, "Simulated market sell");
        Ok(format!("sim-{}", Uuid::new_v4().simple()))
    }

    async fn close(&self) -> Result<()> {
        debug!(venue = %self.venue, "Closing simulated venue");
        Ok(())
    }
}
