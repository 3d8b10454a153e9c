//! Pairwise spread detection over a price snapshot

use crate::{
    config::ArbitrageConfig,
    data::{Instrument, PriceSnapshot, Venue},
    log_spread,
    strategy::TradeEconomics,
};
use serde::{Deserialize, Serialize};

/// A fee-adjusted profitable buy/sell pair found in one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Instrument traded
    pub instrument: Instrument,
    /// Venue to buy on
    pub buy_venue: Venue,
    /// Ask on the buy venue
    pub buy_price: f64,
    /// Venue to sell on
    pub sell_venue: Venue,
    /// Ask on the sell venue, used as the sell execution price
    pub sell_price: f64,
    /// Net profit over trade size after both fees
    pub net_spread: f64,
    /// Net profit in quote currency
    pub net_profit: f64,
}

/// Scans every instrument and unordered venue pair in both directions
#[derive(Debug, Clone)]
pub struct SpreadScanner {
    instruments: Vec<Instrument>,
    venues: Vec<Venue>,
    trade_size: f64,
    fee_rate: f64,
    threshold: f64,
}

impl SpreadScanner {
    /// Create a scanner; `instruments` and `venues` fix the output order
    pub fn new(
        instruments: Vec<Instrument>,
        venues: Vec<Venue>,
        trade_size: f64,
        fee_rate: f64,
        threshold: f64,
    ) -> Self {
        Self {
            instruments,
            venues,
            trade_size,
            fee_rate,
            threshold,
        }
    }

    /// Scanner over the configured instruments and `venues`
    pub fn from_config(config: &ArbitrageConfig, venues: Vec<Venue>) -> Self {
        Self::new(
            config.instruments(),
            venues,
            config.strategy.trade_size,
            config.strategy.fee_rate,
            config.strategy.threshold,
        )
    }

    /// Configured threshold
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Actionable opportunities, ordered by instrument, venue pair, then direction
    pub fn scan(&self, snapshot: &PriceSnapshot) -> Vec<Opportunity> {
        let mut opportunities = Vec::new();

        for instrument in &self.instruments {
            for (i, venue_a) in self.venues.iter().enumerate() {
                for venue_b in &self.venues[i + 1..] {
                    let (Some(ask_a), Some(ask_b)) =
                        (snapshot.ask(instrument, venue_a), snapshot.ask(instrument, venue_b))
                    else {
                        continue;
                    };

                    for (buy_venue, buy_price, sell_venue, sell_price) in
                        [(venue_a, ask_a, venue_b, ask_b), (venue_b, ask_b, venue_a, ask_a)]
                    {
                        if let Some(opportunity) =
                            self.evaluate(instrument, buy_venue, buy_price, sell_venue, sell_price)
                        {
                            opportunities.push(opportunity);
                        }
                    }
                }
            }
        }

        opportunities
    }

    fn evaluate(
        &self,
        instrument: &Instrument,
        buy_venue: &Venue,
        buy_price: f64,
        sell_venue: &Venue,
        sell_price: f64,
    ) -> Option<Opportunity> {
        let economics = TradeEconomics::compute(self.trade_size, self.fee_rate, buy_price, sell_price);
        if !economics.is_actionable(self.threshold) {
            return None;
        }

        log_spread!(
            debug,
            instrument,
            buy_venue,
            sell_venue,
            economics.net_spread,
            buy_price,
            sell_price,
            net_profit = economics.net_profit,
            "Opportunity detected"
        );

        Some(Opportunity {
            instrument: instrument.clone(),
            buy_venue: buy_venue.clone(),
            buy_price,
            sell_venue: sell_venue.clone(),
            sell_price,
            net_spread: economics.net_spread,
            net_profit: economics.net_profit,
        })
    }
}
