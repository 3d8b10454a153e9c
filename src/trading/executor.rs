//! Paired market order execution

use crate::{
    config::ArbitrageConfig,
    connectors::{Mode, OrderSide, VenueAdapter, VenueSet},
    data::{Instrument, Venue},
    log_trade,
    reporting::{ExecutionAlert, ReportEvent, ReportSink},
    strategy::{Opportunity, TradeEconomics},
    trading::Portfolio,
    utils::metrics,
    ArbitrageError, Result,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{sync::Arc, time::Duration};
use tracing::{debug, error, warn};
use uuid::Uuid;

/// One leg as it is sent to a venue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegIntent {
    /// Target venue
    pub venue: Venue,
    /// Buy or sell
    pub side: OrderSide,
    /// Base asset amount
    pub amount: f64,
    /// Reference price the opportunity was computed with
    pub price: f64,
}

/// What happened to a leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LegOutcome {
    /// Not submitted yet
    Pending,
    /// Accepted by the venue
    Filled {
        /// Venue order id
        order_id: String,
    },
    /// Rejected, errored or timed out
    Failed {
        /// Failure description
        reason: String,
    },
    /// Not submitted because the run is simulated
    Simulated,
}

impl LegOutcome {
    /// Whether the leg holds a position on the venue
    pub fn is_filled(&self) -> bool {
        matches!(self, LegOutcome::Filled { .. } | LegOutcome::Simulated)
    }

    /// Venue order id, when one was returned
    pub fn order_id(&self) -> Option<&str> {
        match self {
            LegOutcome::Filled { order_id } => Some(order_id),
            _ => None,
        }
    }
}

/// One candidate execution: both leg intents, their outcomes and the expected profit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeAttempt {
    /// Attempt id
    pub id: String,
    /// Instrument traded
    pub instrument: Instrument,
    /// Buy leg
    pub buy: LegIntent,
    /// Sell leg
    pub sell: LegIntent,
    /// Buy leg result
    pub buy_outcome: LegOutcome,
    /// Sell leg result
    pub sell_outcome: LegOutcome,
    /// Net profit if both legs fill
    pub net_profit: f64,
    /// Net spread if both legs fill
    pub net_spread: f64,
    /// Attempt start
    pub started_at: DateTime<Utc>,
}

impl TradeAttempt {
    /// Build the attempt for an opportunity; both legs carry the same amount
    pub fn new(opportunity: &Opportunity, economics: &TradeEconomics) -> Self {
        Self {
            id: Uuid::new_v4().simple().to_string(),
            instrument: opportunity.instrument.clone(),
            buy: LegIntent {
                venue: opportunity.buy_venue.clone(),
                side: OrderSide::Buy,
                amount: economics.asset_amount,
                price: opportunity.buy_price,
            },
            sell: LegIntent {
                venue: opportunity.sell_venue.clone(),
                side: OrderSide::Sell,
                amount: economics.asset_amount,
                price: opportunity.sell_price,
            },
            buy_outcome: LegOutcome::Pending,
            sell_outcome: LegOutcome::Pending,
            net_profit: economics.net_profit,
            net_spread: economics.net_spread,
            started_at: Utc::now(),
        }
    }

    /// Both legs are in place
    pub fn is_complete(&self) -> bool {
        self.buy_outcome.is_filled() && self.sell_outcome.is_filled()
    }

    /// Legs that did not fill
    pub fn failed_legs(&self) -> Vec<(&LegIntent, &LegOutcome)> {
        self.legs().filter(|(_, outcome)| !outcome.is_filled()).collect()
    }

    /// Legs that filled
    pub fn filled_legs(&self) -> Vec<(&LegIntent, &LegOutcome)> {
        self.legs().filter(|(_, outcome)| outcome.is_filled()).collect()
    }

    fn legs(&self) -> impl Iterator<Item = (&LegIntent, &LegOutcome)> {
        [(&self.buy, &self.buy_outcome), (&self.sell, &self.sell_outcome)].into_iter()
    }
}

/// A committed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Attempt id
    pub id: String,
    /// Instrument traded
    pub instrument: Instrument,
    /// Buy venue
    pub buy_venue: Venue,
    /// Buy reference price
    pub buy_price: f64,
    /// Sell venue
    pub sell_venue: Venue,
    /// Sell reference price
    pub sell_price: f64,
    /// Base asset amount of each leg
    pub amount: f64,
    /// Profit credited to the portfolio
    pub net_profit: f64,
    /// Buy order id, absent in simulation
    pub buy_order_id: Option<String>,
    /// Sell order id, absent in simulation
    pub sell_order_id: Option<String>,
    /// Commit time
    pub executed_at: DateTime<Utc>,
}

impl TradeRecord {
    fn from_attempt(attempt: &TradeAttempt) -> Self {
        Self {
            id: attempt.id.clone(),
            instrument: attempt.instrument.clone(),
            buy_venue: attempt.buy.venue.clone(),
            buy_price: attempt.buy.price,
            sell_venue: attempt.sell.venue.clone(),
            sell_price: attempt.sell.price,
            amount: attempt.buy.amount,
            net_profit: attempt.net_profit,
            buy_order_id: attempt.buy_outcome.order_id().map(str::to_string),
            sell_order_id: attempt.sell_outcome.order_id().map(str::to_string),
            executed_at: Utc::now(),
        }
    }
}

/// Result of executing one opportunity
#[derive(Debug, Clone, PartialEq)]
pub enum TradeOutcome {
    /// Both legs filled and the profit was committed
    Committed(TradeRecord),
    /// At least one leg failed; the portfolio is unchanged
    Aborted(TradeAttempt),
    /// Not attempted
    Skipped {
        /// Why
        reason: String,
    },
}

/// Executes opportunities as two concurrent market orders and commits the result
pub struct TradeExecutor {
    venues: Arc<VenueSet>,
    portfolio: Arc<Portfolio>,
    sink: Arc<dyn ReportSink>,
    trade_size: f64,
    fee_rate: f64,
    threshold: f64,
    order_timeout: Duration,
}

impl TradeExecutor {
    /// Create an executor
    pub fn new(
        venues: Arc<VenueSet>,
        portfolio: Arc<Portfolio>,
        sink: Arc<dyn ReportSink>,
        trade_size: f64,
        fee_rate: f64,
        threshold: f64,
        order_timeout: Duration,
    ) -> Self {
        Self {
            venues,
            portfolio,
            sink,
            trade_size,
            fee_rate,
            threshold,
            order_timeout,
        }
    }

    /// Executor using the configured trade size, fee rate, threshold and order timeout
    pub fn from_config(
        config: &ArbitrageConfig,
        venues: Arc<VenueSet>,
        portfolio: Arc<Portfolio>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self::new(
            venues,
            portfolio,
            sink,
            config.strategy.trade_size,
            config.strategy.fee_rate,
            config.strategy.threshold,
            config.order_timeout(),
        )
    }

    /// Execute one opportunity
    pub async fn execute(&self, opportunity: &Opportunity) -> TradeOutcome {
        let economics = TradeEconomics::compute(
            self.trade_size,
            self.fee_rate,
            opportunity.buy_price,
            opportunity.sell_price,
        );

        if !economics.is_actionable(self.threshold) {
            debug!(
                instrument = %opportunity.instrument,
                net_spread = economics.net_spread,
                threshold = self.threshold,
                "Opportunity no longer actionable"
            );
            return TradeOutcome::Skipped {
                reason: format!("net spread {:.6} not above threshold {}", economics.net_spread, self.threshold),
            };
        }

        let (Some(buy_adapter), Some(sell_adapter)) =
            (self.venues.get(&opportunity.buy_venue), self.venues.get(&opportunity.sell_venue))
        else {
            warn!(
                buy_venue = %opportunity.buy_venue,
                sell_venue = %opportunity.sell_venue,
                "Opportunity references an unknown venue"
            );
            return TradeOutcome::Skipped {
                reason: "unknown venue".to_string(),
            };
        };

        let mut attempt = TradeAttempt::new(opportunity, &economics);

        match self.venues.mode() {
            Mode::Simulated => {
                attempt.buy_outcome = LegOutcome::Simulated;
                attempt.sell_outcome = LegOutcome::Simulated;
            }
            Mode::Live => {
                let (buy, sell) = tokio::join!(
                    self.submit_leg(buy_adapter.as_ref(), &attempt.instrument, &attempt.buy),
                    self.submit_leg(sell_adapter.as_ref(), &attempt.instrument, &attempt.sell),
                );
                attempt.buy_outcome = buy;
                attempt.sell_outcome = sell;
            }
        }

        if attempt.is_complete() {
            self.commit(attempt).await
        } else {
            self.abort(attempt)
        }
    }

    async fn submit_leg(&self, adapter: &dyn VenueAdapter, instrument: &Instrument, leg: &LegIntent) -> LegOutcome {
        let submission = async {
            match leg.side {
                OrderSide::Buy => adapter.submit_market_buy(instrument, leg.amount).await,
                OrderSide::Sell => adapter.submit_market_sell(instrument, leg.amount).await,
            }
        };

        let result: Result<String> = match tokio::time::timeout(self.order_timeout, submission).await {
            Ok(result) => result,
            Err(_) => Err(ArbitrageError::Timeout(format!(
                "{} order on {} did not complete within {:?}",
                leg.side, leg.venue, self.order_timeout
            ))
            .into()),
        };

        match result {
            Ok(order_id) => LegOutcome::Filled { order_id },
            Err(e) => LegOutcome::Failed { reason: e.to_string() },
        }
    }

    async fn commit(&self, attempt: TradeAttempt) -> TradeOutcome {
        let ledger = self.portfolio.commit(attempt.net_profit).await;
        metrics::record_trade_committed(ledger.cash, ledger.total_profit);

        let record = TradeRecord::from_attempt(&attempt);
        log_trade!(
            info,
            record.instrument,
            record.buy_venue,
            record.sell_venue,
            record.amount,
            record.net_profit,
            trade_id = %record.id,
            buy_price = record.buy_price,
            sell_price = record.sell_price,
            cash = ledger.cash,
            "Trade committed"
        );

        self.sink.publish(ReportEvent::TradeCompleted(record.clone()));
        TradeOutcome::Committed(record)
    }

    fn abort(&self, attempt: TradeAttempt) -> TradeOutcome {
        metrics::record_trade_aborted();

        let describe = |legs: Vec<(&LegIntent, &LegOutcome)>| -> String {
            legs.iter()
                .map(|(leg, outcome)| match outcome {
                    LegOutcome::Failed { reason } => format!("{} on {} ({})", leg.side, leg.venue, reason),
                    LegOutcome::Filled { order_id } => format!("{} on {} (order {})", leg.side, leg.venue, order_id),
                    _ => format!("{} on {}", leg.side, leg.venue),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        error!(
            trade_id = %attempt.id,
            instrument = %attempt.instrument,
            amount = attempt.buy.amount,
            failed = %describe(attempt.failed_legs()),
            filled = %describe(attempt.filled_legs()),
            "CRITICAL: paired execution failed, filled legs are unhedged"
        );

        self.sink.publish(ReportEvent::ExecutionAlert(ExecutionAlert::new(attempt.clone())));
        TradeOutcome::Aborted(attempt)
    }
}
