//! Structured run events and the sinks that consume them
//!
//! The engine publishes events and never renders output itself. Sinks decide
//! what to do with them: forward to a channel, log, or draw the status table.

pub mod console;

pub use console::ConsoleReporter;

use crate::{
    connectors::Mode,
    data::Quote,
    trading::{LegIntent, LegOutcome, PortfolioSnapshot, TradeAttempt, TradeRecord},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Per-cycle statistics and the quotes the scanner saw
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleSummary {
    /// Cycle number, starting at 1
    pub cycle: u64,
    /// Run mode
    pub mode: Mode,
    /// Snapshot quotes ordered by instrument then venue
    pub quotes: Vec<Quote>,
    /// Fetches that produced no quote this cycle
    pub quote_failures: usize,
    /// Actionable opportunities found
    pub opportunities: usize,
    /// Trades committed
    pub trades_committed: usize,
    /// Trades aborted
    pub trades_aborted: usize,
    /// Net spread threshold in force
    pub threshold: f64,
    /// Cycle end
    pub completed_at: DateTime<Utc>,
}

/// Critical alert for a paired execution that left unhedged exposure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionAlert {
    /// The failed attempt
    pub attempt: TradeAttempt,
    /// When the alert was raised
    pub raised_at: DateTime<Utc>,
}

impl ExecutionAlert {
    /// Alert for `attempt`
    pub fn new(attempt: TradeAttempt) -> Self {
        Self {
            attempt,
            raised_at: Utc::now(),
        }
    }

    /// Legs that did not fill
    pub fn failed_legs(&self) -> Vec<(&LegIntent, &LegOutcome)> {
        self.attempt.failed_legs()
    }

    /// Legs that filled and now carry exposure
    pub fn filled_legs(&self) -> Vec<(&LegIntent, &LegOutcome)> {
        self.attempt.filled_legs()
    }
}

/// Ledger and run totals at shutdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSummary {
    /// Run mode
    pub mode: Mode,
    /// Cycles completed
    pub cycles: u64,
    /// Cycles that failed
    pub failed_cycles: u64,
    /// Starting cash
    pub initial_cash: f64,
    /// Final ledger
    pub portfolio: PortfolioSnapshot,
}

/// Everything the engine reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ReportEvent {
    /// End of a polling cycle
    CycleSummary(CycleSummary),
    /// A trade was committed
    TradeCompleted(TradeRecord),
    /// A paired execution failed
    ExecutionAlert(ExecutionAlert),
    /// Ledger after a cycle
    PortfolioSnapshot(PortfolioSnapshot),
    /// A cycle failed and will be retried after the backoff
    CycleFailed {
        /// Cycle number
        cycle: u64,
        /// Failure description
        error: String,
    },
    /// Shutdown summary
    FinalSummary(FinalSummary),
}

/// Consumer of report events; implementations must not block
pub trait ReportSink: Send + Sync {
    /// Deliver one event
    fn publish(&self, event: ReportEvent);
}

/// Forwards events to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: mpsc::UnboundedSender<ReportEvent>,
}

impl ChannelReporter {
    /// Create the reporter and the receiving end
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ReportEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ReportSink for ChannelReporter {
    fn publish(&self, event: ReportEvent) {
        if self.tx.send(event).is_err() {
            debug!("Report receiver dropped, event discarded");
        }
    }
}

/// Writes events to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl ReportSink for TracingReporter {
    fn publish(&self, event: ReportEvent) {
        match event {
            ReportEvent::CycleSummary(summary) => info!(
                cycle = summary.cycle,
                mode = %summary.mode,
                quotes = summary.quotes.len(),
                quote_failures = summary.quote_failures,
                opportunities = summary.opportunities,
                committed = summary.trades_committed,
                aborted = summary.trades_aborted,
                "Cycle complete"
            ),
            ReportEvent::TradeCompleted(record) => info!(
                trade_id = %record.id,
                instrument = %record.instrument,
                buy_venue = %record.buy_venue,
                sell_venue = %record.sell_venue,
                net_profit = record.net_profit,
                "Trade completed"
            ),
            ReportEvent::ExecutionAlert(alert) => error!(
                trade_id = %alert.attempt.id,
                instrument = %alert.attempt.instrument,
                failed_legs = alert.failed_legs().len(),
                filled_legs = alert.filled_legs().len(),
                "Execution alert"
            ),
            ReportEvent::PortfolioSnapshot(snapshot) => info!(
                cash = snapshot.cash,
                total_profit = snapshot.total_profit,
                trades = snapshot.trades_executed,
                "Portfolio"
            ),
            ReportEvent::CycleFailed { cycle, error } => warn!(cycle, %error, "Cycle failed"),
            ReportEvent::FinalSummary(summary) => info!(
                mode = %summary.mode,
                cycles = summary.cycles,
                failed_cycles = summary.failed_cycles,
                cash = summary.portfolio.cash,
                total_profit = summary.portfolio.total_profit,
                trades = summary.portfolio.trades_executed,
                "Final summary"
            ),
        }
    }
}

/// Delivers every event to several sinks in order
#[derive(Clone, Default)]
pub struct FanoutReporter {
    sinks: Vec<Arc<dyn ReportSink>>,
}

impl FanoutReporter {
    /// Fan out to `sinks`
    pub fn new(sinks: Vec<Arc<dyn ReportSink>>) -> Self {
        Self { sinks }
    }
}

impl ReportSink for FanoutReporter {
    fn publish(&self, event: ReportEvent) {
        for sink in &self.sinks {
            sink.publish(event.clone());
        }
    }
}
