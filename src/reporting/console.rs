//! Terminal status table

use crate::{
    data::{Instrument, Venue},
    reporting::{CycleSummary, ReportEvent, ReportSink},
    trading::PortfolioSnapshot,
};
use std::{
    collections::HashMap,
    fmt::Write as _,
    sync::Mutex,
    time::Duration,
};

const RULE_WIDTH: usize = 60;

/// Prints the portfolio and the latest ask prices after every cycle
pub struct ConsoleReporter {
    instruments: Vec<Instrument>,
    venues: Vec<Venue>,
    poll_interval: Duration,
    last_cycle: Mutex<Option<CycleSummary>>,
}

impl ConsoleReporter {
    /// Table rows follow `instruments` and columns follow `venues`
    pub fn new(instruments: Vec<Instrument>, venues: Vec<Venue>, poll_interval: Duration) -> Self {
        Self {
            instruments,
            venues,
            poll_interval,
            last_cycle: Mutex::new(None),
        }
    }

    /// Render the status table for a cycle and the ledger that followed it
    pub fn render(&self, summary: &CycleSummary, portfolio: &PortfolioSnapshot) -> String {
        let mut out = String::new();
        let rule = "-".repeat(RULE_WIDTH);
        let profit_sign = if portfolio.total_profit >= 0.0 { "+" } else { "" };
        let last_update = portfolio
            .last_update_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "never".to_string());

        let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
        let _ = writeln!(out, "| ARBITRAGE MONITOR  cycle {}  mode {}", summary.cycle, summary.mode);
        let _ = writeln!(out, "{}", "=".repeat(RULE_WIDTH));
        let _ = writeln!(out, "Cash:           $ {:.2}", portfolio.cash);
        let _ = writeln!(out, "Total profit:   $ {}{:.2}", profit_sign, portfolio.total_profit);
        let _ = writeln!(out, "Trades:         {}", portfolio.trades_executed);
        let _ = writeln!(out, "Last trade:     {}", last_update);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(
            out,
            "Net threshold: {}% | Interval: {:.1}s | Quote failures: {}",
            summary.threshold * 100.0,
            self.poll_interval.as_secs_f64(),
            summary.quote_failures
        );
        let _ = writeln!(out, "{}", rule);

        let _ = write!(out, "{:<10}", "Asset");
        for venue in &self.venues {
            let _ = write!(out, " {:>15}", venue.as_str());
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", rule);

        let prices: HashMap<(&Instrument, &Venue), f64> = summary
            .quotes
            .iter()
            .map(|quote| ((&quote.instrument, &quote.venue), quote.ask_price))
            .collect();

        for instrument in &self.instruments {
            let _ = write!(out, "{:<10}", instrument.base());
            for venue in &self.venues {
                match prices.get(&(instrument, venue)) {
                    Some(price) => {
                        let _ = write!(out, " {:>15.4}", price);
                    }
                    None => {
                        let _ = write!(out, " {:>15}", "-");
                    }
                }
            }
            let _ = writeln!(out);
        }

        let _ = writeln!(out, "{}", rule);
        out
    }
}

impl ReportSink for ConsoleReporter {
    fn publish(&self, event: ReportEvent) {
        let mut last_cycle = self.last_cycle.lock().unwrap_or_else(|e| e.into_inner());

        match event {
            ReportEvent::CycleSummary(summary) => *last_cycle = Some(summary),
            ReportEvent::PortfolioSnapshot(portfolio) => {
                if let Some(summary) = last_cycle.as_ref() {
                    println!("{}", self.render(summary, &portfolio));
                }
            }
            ReportEvent::TradeCompleted(record) => println!(
                "TRADE {} {}: buy {} @ {:.4}, sell {} @ {:.4}, net {:+.4}",
                record.id, record.instrument, record.buy_venue, record.buy_price,
                record.sell_venue, record.sell_price, record.net_profit
            ),
            ReportEvent::ExecutionAlert(alert) => {
                println!("!!! CRITICAL: execution {} on {} failed", alert.attempt.id, alert.attempt.instrument);
                for (leg, outcome) in alert.failed_legs() {
                    println!("    failed: {} on {} ({:?})", leg.side, leg.venue, outcome);
                }
                for (leg, _) in alert.filled_legs() {
                    println!("    UNHEDGED: {} {} on {}", leg.side, leg.amount, leg.venue);
                }
            }
            ReportEvent::CycleFailed { cycle, error } => {
                println!("Cycle {} failed: {}", cycle, error);
            }
            ReportEvent::FinalSummary(summary) => {
                println!("{}", "=".repeat(RULE_WIDTH));
                println!(
                    "Stopped after {} cycles ({} failed), mode {}",
                    summary.cycles, summary.failed_cycles, summary.mode
                );
                println!(
                    "Cash $ {:.2} (started $ {:.2}), profit $ {:.2}, trades {}",
                    summary.portfolio.cash,
                    summary.initial_cash,
                    summary.portfolio.total_profit,
                    summary.portfolio.trades_executed
                );
            }
        }
    }
}
