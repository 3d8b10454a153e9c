//! Metrics recording and the optional Prometheus exporter

use crate::{ArbitrageError, Result};
use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::info;

/// Completed polling cycles
pub const CYCLES_TOTAL: &str = "arbitrage_cycles_total";
/// Polling cycles that failed as a whole
pub const CYCLE_FAILURES_TOTAL: &str = "arbitrage_cycle_failures_total";
/// Ask fetches that returned no quote
pub const QUOTE_FAILURES_TOTAL: &str = "arbitrage_quote_failures_total";
/// Actionable opportunities detected
pub const OPPORTUNITIES_TOTAL: &str = "arbitrage_opportunities_total";
/// Trades committed to the portfolio
pub const TRADES_COMMITTED_TOTAL: &str = "arbitrage_trades_committed_total";
/// Trades aborted because a leg failed
pub const TRADES_ABORTED_TOTAL: &str = "arbitrage_trades_aborted_total";
/// Portfolio cash
pub const PORTFOLIO_CASH: &str = "arbitrage_portfolio_cash";
/// Portfolio cumulative profit
pub const PORTFOLIO_TOTAL_PROFIT: &str = "arbitrage_portfolio_total_profit";

/// Install the Prometheus exporter on `listen_addr`; must be called inside a tokio runtime
pub fn init_metrics(listen_addr: &str) -> Result<()> {
    let addr: SocketAddr = listen_addr
        .parse()
        .map_err(|e| ArbitrageError::Config(format!("Invalid metrics listen address '{}': {}", listen_addr, e)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| ArbitrageError::Config(format!("Failed to install metrics exporter: {}", e)))?;

    describe_metrics();
    info!(%addr, "Prometheus exporter listening");
    Ok(())
}

fn describe_metrics() {
    describe_counter!(CYCLES_TOTAL, "Completed polling cycles");
    describe_counter!(CYCLE_FAILURES_TOTAL, "Polling cycles that failed");
    describe_counter!(QUOTE_FAILURES_TOTAL, "Ask fetches without a quote");
    describe_counter!(OPPORTUNITIES_TOTAL, "Actionable opportunities detected");
    describe_counter!(TRADES_COMMITTED_TOTAL, "Trades committed");
    describe_counter!(TRADES_ABORTED_TOTAL, "Trades aborted after a leg failure");
    describe_gauge!(PORTFOLIO_CASH, Unit::Count, "Portfolio cash in quote currency");
    describe_gauge!(PORTFOLIO_TOTAL_PROFIT, Unit::Count, "Cumulative net profit in quote currency");
}

/// Record one finished cycle
pub fn record_cycle(quote_failures: usize, opportunities: usize) {
    counter!(CYCLES_TOTAL, 1);
    counter!(QUOTE_FAILURES_TOTAL, quote_failures as u64);
    counter!(OPPORTUNITIES_TOTAL, opportunities as u64);
}

/// Record a failed cycle
pub fn record_cycle_failure() {
    counter!(CYCLE_FAILURES_TOTAL, 1);
}

/// Record a committed trade and the resulting ledger
pub fn record_trade_committed(cash: f64, total_profit: f64) {
    counter!(TRADES_COMMITTED_TOTAL, 1);
    gauge!(PORTFOLIO_CASH, cash);
    gauge!(PORTFOLIO_TOTAL_PROFIT, total_profit);
}

/// Record an aborted trade
pub fn record_trade_aborted() {
    counter!(TRADES_ABORTED_TOTAL, 1);
}
