//! Polling cycle driver: fetch, snapshot, scan, execute, report

use crate::{
    config::ArbitrageConfig,
    connectors::VenueSet,
    data::{PriceBoard, Quote},
    reporting::{CycleSummary, FinalSummary, ReportEvent, ReportSink},
    strategy::{Opportunity, SpreadScanner},
    trading::{Portfolio, TradeExecutor, TradeOutcome},
    utils::metrics,
    ArbitrageError, Result,
};
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::{future::Future, sync::Arc};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyState {
    /// Not running
    Stopped,
    /// Running cycles
    Running,
    /// Finishing the current cycle before stopping
    ShuttingDown,
}

/// Counters over the lifetime of the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyStatistics {
    /// Cycles that ran to completion
    pub cycles_completed: u64,
    /// Cycles that failed
    pub cycles_failed: u64,
    /// Fetches that produced no quote
    pub quote_failures: u64,
    /// Actionable opportunities detected
    pub opportunities_detected: u64,
    /// Trades committed
    pub trades_committed: u64,
    /// Trades aborted after a leg failure
    pub trades_aborted: u64,
    /// Opportunities the executor declined
    pub trades_skipped: u64,
    /// Seconds since the engine was created
    pub uptime_seconds: u64,
    /// Time of the last committed trade
    pub last_execution: Option<DateTime<Utc>>,
}

/// What one cycle did
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// Cycle number
    pub cycle: u64,
    /// Fetches that produced no quote
    pub quote_failures: usize,
    /// Opportunities found by the scanner
    pub opportunities: Vec<Opportunity>,
    /// Execution result per opportunity, same order
    pub outcomes: Vec<TradeOutcome>,
}

impl CycleReport {
    fn count(&self, predicate: impl Fn(&TradeOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|outcome| predicate(outcome)).count()
    }

    /// Number of committed trades
    pub fn committed(&self) -> usize {
        self.count(|outcome| matches!(outcome, TradeOutcome::Committed(_)))
    }

    /// Number of aborted trades
    pub fn aborted(&self) -> usize {
        self.count(|outcome| matches!(outcome, TradeOutcome::Aborted(_)))
    }

    /// Number of skipped opportunities
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, TradeOutcome::Skipped { .. }))
    }
}

/// Multi-venue arbitrage engine
pub struct ArbitrageEngine {
    config: ArbitrageConfig,
    venues: Arc<VenueSet>,
    board: PriceBoard,
    scanner: SpreadScanner,
    executor: TradeExecutor,
    portfolio: Arc<Portfolio>,
    sink: Arc<dyn ReportSink>,
    state: Arc<RwLock<StrategyState>>,
    statistics: Arc<RwLock<StrategyStatistics>>,
    start_time: std::time::Instant,
}

impl ArbitrageEngine {
    /// Create an engine over an already selected venue set
    pub fn new(config: ArbitrageConfig, venues: VenueSet, sink: Arc<dyn ReportSink>) -> Result<Self> {
        config.validate()?;

        let venues = Arc::new(venues);
        let portfolio = Arc::new(Portfolio::new(config.strategy.initial_cash));
        let scanner = SpreadScanner::from_config(&config, venues.venues());
        let executor = TradeExecutor::from_config(&config, Arc::clone(&venues), Arc::clone(&portfolio), Arc::clone(&sink));

        info!(
            mode = %venues.mode(),
            venues = venues.len(),
            instruments = config.strategy.instruments.len(),
            threshold = config.strategy.threshold,
            "Arbitrage engine created"
        );

        Ok(Self {
            config,
            venues,
            board: PriceBoard::new(),
            scanner,
            executor,
            portfolio,
            sink,
            state: Arc::new(RwLock::new(StrategyState::Stopped)),
            statistics: Arc::new(RwLock::new(StrategyStatistics::default())),
            start_time: std::time::Instant::now(),
        })
    }

    /// Run cycles until `shutdown` resolves, the cycle limit is reached or [`stop`](Self::stop) is called.
    ///
    /// The signal is only observed between cycles. Adapters are closed and a final
    /// summary is published on every exit path.
    pub async fn run<F>(&self, shutdown: F) -> Result<FinalSummary>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        info!(mode = %self.venues.mode(), max_cycles = ?self.config.execution.max_cycles, "Starting arbitrage engine");
        *self.state.write().await = StrategyState::Running;

        let mut cycle = 0u64;
        loop {
            if !self.is_running().await {
                info!("Engine stop requested");
                break;
            }

            cycle += 1;
            let delay = match self.run_cycle(cycle).await {
                Ok(_) => self.config.poll_interval(),
                Err(e) => {
                    self.record_failed_cycle(cycle, &e).await;
                    self.config.cycle_backoff()
                }
            };

            if self.config.execution.max_cycles.is_some_and(|max| cycle >= max) {
                info!(cycle, "Cycle limit reached");
                break;
            }

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        Ok(self.shutdown().await)
    }

    /// One full cycle: poll every key, snapshot, scan, execute, report
    pub async fn run_cycle(&self, cycle: u64) -> Result<CycleReport> {
        debug!(cycle, "Cycle start");

        let quote_failures = self.poll_prices().await?;
        let snapshot = self.board.snapshot();
        let opportunities = self.scanner.scan(&snapshot);

        if !opportunities.is_empty() {
            info!(cycle, count = opportunities.len(), "Detected arbitrage opportunities");
        }

        let outcomes = join_all(opportunities.iter().map(|opportunity| self.executor.execute(opportunity))).await;

        let report = CycleReport {
            cycle,
            quote_failures,
            opportunities,
            outcomes,
        };
        self.record_cycle(&report).await;

        self.sink.publish(ReportEvent::CycleSummary(CycleSummary {
            cycle,
            mode: self.venues.mode(),
            quotes: snapshot.quotes().into_iter().cloned().collect(),
            quote_failures,
            opportunities: report.opportunities.len(),
            trades_committed: report.committed(),
            trades_aborted: report.aborted(),
            threshold: self.scanner.threshold(),
            completed_at: Utc::now(),
        }));
        self.sink.publish(ReportEvent::PortfolioSnapshot(self.portfolio.snapshot().await));

        Ok(report)
    }

    /// Fetch every (instrument, venue) ask concurrently and install the results.
    ///
    /// Returns the number of fetches that produced no quote. Fails only when a
    /// fetch task itself dies.
    pub async fn poll_prices(&self) -> Result<usize> {
        let timeout = self.config.fetch_timeout();
        let mut handles = Vec::new();

        for instrument in self.config.instruments() {
            for adapter in self.venues.adapters() {
                let adapter = Arc::clone(adapter);
                let instrument = instrument.clone();

                handles.push(tokio::spawn(async move {
                    let venue = adapter.venue().clone();
                    let result = match tokio::time::timeout(timeout, adapter.fetch_ask(&instrument)).await {
                        Ok(result) => result,
                        Err(_) => Err(ArbitrageError::QuoteUnavailable {
                            venue: venue.to_string(),
                            instrument: instrument.to_string(),
                            reason: format!("no response within {:?}", timeout),
                        }
                        .into()),
                    };
                    result.and_then(|price| Quote::observed_now(instrument, venue, price))
                }));
            }
        }

        let mut failures = 0;
        let mut crashed = None;
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(quote)) => {
                    self.board.update(quote);
                }
                Ok(Err(e)) => {
                    failures += 1;
                    debug!(error = %e, "Quote unavailable");
                }
                Err(e) => {
                    crashed.get_or_insert(e);
                }
            }
        }

        // Quotes from healthy fetches are kept even when the cycle fails
        if let Some(e) = crashed {
            return Err(ArbitrageError::CycleFailure(format!("Price fetch task failed: {}", e)).into());
        }

        Ok(failures)
    }

    async fn record_cycle(&self, report: &CycleReport) {
        metrics::record_cycle(report.quote_failures, report.opportunities.len());

        let mut stats = self.statistics.write().await;
        stats.cycles_completed += 1;
        stats.quote_failures += report.quote_failures as u64;
        stats.opportunities_detected += report.opportunities.len() as u64;
        stats.trades_committed += report.committed() as u64;
        stats.trades_aborted += report.aborted() as u64;
        stats.trades_skipped += report.skipped() as u64;
        stats.uptime_seconds = self.start_time.elapsed().as_secs();

        if let Some(executed_at) = report
            .outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                TradeOutcome::Committed(record) => Some(record.executed_at),
                _ => None,
            })
            .max()
        {
            stats.last_execution = Some(executed_at);
        }
    }

    async fn record_failed_cycle(&self, cycle: u64, e: &anyhow::Error) {
        error!(cycle, error = %e, backoff = ?self.config.cycle_backoff(), "Cycle failed, backing off");
        metrics::record_cycle_failure();

        {
            let mut stats = self.statistics.write().await;
            stats.cycles_failed += 1;
            stats.uptime_seconds = self.start_time.elapsed().as_secs();
        }

        self.sink.publish(ReportEvent::CycleFailed {
            cycle,
            error: e.to_string(),
        });
    }

    async fn shutdown(&self) -> FinalSummary {
        *self.state.write().await = StrategyState::ShuttingDown;
        self.venues.close_all().await;

        let stats = self.get_statistics().await;
        let summary = FinalSummary {
            mode: self.venues.mode(),
            cycles: stats.cycles_completed,
            failed_cycles: stats.cycles_failed,
            initial_cash: self.portfolio.initial_cash(),
            portfolio: self.portfolio.snapshot().await,
        };
        self.sink.publish(ReportEvent::FinalSummary(summary.clone()));

        *self.state.write().await = StrategyState::Stopped;
        info!(
            cycles = summary.cycles,
            trades = summary.portfolio.trades_executed,
            total_profit = summary.portfolio.total_profit,
            "Arbitrage engine stopped"
        );

        summary
    }

    async fn is_running(&self) -> bool {
        matches!(*self.state.read().await, StrategyState::Running)
    }

    /// Ask the engine to stop after the current cycle
    pub async fn stop(&self) {
        let mut state = self.state.write().await;
        if *state == StrategyState::Running {
            *state = StrategyState::ShuttingDown;
            warn!("Stop requested, finishing current cycle");
        }
    }

    /// Current lifecycle state
    pub async fn get_state(&self) -> StrategyState {
        *self.state.read().await
    }

    /// Lifetime counters
    pub async fn get_statistics(&self) -> StrategyStatistics {
        let mut stats = self.statistics.read().await.clone();
        stats.uptime_seconds = self.start_time.elapsed().as_secs();
        stats
    }

    /// Shared ledger
    pub fn portfolio(&self) -> &Arc<Portfolio> {
        &self.portfolio
    }

    /// Latest quotes
    pub fn board(&self) -> &PriceBoard {
        &self.board
    }

    /// Venues in use
    pub fn venues(&self) -> &Arc<VenueSet> {
        &self.venues
    }
}
