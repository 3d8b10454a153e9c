//! Integration tests for the multi-venue arbitrage engine

pub mod test_arbitrage_scenarios;
pub mod test_engine_lifecycle;

use async_trait::async_trait;
use mockall::mock;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};
use venue_arbitrage::{
    config::ArbitrageConfig,
    connectors::{Mode, VenueAdapter, VenueSet},
    data::{Instrument, Venue},
    reporting::{ChannelReporter, ReportEvent},
    strategy::ArbitrageEngine,
    ArbitrageError, Result,
};

mock! {
    pub Adapter {}

    #[async_trait]
    impl VenueAdapter for Adapter {
        fn venue(&self) -> &Venue;
        async fn fetch_ask(&self, instrument: &Instrument) -> Result<f64>;
        async fn submit_market_buy(&self, instrument: &Instrument, amount: f64) -> Result<String>;
        async fn submit_market_sell(&self, instrument: &Instrument, amount: f64) -> Result<String>;
        async fn close(&self) -> Result<()>;
    }
}

/// Test utilities for integration tests
pub struct TestUtils;

impl TestUtils {
    /// Single-instrument configuration with fast cycles
    pub fn create_test_config() -> ArbitrageConfig {
        let mut config = ArbitrageConfig::default();
        config.strategy.instruments = vec!["X/USDT".to_string()];
        config.strategy.trade_size = 100.0;
        config.strategy.fee_rate = 0.001;
        config.strategy.threshold = 0.005;
        config.strategy.initial_cash = 100.0;
        config.execution.poll_interval_ms = 5;
        config.execution.cycle_backoff_ms = 5;
        config.execution.fetch_timeout_ms = 200;
        config.execution.order_timeout_ms = 200;
        config
    }

    /// Mock adapter quoting a fixed ask and accepting `close` any number of times
    pub fn quoting_mock(venue: &str, ask: f64) -> MockAdapter {
        let mut adapter = MockAdapter::new();
        adapter.expect_venue().return_const(Venue::new(venue));
        adapter.expect_fetch_ask().returning(move |_| Ok(ask));
        adapter.expect_close().returning(|| Ok(()));
        adapter
    }

    /// Build an engine over prebuilt adapters
    pub fn engine(
        config: ArbitrageConfig,
        mode: Mode,
        adapters: Vec<Arc<dyn VenueAdapter>>,
    ) -> (ArbitrageEngine, tokio::sync::mpsc::UnboundedReceiver<ReportEvent>) {
        let venues = VenueSet::new(mode, adapters).expect("venue set");
        let (reporter, rx) = ChannelReporter::new();
        let engine = ArbitrageEngine::new(config, venues, Arc::new(reporter)).expect("engine");
        (engine, rx)
    }

    /// Drain every event published so far
    pub fn drain(rx: &mut tokio::sync::mpsc::UnboundedReceiver<ReportEvent>) -> Vec<ReportEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Adapter that replays a script of asks (`None` = failure); the last entry repeats
pub struct ScriptedAdapter {
    venue: Venue,
    script: Mutex<VecDeque<Option<f64>>>,
    delay: Duration,
    panic_on_first_fetch: AtomicBool,
    /// Number of `close` calls
    pub close_calls: AtomicUsize,
    /// Number of `fetch_ask` calls
    pub fetch_calls: AtomicUsize,
}

impl ScriptedAdapter {
    pub fn new(venue: &str, script: Vec<Option<f64>>) -> Self {
        Self {
            venue: Venue::new(venue),
            script: Mutex::new(script.into()),
            delay: Duration::ZERO,
            panic_on_first_fetch: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
        }
    }

    /// Delay every fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Panic inside the first fetch
    pub fn panicking_once(self) -> Self {
        self.panic_on_first_fetch.store(true, Ordering::SeqCst);
        self
    }

    fn next_ask(&self) -> Option<f64> {
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.pop_front().flatten()
        } else {
            script.front().copied().flatten()
        }
    }
}

#[async_trait]
impl VenueAdapter for ScriptedAdapter {
    fn venue(&self) -> &Venue {
        &self.venue
    }

    async fn fetch_ask(&self, instrument: &Instrument) -> Result<f64> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_first_fetch.swap(false, Ordering::SeqCst) {
            panic!("scripted adapter failure");
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.next_ask().ok_or_else(|| {
            ArbitrageError::QuoteUnavailable {
                venue: self.venue.to_string(),
                instrument: instrument.to_string(),
                reason: "scripted failure".to_string(),
            }
            .into()
        })
    }

    async fn submit_market_buy(&self, _instrument: &Instrument, _amount: f64) -> Result<String> {
        Ok(format!("{}-buy", self.venue))
    }

    async fn submit_market_sell(&self, _instrument: &Instrument, _amount: f64) -> Result<String> {
        Ok(format!("{}-sell", self.venue))
    }

    async fn close(&self) -> Result<()> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_test_config() {
        let config = TestUtils::create_test_config();
        assert_eq!(config.instruments(), vec![Instrument::new("X/USDT")]);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_scripted_adapter_replays() {
        let adapter = ScriptedAdapter::new("Exchange A", vec![Some(1.0), None, Some(2.0)]);
        let instrument = Instrument::new("X/USDT");

        assert_eq!(adapter.fetch_ask(&instrument).await.unwrap(), 1.0);
        assert!(adapter.fetch_ask(&instrument).await.is_err());
        assert_eq!(adapter.fetch_ask(&instrument).await.unwrap(), 2.0);
        assert_eq!(adapter.fetch_ask(&instrument).await.unwrap(), 2.0);
        assert_eq!(adapter.fetch_calls.load(Ordering::SeqCst), 4);
    }
}
