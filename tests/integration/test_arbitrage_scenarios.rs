//! End-to-end detection and execution scenarios over mocked venues

use super::{MockAdapter, ScriptedAdapter, TestUtils};
use std::{collections::HashMap, sync::Arc};
use venue_arbitrage::{
    connectors::{Mode, OrderSide, SimulatedVenueAdapter, VenueAdapter},
    data::{Instrument, Venue},
    reporting::ReportEvent,
    trading::TradeOutcome,
    ArbitrageError,
};

fn trading_mock(venue: &str, ask: f64) -> MockAdapter {
    let mut adapter = TestUtils::quoting_mock(venue, ask);
    let buy_id = format!("{}-buy", venue);
    let sell_id = format!("{}-sell", venue);
    adapter
        .expect_submit_market_buy()
        .returning(move |_, _| Ok(buy_id.clone()));
    adapter
        .expect_submit_market_sell()
        .returning(move |_, _| Ok(sell_id.clone()));
    adapter
}

#[tokio::test]
async fn test_profitable_spread_commits_one_trade() {
    let mut venue_a = TestUtils::quoting_mock("Exchange A", 100.0);
    venue_a
        .expect_submit_market_buy()
        .withf(|instrument, amount| instrument.as_str() == "X/USDT" && (*amount - 1.0).abs() < 1e-12)
        .times(1)
        .returning(|_, _| Ok("A-1".to_string()));
    venue_a.expect_submit_market_sell().never();

    let mut venue_b = TestUtils::quoting_mock("Exchange B", 102.0);
    venue_b
        .expect_submit_market_sell()
        .withf(|instrument, amount| instrument.as_str() == "X/USDT" && (*amount - 1.0).abs() < 1e-12)
        .times(1)
        .returning(|_, _| Ok("B-1".to_string()));
    venue_b.expect_submit_market_buy().never();

    let (engine, mut rx) = TestUtils::engine(
        TestUtils::create_test_config(),
        Mode::Live,
        vec![Arc::new(venue_a), Arc::new(venue_b)],
    );

    let report = engine.run_cycle(1).await.unwrap();
    assert_eq!(report.quote_failures, 0);
    assert_eq!(report.opportunities.len(), 1);
    assert_eq!(report.committed(), 1);

    let opportunity = &report.opportunities[0];
    assert_eq!(opportunity.buy_venue, Venue::new("Exchange A"));
    assert_eq!(opportunity.sell_venue, Venue::new("Exchange B"));
    assert!((opportunity.net_profit - 1.798).abs() < 1e-9);
    assert!((opportunity.net_spread - 0.01798).abs() < 1e-9);

    let TradeOutcome::Committed(record) = &report.outcomes[0] else {
        panic!("expected a committed trade");
    };
    assert_eq!(record.buy_order_id.as_deref(), Some("A-1"));
    assert_eq!(record.sell_order_id.as_deref(), Some("B-1"));
    assert!((record.amount - 1.0).abs() < 1e-12);

    let ledger = engine.portfolio().snapshot().await;
    assert_eq!(ledger.trades_executed, 1);
    assert!((ledger.total_profit - 1.798).abs() < 1e-9);
    assert!((ledger.cash - 101.798).abs() < 1e-9);
    assert!(ledger.last_update_time.is_some());

    let events = TestUtils::drain(&mut rx);
    assert!(events.iter().any(|event| matches!(event, ReportEvent::TradeCompleted(_))));
    assert!(events.iter().any(|event| matches!(
        event,
        ReportEvent::CycleSummary(summary) if summary.trades_committed == 1 && summary.quotes.len() == 2
    )));
}

#[tokio::test]
async fn test_spread_below_threshold_is_ignored() {
    let mut config = TestUtils::create_test_config();
    config.strategy.threshold = 0.02;

    let mut venue_a = TestUtils::quoting_mock("Exchange A", 100.0);
    venue_a.expect_submit_market_buy().never();
    venue_a.expect_submit_market_sell().never();
    let mut venue_b = TestUtils::quoting_mock("Exchange B", 102.0);
    venue_b.expect_submit_market_buy().never();
    venue_b.expect_submit_market_sell().never();

    let (engine, _rx) = TestUtils::engine(config, Mode::Live, vec![Arc::new(venue_a), Arc::new(venue_b)]);

    let report = engine.run_cycle(1).await.unwrap();
    assert!(report.opportunities.is_empty());
    assert!(report.outcomes.is_empty());

    let ledger = engine.portfolio().snapshot().await;
    assert_eq!(ledger.trades_executed, 0);
    assert_eq!(ledger.cash, 100.0);
    assert!(ledger.last_update_time.is_none());
}

#[tokio::test]
async fn test_failed_sell_leg_aborts_and_alerts() {
    let mut venue_a = TestUtils::quoting_mock("Exchange A", 100.0);
    venue_a
        .expect_submit_market_buy()
        .times(1)
        .returning(|_, _| Ok("A-1".to_string()));

    let mut venue_b = TestUtils::quoting_mock("Exchange B", 102.0);
    venue_b.expect_submit_market_sell().times(1).returning(|_, _| {
        Err(ArbitrageError::OrderFailed {
            venue: "Exchange B".to_string(),
            side: "SELL".to_string(),
            reason: "insufficient balance".to_string(),
        }
        .into())
    });

    let (engine, mut rx) = TestUtils::engine(
        TestUtils::create_test_config(),
        Mode::Live,
        vec![Arc::new(venue_a), Arc::new(venue_b)],
    );

    let report = engine.run_cycle(1).await.unwrap();
    assert_eq!(report.committed(), 0);
    assert_eq!(report.aborted(), 1);

    let ledger = engine.portfolio().snapshot().await;
    assert_eq!(ledger.cash, 100.0);
    assert_eq!(ledger.total_profit, 0.0);
    assert_eq!(ledger.trades_executed, 0);

    let alert = TestUtils::drain(&mut rx)
        .into_iter()
        .find_map(|event| match event {
            ReportEvent::ExecutionAlert(alert) => Some(alert),
            _ => None,
        })
        .expect("execution alert");

    let failed = alert.failed_legs();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].0.side, OrderSide::Sell);
    assert_eq!(failed[0].0.venue, Venue::new("Exchange B"));

    let filled = alert.filled_legs();
    assert_eq!(filled.len(), 1);
    assert_eq!(filled[0].0.side, OrderSide::Buy);
    assert_eq!(filled[0].1.order_id(), Some("A-1"));
}

#[tokio::test]
async fn test_slow_order_leg_times_out() {
    let mut config = TestUtils::create_test_config();
    config.execution.order_timeout_ms = 20;

    let mut venue_a = TestUtils::quoting_mock("Exchange A", 100.0);
    venue_a
        .expect_submit_market_buy()
        .returning(|_, _| Ok("A-1".to_string()));

    // Sell leg never completes within the order timeout
    let venue_b = Arc::new(ScriptedAdapter::new("Exchange B", vec![Some(102.0)]));
    let slow_b: Arc<dyn VenueAdapter> = Arc::new(SlowSeller(venue_b));

    let (engine, _rx) = TestUtils::engine(config, Mode::Live, vec![Arc::new(venue_a), slow_b]);

    let report = engine.run_cycle(1).await.unwrap();
    let TradeOutcome::Aborted(attempt) = &report.outcomes[0] else {
        panic!("expected an aborted trade");
    };
    assert!(attempt.buy_outcome.is_filled());
    assert!(!attempt.sell_outcome.is_filled());
    assert_eq!(engine.portfolio().snapshot().await.trades_executed, 0);
}

struct SlowSeller(Arc<ScriptedAdapter>);

#[async_trait::async_trait]
impl VenueAdapter for SlowSeller {
    fn venue(&self) -> &Venue {
        self.0.venue()
    }

    async fn fetch_ask(&self, instrument: &Instrument) -> venue_arbitrage::Result<f64> {
        self.0.fetch_ask(instrument).await
    }

    async fn submit_market_buy(&self, instrument: &Instrument, amount: f64) -> venue_arbitrage::Result<String> {
        self.0.submit_market_buy(instrument, amount).await
    }

    async fn submit_market_sell(&self, _instrument: &Instrument, _amount: f64) -> venue_arbitrage::Result<String> {
        tokio::time::sleep(std::time::Duration::from_secs(5)).await;
        Ok("late".to_string())
    }

    async fn close(&self) -> venue_arbitrage::Result<()> {
        self.0.close().await
    }
}

#[tokio::test]
async fn test_simulated_walk_stays_bounded() {
    let instrument = Instrument::new("X/USDT");
    let mut base_prices = HashMap::new();
    base_prices.insert(instrument.clone(), 0.0102);

    let adapter = SimulatedVenueAdapter::new(Venue::new("Exchange A"), base_prices, 0.005, 0.01, Some(42));

    let mut previous = 0.0102;
    for _ in 0..500 {
        let price = adapter.fetch_ask(&instrument).await.unwrap();
        assert!(price >= 0.01);
        assert!(price <= previous * 1.005 + 1e-15);
        assert!(price >= (previous * 0.995).max(0.01) - 1e-15);
        previous = price;
    }
    assert_eq!(adapter.last_price(&instrument).await, Some(previous));
}

#[tokio::test]
async fn test_simulated_run_keeps_ledger_consistent() {
    let mut config = TestUtils::create_test_config();
    config.strategy.instruments = vec!["BTC/USDT".to_string(), "ETH/USDT".to_string()];
    config.simulation.seed = Some(3);
    config.simulation.volatility = 0.02;
    config.strategy.threshold = 0.0;
    config.execution.max_cycles = Some(20);

    let venues = venue_arbitrage::VenueSet::simulated(&config).unwrap();
    let (reporter, mut rx) = venue_arbitrage::reporting::ChannelReporter::new();
    let engine = venue_arbitrage::ArbitrageEngine::new(config, venues, Arc::new(reporter)).unwrap();

    let summary = engine.run(std::future::pending()).await.unwrap();
    assert_eq!(summary.mode, Mode::Simulated);
    assert_eq!(summary.cycles, 20);

    let mut committed_profit = 0.0;
    let mut committed = 0u64;
    for event in TestUtils::drain(&mut rx) {
        if let ReportEvent::TradeCompleted(record) = event {
            assert!(record.net_profit > 0.0);
            assert!(record.buy_order_id.is_none() && record.sell_order_id.is_none());
            committed_profit += record.net_profit;
            committed += 1;
        }
    }

    let ledger = summary.portfolio;
    assert_eq!(ledger.trades_executed, committed);
    assert!((ledger.total_profit - committed_profit).abs() < 1e-9);
    assert!((ledger.cash - (summary.initial_cash + ledger.total_profit)).abs() < 1e-9);
    assert!(committed > 0);
}

#[tokio::test]
async fn test_every_venue_pair_is_scanned() {
    let (engine, _rx) = TestUtils::engine(
        TestUtils::create_test_config(),
        Mode::Live,
        vec![
            Arc::new(trading_mock("Exchange A", 100.0)),
            Arc::new(trading_mock("Exchange B", 101.0)),
            Arc::new(trading_mock("Exchange C", 102.0)),
        ],
    );

    let report = engine.run_cycle(1).await.unwrap();
    let pairs: Vec<(&str, &str)> = report
        .opportunities
        .iter()
        .map(|o| (o.buy_venue.as_str(), o.sell_venue.as_str()))
        .collect();

    assert_eq!(
        pairs,
        vec![("Exchange A", "Exchange B"), ("Exchange A", "Exchange C"), ("Exchange B", "Exchange C")]
    );
    assert_eq!(report.committed(), 3);
    assert_eq!(engine.portfolio().snapshot().await.trades_executed, 3);
}

/// Venue whose orders only complete once every expected leg is in flight
struct GatedVenue {
    venue: Venue,
    asks: HashMap<Instrument, f64>,
    gate: Arc<tokio::sync::Barrier>,
}

impl GatedVenue {
    fn new(venue: &str, asks: &[(&str, f64)], gate: Arc<tokio::sync::Barrier>) -> Self {
        Self {
            venue: Venue::new(venue),
            asks: asks.iter().map(|(symbol, ask)| (Instrument::new(*symbol), *ask)).collect(),
            gate,
        }
    }
}

#[async_trait::async_trait]
impl VenueAdapter for GatedVenue {
    fn venue(&self) -> &Venue {
        &self.venue
    }

    async fn fetch_ask(&self, instrument: &Instrument) -> venue_arbitrage::Result<f64> {
        self.asks
            .get(instrument)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no ask for {}", instrument))
    }

    async fn submit_market_buy(&self, instrument: &Instrument, _amount: f64) -> venue_arbitrage::Result<String> {
        self.gate.wait().await;
        Ok(format!("{}-buy-{}", self.venue, instrument))
    }

    async fn submit_market_sell(&self, instrument: &Instrument, _amount: f64) -> venue_arbitrage::Result<String> {
        self.gate.wait().await;
        Ok(format!("{}-sell-{}", self.venue, instrument))
    }

    async fn close(&self) -> venue_arbitrage::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_both_legs_are_in_flight_together() {
    let mut config = TestUtils::create_test_config();
    config.execution.order_timeout_ms = 500;

    let gate = Arc::new(tokio::sync::Barrier::new(2));
    let venue_a = GatedVenue::new("Exchange A", &[("X/USDT", 100.0)], gate.clone());
    let venue_b = GatedVenue::new("Exchange B", &[("X/USDT", 102.0)], gate);

    let (engine, _rx) = TestUtils::engine(config, Mode::Live, vec![Arc::new(venue_a), Arc::new(venue_b)]);

    let report = engine.run_cycle(1).await.unwrap();
    assert_eq!(report.opportunities.len(), 1);
    assert_eq!(report.committed(), 1, "legs were not submitted concurrently");
    assert_eq!(engine.portfolio().snapshot().await.trades_executed, 1);
}

#[tokio::test]
async fn test_opportunities_in_a_cycle_execute_concurrently() {
    let mut config = TestUtils::create_test_config();
    config.strategy.instruments = vec!["X/USDT".to_string(), "Y/USDT".to_string()];
    config.execution.order_timeout_ms = 500;

    // Two opportunities with two legs each
    let gate = Arc::new(tokio::sync::Barrier::new(4));
    let venue_a = GatedVenue::new("Exchange A", &[("X/USDT", 100.0), ("Y/USDT", 50.0)], gate.clone());
    let venue_b = GatedVenue::new("Exchange B", &[("X/USDT", 102.0), ("Y/USDT", 51.0)], gate);

    let (engine, _rx) = TestUtils::engine(config, Mode::Live, vec![Arc::new(venue_a), Arc::new(venue_b)]);

    let report = engine.run_cycle(1).await.unwrap();
    assert_eq!(report.opportunities.len(), 2);
    assert_eq!(report.committed(), 2, "opportunities were not executed concurrently");

    let ledger = engine.portfolio().snapshot().await;
    assert_eq!(ledger.trades_executed, 2);
    assert!((ledger.total_profit - 2.0 * 1.798).abs() < 1e-9);
}
