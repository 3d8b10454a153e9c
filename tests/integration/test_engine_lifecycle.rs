//! Engine lifecycle: cycle limits, failures, timeouts and shutdown

use super::{ScriptedAdapter, TestUtils};
use std::{
    sync::{atomic::Ordering, Arc},
    time::Duration,
};
use venue_arbitrage::{
    connectors::{Mode, VenueAdapter},
    data::{Instrument, Venue},
    reporting::ReportEvent,
    strategy::StrategyState,
};

fn scripted_pair(a: ScriptedAdapter, b: ScriptedAdapter) -> (Arc<ScriptedAdapter>, Arc<ScriptedAdapter>, Vec<Arc<dyn VenueAdapter>>) {
    let a = Arc::new(a);
    let b = Arc::new(b);
    let adapters: Vec<Arc<dyn VenueAdapter>> = vec![a.clone(), b.clone()];
    (a, b, adapters)
}

#[tokio::test]
async fn test_cycle_limit_closes_every_adapter_once() {
    let mut config = TestUtils::create_test_config();
    config.execution.max_cycles = Some(3);

    let (a, b, adapters) = scripted_pair(
        ScriptedAdapter::new("Exchange A", vec![Some(100.0)]),
        ScriptedAdapter::new("Exchange B", vec![Some(100.1)]),
    );
    let (engine, mut rx) = TestUtils::engine(config, Mode::Simulated, adapters);

    let summary = engine.run(std::future::pending()).await.unwrap();
    assert_eq!(summary.cycles, 3);
    assert_eq!(summary.failed_cycles, 0);
    assert_eq!(summary.portfolio.trades_executed, 0);

    assert_eq!(a.fetch_calls.load(Ordering::SeqCst), 3);
    assert_eq!(a.close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b.close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.get_state().await, StrategyState::Stopped);

    let events = TestUtils::drain(&mut rx);
    let summaries = events
        .iter()
        .filter(|event| matches!(event, ReportEvent::CycleSummary(_)))
        .count();
    assert_eq!(summaries, 3);
    assert!(matches!(events.last(), Some(ReportEvent::FinalSummary(_))));
}

#[tokio::test]
async fn test_crashed_fetch_fails_cycle_then_recovers() {
    let mut config = TestUtils::create_test_config();
    config.execution.max_cycles = Some(3);

    let (a, _b, adapters) = scripted_pair(
        ScriptedAdapter::new("Exchange A", vec![Some(100.0)]).panicking_once(),
        ScriptedAdapter::new("Exchange B", vec![Some(102.0)]),
    );
    let (engine, mut rx) = TestUtils::engine(config, Mode::Simulated, adapters);

    let summary = engine.run(std::future::pending()).await.unwrap();
    assert_eq!(summary.failed_cycles, 1);
    assert_eq!(summary.cycles, 2);
    assert_eq!(a.close_calls.load(Ordering::SeqCst), 1);

    let events = TestUtils::drain(&mut rx);
    let failed: Vec<u64> = events
        .iter()
        .filter_map(|event| match event {
            ReportEvent::CycleFailed { cycle, error } => {
                assert!(error.contains("Price fetch task failed"));
                Some(*cycle)
            }
            _ => None,
        })
        .collect();
    assert_eq!(failed, vec![1]);

    // Cycles 2 and 3 traded the A/B spread in simulation
    assert_eq!(summary.portfolio.trades_executed, 2);

    let stats = engine.get_statistics().await;
    assert_eq!(stats.cycles_failed, 1);
    assert_eq!(stats.cycles_completed, 2);
    assert_eq!(stats.trades_committed, 2);
}

#[tokio::test]
async fn test_slow_venue_counts_as_quote_failure() {
    let mut config = TestUtils::create_test_config();
    config.execution.fetch_timeout_ms = 50;

    let (_a, _b, adapters) = scripted_pair(
        ScriptedAdapter::new("Exchange A", vec![Some(100.0)]),
        ScriptedAdapter::new("Exchange B", vec![Some(102.0)]).with_delay(Duration::from_secs(2)),
    );
    let (engine, _rx) = TestUtils::engine(config, Mode::Simulated, adapters);

    let started = std::time::Instant::now();
    let report = engine.run_cycle(1).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    assert_eq!(report.quote_failures, 1);
    assert!(report.opportunities.is_empty());
    assert_eq!(engine.board().len(), 1);
    assert!(engine
        .board()
        .get(&Instrument::new("X/USDT"), &Venue::new("Exchange B"))
        .is_none());
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_quote() {
    let instrument = Instrument::new("X/USDT");
    let venue_b = Venue::new("Exchange B");

    let (_a, _b, adapters) = scripted_pair(
        ScriptedAdapter::new("Exchange A", vec![Some(100.0), Some(100.0)]),
        ScriptedAdapter::new("Exchange B", vec![Some(100.05), None]),
    );
    let (engine, _rx) = TestUtils::engine(TestUtils::create_test_config(), Mode::Simulated, adapters);

    let first = engine.run_cycle(1).await.unwrap();
    assert_eq!(first.quote_failures, 0);
    let before = engine.board().get(&instrument, &venue_b).unwrap();

    let second = engine.run_cycle(2).await.unwrap();
    assert_eq!(second.quote_failures, 1);
    let after = engine.board().get(&instrument, &venue_b).unwrap();

    assert_eq!(after.ask_price, 100.05);
    assert_eq!(after.observed_at, before.observed_at);
    assert_eq!(engine.board().len(), 2);
}

#[tokio::test]
async fn test_stop_ends_run_after_current_cycle() {
    let (a, _b, adapters) = scripted_pair(
        ScriptedAdapter::new("Exchange A", vec![Some(100.0)]),
        ScriptedAdapter::new("Exchange B", vec![Some(100.0)]),
    );
    let (engine, _rx) = TestUtils::engine(TestUtils::create_test_config(), Mode::Simulated, adapters);

    let (summary, _) = tokio::join!(engine.run(std::future::pending()), async {
        tokio::time::sleep(Duration::from_millis(30)).await;
        engine.stop().await;
    });

    let summary = summary.unwrap();
    assert!(summary.cycles >= 1);
    assert_eq!(a.close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(engine.get_state().await, StrategyState::Stopped);
}

#[tokio::test]
async fn test_shutdown_signal_closes_adapters() {
    let (a, b, adapters) = scripted_pair(
        ScriptedAdapter::new("Exchange A", vec![Some(100.0)]),
        ScriptedAdapter::new("Exchange B", vec![Some(100.0)]),
    );
    let (engine, mut rx) = TestUtils::engine(TestUtils::create_test_config(), Mode::Simulated, adapters);

    let (tx, shutdown) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _ = tx.send(());
    });

    let summary = engine
        .run(async {
            let _ = shutdown.await;
        })
        .await
        .unwrap();

    assert!(summary.cycles >= 1);
    assert_eq!(summary.failed_cycles, 0);
    assert_eq!(a.close_calls.load(Ordering::SeqCst), 1);
    assert_eq!(b.close_calls.load(Ordering::SeqCst), 1);

    let final_summaries = TestUtils::drain(&mut rx)
        .into_iter()
        .filter(|event| matches!(event, ReportEvent::FinalSummary(_)))
        .count();
    assert_eq!(final_summaries, 1);
}

#[tokio::test]
async fn test_crashed_fetch_keeps_quotes_from_healthy_venues() {
    let (_a, _b, adapters) = scripted_pair(
        ScriptedAdapter::new("Exchange A", vec![Some(100.0)]).panicking_once(),
        ScriptedAdapter::new("Exchange B", vec![Some(102.0)]),
    );
    let (engine, _rx) = TestUtils::engine(TestUtils::create_test_config(), Mode::Simulated, adapters);

    let err = engine.run_cycle(1).await.unwrap_err();
    assert!(err.to_string().contains("Price fetch task failed"));

    let installed = engine
        .board()
        .get(&Instrument::new("X/USDT"), &Venue::new("Exchange B"))
        .expect("healthy quote installed");
    assert_eq!(installed.ask_price, 102.0);
    assert!(engine
        .board()
        .get(&Instrument::new("X/USDT"), &Venue::new("Exchange A"))
        .is_none());
}
