//! Process-wide trading ledger

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Read-only copy of the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    /// Initial cash plus every committed net profit
    pub cash: f64,
    /// Sum of committed net profits
    pub total_profit: f64,
    /// Number of commits
    pub trades_executed: u64,
    /// Time of the last commit
    pub last_update_time: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct PortfolioState {
    cash: f64,
    total_profit: f64,
    trades_executed: u64,
    last_update_time: Option<DateTime<Utc>>,
}

/// Ledger shared by concurrent executions.
///
/// Every commit updates cash, total profit and the trade count under one write
/// lock, so readers never observe a partially applied trade.
#[derive(Debug)]
pub struct Portfolio {
    initial_cash: f64,
    state: RwLock<PortfolioState>,
}

impl Portfolio {
    /// Create a ledger holding `initial_cash`
    pub fn new(initial_cash: f64) -> Self {
        Self {
            initial_cash,
            state: RwLock::new(PortfolioState {
                cash: initial_cash,
                total_profit: 0.0,
                trades_executed: 0,
                last_update_time: None,
            }),
        }
    }

    /// Cash the ledger started with
    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    /// Apply one completed trade and return the resulting ledger
    pub async fn commit(&self, net_profit: f64) -> PortfolioSnapshot {
        let mut state = self.state.write().await;
        state.cash += net_profit;
        state.total_profit += net_profit;
        state.trades_executed += 1;
        state.last_update_time = Some(Utc::now());

        PortfolioSnapshot {
            cash: state.cash,
            total_profit: state.total_profit,
            trades_executed: state.trades_executed,
            last_update_time: state.last_update_time,
        }
    }

    /// Current ledger
    pub async fn snapshot(&self) -> PortfolioSnapshot {
        let state = self.state.read().await;
        PortfolioSnapshot {
            cash: state.cash,
            total_profit: state.total_profit,
            trades_executed: state.trades_executed,
            last_update_time: state.last_update_time,
        }
    }
}
