//! Fee-adjusted profitability of a buy/sell pair

use serde::{Deserialize, Serialize};

/// Outcome of buying `trade_size` worth of the base asset at one price and selling it at another
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeEconomics {
    /// Quote currency spent including the buy fee
    pub buy_cost_with_fee: f64,
    /// Base asset bought, and sold, by both legs
    pub asset_amount: f64,
    /// Quote currency received after the sell fee
    pub revenue: f64,
    /// `revenue - buy_cost_with_fee`
    pub net_profit: f64,
    /// `net_profit / trade_size`
    pub net_spread: f64,
}

impl TradeEconomics {
    /// Evaluate one direction; prices must be positive
    pub fn compute(trade_size: f64, fee_rate: f64, buy_price: f64, sell_price: f64) -> Self {
        let buy_cost_with_fee = trade_size * (1.0 + fee_rate);
        let asset_amount = trade_size / buy_price;
        let revenue = asset_amount * sell_price * (1.0 - fee_rate);
        let net_profit = revenue - buy_cost_with_fee;

        Self {
            buy_cost_with_fee,
            asset_amount,
            revenue,
            net_profit,
            net_spread: net_profit / trade_size,
        }
    }

    /// Strictly above the threshold
    pub fn is_actionable(&self, threshold: f64) -> bool {
        self.net_spread > threshold
    }
}
