//! Open position and closed trade records.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    EndOfData,
    /// Equity fell to zero or below while the position was open.
    CapitalExhausted,
}

/// The single long position a run may hold.
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub entry_timestamp: i64,
    pub entry_price: f64,
    pub shares: f64,
    pub stop_loss_price: f64,
    pub take_profit_price: f64,
    pub entry_commission: f64,
}

impl Position {
    pub fn market_value(&self, price: f64) -> f64 {
        self.shares * price
    }

    pub fn should_stop_loss(&self, low: f64) -> bool {
        low <= self.stop_loss_price
    }

    pub fn should_take_profit(&self, high: f64) -> bool {
        high >= self.take_profit_price
    }

    /// Consume the position into the trade it becomes when closed.
    pub fn close(
        self,
        exit_timestamp: i64,
        exit_price: f64,
        exit_commission: f64,
        exit_reason: ExitReason,
    ) -> Trade {
        Trade {
            entry_timestamp: self.entry_timestamp,
            exit_timestamp,
            entry_price: self.entry_price,
            exit_price,
            shares: self.shares,
            gross_pnl: (exit_price - self.entry_price) * self.shares,
            commission_paid: self.entry_commission + exit_commission,
            return_pct: (exit_price - self.entry_price) / self.entry_price,
            exit_reason,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub entry_timestamp: i64,
    pub exit_timestamp: i64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub shares: f64,
    pub gross_pnl: f64,
    /// Entry plus exit commission.
    pub commission_paid: f64,
    pub return_pct: f64,
    pub exit_reason: ExitReason,
}

impl Trade {
    pub fn net_pnl(&self) -> f64 {
        self.gross_pnl - self.commission_paid
    }

    pub fn is_winner(&self) -> bool {
        self.net_pnl() > 0.0
    }

    pub fn is_loser(&self) -> bool {
        self.net_pnl() < 0.0
    }
}
