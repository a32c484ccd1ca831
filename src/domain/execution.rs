//! Fill mechanics for the single long position.
//!
//! Implements entry sizing, commissions, exits, and stop-loss/take-profit
//! trigger checking. Fills happen at the bar close for signals and at the
//! trigger price for stops and targets.

use super::ohlcv::Bar;
use super::portfolio::Portfolio;
use super::position::{ExitReason, Position, Trade};

/// Run-level sizing and risk parameters, all as fractions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExecutionParams {
    /// Fraction of equity committed on entry, in (0, 1].
    pub position_size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    /// Commission rate applied to traded notional, in [0, 1).
    pub commission: f64,
}

impl Default for ExecutionParams {
    fn default() -> Self {
        ExecutionParams {
            position_size: 1.0,
            stop_loss: 0.02,
            take_profit: 0.03,
            commission: 0.001,
        }
    }
}

pub fn calculate_commission(trade_value: f64, rate: f64) -> f64 {
    trade_value * rate
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        shares: f64,
        entry_price: f64,
        commission: f64,
    },
    InsufficientCapital,
}

/// Open a long position at `bar.close`.
///
/// 1. shares = equity * position_size / close
/// 2. cash -= shares * close + commission
/// 3. stop and target are set relative to the entry price
///
/// The portfolio must be flat, so equity equals cash here.
pub fn enter_long(portfolio: &mut Portfolio, bar: &Bar, params: &ExecutionParams) -> EntryResult {
    if portfolio.has_position() || portfolio.cash <= 0.0 {
        return EntryResult::InsufficientCapital;
    }

    let entry_price = bar.close;
    let shares = portfolio.cash * params.position_size / entry_price;
    if !shares.is_finite() || shares <= 0.0 {
        return EntryResult::InsufficientCapital;
    }

    let cost = shares * entry_price;
    let commission = calculate_commission(cost, params.commission);
    portfolio.cash -= cost + commission;

    portfolio.open(Position {
        entry_timestamp: bar.timestamp,
        entry_price,
        shares,
        stop_loss_price: entry_price * (1.0 - params.stop_loss),
        take_profit_price: entry_price * (1.0 + params.take_profit),
        entry_commission: commission,
    });

    EntryResult::Entered {
        shares,
        entry_price,
        commission,
    }
}

/// Close the open position at `exit_price`, record the trade, and return it.
pub fn exit_position(
    portfolio: &mut Portfolio,
    exit_timestamp: i64,
    exit_price: f64,
    exit_reason: ExitReason,
    params: &ExecutionParams,
) -> Option<Trade> {
    let position = portfolio.take_position()?;

    let exit_value = position.market_value(exit_price);
    let exit_commission = calculate_commission(exit_value, params.commission);
    portfolio.cash += exit_value - exit_commission;

    let trade = position.close(exit_timestamp, exit_price, exit_commission, exit_reason);
    portfolio.record_trade(trade.clone());
    Some(trade)
}

/// Stop or target hit inside `bar`'s range, with the fill price.
///
/// When both levels fall inside [low, high] the stop wins: the bar's path is
/// unknown, so the worse fill is assumed.
pub fn check_triggers(position: &Position, bar: &Bar) -> Option<(ExitReason, f64)> {
    if position.should_stop_loss(bar.low) {
        Some((ExitReason::StopLoss, position.stop_loss_price))
    } else if position.should_take_profit(bar.high) {
        Some((ExitReason::TakeProfit, position.take_profit_price))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(timestamp: i64, low: f64, high: f64, close: f64) -> Bar {
        Bar {
            timestamp,
            open: close,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn params() -> ExecutionParams {
        ExecutionParams {
            position_size: 0.5,
            stop_loss: 0.05,
            take_profit: 0.10,
            commission: 0.01,
        }
    }

    #[test]
    fn commission_is_rate_times_value() {
        assert!((calculate_commission(1000.0, 0.001) - 1.0).abs() < f64::EPSILON);
        assert!(calculate_commission(1000.0, 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn enter_long_sizes_and_charges() {
        let mut portfolio = Portfolio::new(10_000.0);
        let result = enter_long(&mut portfolio, &bar(1, 99.0, 101.0, 100.0), &params());

        match result {
            EntryResult::Entered {
                shares,
                entry_price,
                commission,
            } => {
                assert!((shares - 50.0).abs() < 1e-12);
                assert!((entry_price - 100.0).abs() < f64::EPSILON);
                assert!((commission - 50.0).abs() < 1e-9);
            }
            EntryResult::InsufficientCapital => panic!("expected entry"),
        }
        assert!((portfolio.cash - 4_950.0).abs() < 1e-9);

        let pos = portfolio.position.as_ref().unwrap();
        assert!((pos.stop_loss_price - 95.0).abs() < 1e-9);
        assert!((pos.take_profit_price - 110.0).abs() < 1e-9);
        // equity drops by exactly the entry commission
        assert!((portfolio.equity(100.0) - 9_950.0).abs() < 1e-9);
    }

    #[test]
    fn enter_long_rejected_when_open_or_broke() {
        let mut portfolio = Portfolio::new(10_000.0);
        let b = bar(1, 99.0, 101.0, 100.0);
        enter_long(&mut portfolio, &b, &params());
        assert_eq!(
            enter_long(&mut portfolio, &b, &params()),
            EntryResult::InsufficientCapital
        );

        let mut broke = Portfolio::new(10_000.0);
        broke.cash = 0.0;
        assert_eq!(
            enter_long(&mut broke, &b, &params()),
            EntryResult::InsufficientCapital
        );
    }

    #[test]
    fn exit_position_settles_cash_and_records_trade() {
        let mut portfolio = Portfolio::new(10_000.0);
        enter_long(&mut portfolio, &bar(1, 99.0, 101.0, 100.0), &params());

        let trade = exit_position(&mut portfolio, 2, 110.0, ExitReason::TakeProfit, &params())
            .unwrap();

        assert!((trade.gross_pnl - 500.0).abs() < 1e-9);
        // 50 entry + 55 exit
        assert!((trade.commission_paid - 105.0).abs() < 1e-9);
        assert!((portfolio.cash - (10_000.0 + 500.0 - 105.0)).abs() < 1e-9);
        assert!(!portfolio.has_position());
        assert_eq!(portfolio.closed_trades.len(), 1);
    }

    #[test]
    fn exit_without_position_is_none() {
        let mut portfolio = Portfolio::new(10_000.0);
        assert!(exit_position(&mut portfolio, 2, 110.0, ExitReason::Signal, &params()).is_none());
    }

    #[test]
    fn triggers_prefer_stop_loss() {
        let mut portfolio = Portfolio::new(10_000.0);
        enter_long(&mut portfolio, &bar(1, 99.0, 101.0, 100.0), &params());
        let pos = portfolio.position.as_ref().unwrap();

        // both 95 and 110 inside the range
        let wide = bar(2, 90.0, 120.0, 100.0);
        assert_eq!(check_triggers(pos, &wide), Some((ExitReason::StopLoss, pos.stop_loss_price)));

        let up = bar(3, 99.0, 111.0, 105.0);
        assert_eq!(
            check_triggers(pos, &up),
            Some((ExitReason::TakeProfit, pos.take_profit_price))
        );

        let quiet = bar(4, 96.0, 104.0, 100.0);
        assert_eq!(check_triggers(pos, &quiet), None);
    }
}
