//! Bar-by-bar replay of one strategy over one series.
//!
//! # State machine
//!
//! The run starts flat. On each bar, in timestamp order:
//!
//! - Long: stop-loss, then take-profit, then an exit signal. At most one
//!   close per bar, and a bar that closes a position does not reopen one.
//! - Flat: an enter signal opens a position at the close, except on the last
//!   bar, where it could never be closed by a later bar.
//! - On the last bar any open position is closed at the close as end of data.
//!
//! Equity is recorded for every bar after the bar's actions. If it reaches
//! zero or below, any open position is force-closed and the rest of the run
//! stays flat at that equity.

use serde::Serialize;
use tracing::warn;

use super::execution::{check_triggers, enter_long, exit_position, EntryResult, ExecutionParams};
use super::indicator_helpers::IndicatorSet;
use super::ohlcv::Bar;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{ExitReason, Trade};
use super::signal::{Signal, SignalEvent};
use super::strategy::Strategy;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationOutcome {
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    /// Signals the simulator acted on.
    pub signals: Vec<SignalEvent>,
    pub capital_exhausted: bool,
    /// Bars that ended with a position open.
    pub bars_in_market: usize,
}

pub fn simulate(
    bars: &[Bar],
    strategy: &Strategy,
    indicators: &IndicatorSet,
    params: &ExecutionParams,
    initial_capital: f64,
) -> SimulationOutcome {
    let mut portfolio = Portfolio::new(initial_capital);
    let mut signals = Vec::new();
    let mut capital_exhausted = false;
    let mut bars_in_market = 0;
    let last = bars.len().saturating_sub(1);

    for (i, bar) in bars.iter().enumerate() {
        if capital_exhausted {
            portfolio.record_equity(bar.timestamp, portfolio.cash);
            continue;
        }

        if let Some(position) = portfolio.position.as_ref() {
            if let Some((reason, price)) = check_triggers(position, bar) {
                exit_position(&mut portfolio, bar.timestamp, price, reason, params);
            } else if strategy.signal(indicators, i, true) == Signal::ExitLong {
                signals.push(SignalEvent {
                    index: i,
                    timestamp: bar.timestamp,
                    signal: Signal::ExitLong,
                });
                exit_position(
                    &mut portfolio,
                    bar.timestamp,
                    bar.close,
                    ExitReason::Signal,
                    params,
                );
            } else if i == last {
                exit_position(
                    &mut portfolio,
                    bar.timestamp,
                    bar.close,
                    ExitReason::EndOfData,
                    params,
                );
            }
        } else if i < last && strategy.signal(indicators, i, false) == Signal::EnterLong {
            if let EntryResult::Entered { .. } = enter_long(&mut portfolio, bar, params) {
                signals.push(SignalEvent {
                    index: i,
                    timestamp: bar.timestamp,
                    signal: Signal::EnterLong,
                });
            }
        }

        let mut equity = portfolio.equity(bar.close);
        if equity <= 0.0 {
            capital_exhausted = true;
            warn!(
                strategy = %strategy,
                timestamp = bar.timestamp,
                equity,
                "capital exhausted; remaining bars run flat"
            );
            if portfolio.has_position() {
                exit_position(
                    &mut portfolio,
                    bar.timestamp,
                    bar.close,
                    ExitReason::CapitalExhausted,
                    params,
                );
            }
            equity = portfolio.cash;
        }

        if portfolio.has_position() {
            bars_in_market += 1;
        }
        portfolio.record_equity(bar.timestamp, equity);
    }

    SimulationOutcome {
        trades: portfolio.closed_trades,
        equity_curve: portfolio.equity_curve,
        signals,
        capital_exhausted,
        bars_in_market,
    }
}
