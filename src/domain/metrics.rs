//! Performance metrics computed once from a finished run.
//!
//! Degenerate inputs never produce NaN or infinity. Ratios with no
//! meaningful denominator are either 0 (Sharpe, win rate) or
//! [`MetricValue::Undefined`] (Sortino, profit factor, overflowing
//! annualized return).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::TradesimError;
use super::ohlcv::MS_PER_DAY;
use super::portfolio::EquityPoint;
use super::position::Trade;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// A ratio that may have no meaningful value.
///
/// Serializes as a number, or as the string `"undefined"`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Value(f64),
    Undefined,
}

impl MetricValue {
    fn finite(v: f64) -> Self {
        if v.is_finite() {
            MetricValue::Value(v)
        } else {
            MetricValue::Undefined
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            MetricValue::Value(v) => Some(*v),
            MetricValue::Undefined => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, MetricValue::Undefined)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Value(v) => match f.precision() {
                Some(p) => write!(f, "{:.*}", p, v),
                None => write!(f, "{}", v),
            },
            MetricValue::Undefined => f.write_str("undefined"),
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            MetricValue::Value(v) => serializer.serialize_f64(*v),
            MetricValue::Undefined => serializer.serialize_str("undefined"),
        }
    }
}

impl<'de> Deserialize<'de> for MetricValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(f64),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Number(v) => Ok(MetricValue::Value(v)),
            Raw::Text(s) if s == "undefined" => Ok(MetricValue::Undefined),
            Raw::Text(s) => Err(serde::de::Error::custom(format!(
                "expected a number or \"undefined\", got \"{s}\""
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub total_return: f64,
    pub annual_return: MetricValue,
    pub sharpe_ratio: f64,
    pub sortino_ratio: MetricValue,
    pub max_drawdown: f64,
    /// Longest run of bars spent below a prior equity peak.
    pub max_drawdown_duration: usize,
    pub win_rate: f64,
    pub profit_factor: MetricValue,
    pub commission_paid: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub final_equity: f64,
    pub avg_trade_return: f64,
    /// Fraction of bars that ended with a position open.
    pub exposure: f64,
}

impl BacktestMetrics {
    pub fn compute(
        equity_curve: &[EquityPoint],
        trades: &[Trade],
        initial_capital: f64,
        annualization_factor: f64,
        bars_in_market: usize,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital
        } else {
            0.0
        };

        let annual_return = compute_annual_return(equity_curve, total_return);
        let (max_drawdown, max_drawdown_duration) = compute_drawdown(equity_curve);
        let (sharpe_ratio, sortino_ratio) = compute_risk_adjusted(equity_curve, annualization_factor);

        let mut winning_trades = 0usize;
        let mut losing_trades = 0usize;
        let mut total_wins = 0.0_f64;
        let mut total_losses = 0.0_f64;
        let mut commission_paid = 0.0_f64;
        let mut return_sum = 0.0_f64;

        for trade in trades {
            let pnl = trade.net_pnl();
            if pnl > 0.0 {
                winning_trades += 1;
                total_wins += pnl;
            } else if pnl < 0.0 {
                losing_trades += 1;
                total_losses += pnl.abs();
            }
            commission_paid += trade.commission_paid;
            return_sum += trade.return_pct;
        }

        let total_trades = trades.len();
        let win_rate = if total_trades > 0 {
            winning_trades as f64 / total_trades as f64
        } else {
            0.0
        };

        let profit_factor = if losing_trades > 0 && total_losses > 0.0 {
            MetricValue::finite(total_wins / total_losses)
        } else {
            MetricValue::Undefined
        };

        let avg_trade_return = if total_trades > 0 {
            return_sum / total_trades as f64
        } else {
            0.0
        };

        let exposure = if equity_curve.is_empty() {
            0.0
        } else {
            bars_in_market as f64 / equity_curve.len() as f64
        };

        BacktestMetrics {
            total_return,
            annual_return,
            sharpe_ratio,
            sortino_ratio,
            max_drawdown,
            max_drawdown_duration,
            win_rate,
            profit_factor,
            commission_paid,
            total_trades,
            winning_trades,
            losing_trades,
            final_equity,
            avg_trade_return,
            exposure,
        }
    }
}

/// Bars per year for a given bar spacing.
///
/// Daily and slower bars map to 252/52/12; intraday bars scale the 252
/// trading days by bars per day.
pub fn annualization_factor(interval_ms: Option<i64>) -> f64 {
    const WEEK: i64 = 7 * MS_PER_DAY;
    const MONTH: i64 = 28 * MS_PER_DAY;

    match interval_ms {
        Some(ms) if ms >= MONTH => 12.0,
        Some(ms) if ms >= WEEK => 52.0,
        Some(ms) if ms >= MS_PER_DAY => TRADING_DAYS_PER_YEAR,
        Some(ms) if ms > 0 => TRADING_DAYS_PER_YEAR * (MS_PER_DAY as f64 / ms as f64),
        _ => TRADING_DAYS_PER_YEAR,
    }
}

fn compute_annual_return(equity_curve: &[EquityPoint], total_return: f64) -> MetricValue {
    let days = match (equity_curve.first(), equity_curve.last()) {
        (Some(first), Some(last)) => (last.timestamp - first.timestamp) as f64 / MS_PER_DAY as f64,
        _ => 0.0,
    };
    let days = days.max(1.0);

    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return MetricValue::Value(-1.0);
    }
    MetricValue::finite(growth.powf(365.0 / days) - 1.0)
}

fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, usize) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_duration = 0usize;
    let mut current_dd_duration = 0usize;

    for point in equity_curve {
        if point.equity >= peak {
            peak = point.equity;
            current_dd_duration = 0;
        } else if peak > 0.0 {
            let dd = (peak - point.equity) / peak;
            if dd > max_dd {
                max_dd = dd;
            }
            current_dd_duration += 1;
            if current_dd_duration > max_dd_duration {
                max_dd_duration = current_dd_duration;
            }
        }
    }

    (max_dd, max_dd_duration)
}

fn mean_and_stddev(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn compute_risk_adjusted(equity_curve: &[EquityPoint], factor: f64) -> (f64, MetricValue) {
    if equity_curve.len() < 2 {
        return (0.0, MetricValue::Undefined);
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            let curr = w[1].equity;
            if prev > 0.0 {
                curr / prev - 1.0
            } else {
                0.0
            }
        })
        .collect();

    let (mean, stddev) = mean_and_stddev(&returns);
    let scale = factor.sqrt();

    let sharpe = if stddev > 0.0 {
        let s = mean / stddev * scale;
        if s.is_finite() {
            s
        } else {
            0.0
        }
    } else {
        0.0
    };

    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let sortino = if downside.is_empty() {
        MetricValue::Undefined
    } else {
        let (_, downside_stddev) = mean_and_stddev(&downside);
        if downside_stddev > 0.0 {
            MetricValue::finite(mean / downside_stddev * scale)
        } else {
            MetricValue::Undefined
        }
    };

    (sharpe, sortino)
}

/// Metric used to order runs in a comparison or sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankMetric {
    TotalReturn,
    AnnualReturn,
    SharpeRatio,
    SortinoRatio,
    MaxDrawdown,
    WinRate,
    ProfitFactor,
}

impl RankMetric {
    pub const ALL: [RankMetric; 7] = [
        RankMetric::TotalReturn,
        RankMetric::AnnualReturn,
        RankMetric::SharpeRatio,
        RankMetric::SortinoRatio,
        RankMetric::MaxDrawdown,
        RankMetric::WinRate,
        RankMetric::ProfitFactor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RankMetric::TotalReturn => "total_return",
            RankMetric::AnnualReturn => "annual_return",
            RankMetric::SharpeRatio => "sharpe_ratio",
            RankMetric::SortinoRatio => "sortino_ratio",
            RankMetric::MaxDrawdown => "max_drawdown",
            RankMetric::WinRate => "win_rate",
            RankMetric::ProfitFactor => "profit_factor",
        }
    }

    /// Higher is better; drawdown is negated. `None` sorts last.
    pub fn score(&self, metrics: &BacktestMetrics) -> Option<f64> {
        match self {
            RankMetric::TotalReturn => Some(metrics.total_return),
            RankMetric::AnnualReturn => metrics.annual_return.value(),
            RankMetric::SharpeRatio => Some(metrics.sharpe_ratio),
            RankMetric::SortinoRatio => metrics.sortino_ratio.value(),
            RankMetric::MaxDrawdown => Some(-metrics.max_drawdown),
            RankMetric::WinRate => Some(metrics.win_rate),
            RankMetric::ProfitFactor => metrics.profit_factor.value(),
        }
    }
}

impl fmt::Display for RankMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankMetric {
    type Err = TradesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RankMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim())
            .ok_or_else(|| TradesimError::ConfigInvalid {
                section: "sweep".to_string(),
                key: "rank_by".to_string(),
                reason: format!(
                    "unknown metric '{}' (expected one of: {})",
                    s.trim(),
                    RankMetric::ALL.map(|m| m.as_str()).join(", ")
                ),
            })
    }
}
