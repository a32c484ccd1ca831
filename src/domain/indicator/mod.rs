//! Technical indicator implementations.
//!
//! This module provides types for representing indicator output:
//! - `IndicatorType`: Enum for indicator identity + parameters (serves as HashMap key)
//! - `IndicatorSeries`: Values aligned index-for-index with the input bars,
//!   `NaN` where the lookback window is not yet satisfied
//!
//! Every calculation is a pure function of its input: recomputing an
//! indicator over the same bars yields a bit-identical series.
//!
//! A lookback period of zero, or one that is not shorter than the series,
//! yields an all-undefined series rather than an error.

pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod stddev;

pub use bollinger::{calculate_bollinger, BollingerSeries};
pub use ema::{calculate_ema, ema_values};
pub use macd::{calculate_macd, MacdSeries};
pub use rsi::calculate_rsi;
pub use sma::{calculate_sma, sma_values};
pub use stddev::{calculate_stddev, rolling_stddev};

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Stddev(usize),
    MacdLine {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    MacdSignal {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    MacdHistogram {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    BollingerUpper {
        period: usize,
        stddev_mult_x100: u32,
    },
    BollingerMiddle {
        period: usize,
        stddev_mult_x100: u32,
    },
    BollingerLower {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<f64>,
}

impl IndicatorSeries {
    pub fn undefined(indicator_type: IndicatorType, len: usize) -> Self {
        IndicatorSeries {
            indicator_type,
            values: vec![f64::NAN; len],
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`, `None` when out of range or still in warmup.
    pub fn value_at(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().filter(|v| !v.is_nan())
    }

    pub fn is_valid(&self, index: usize) -> bool {
        self.value_at(index).is_some()
    }

    /// Number of leading undefined values.
    pub fn warmup(&self) -> usize {
        self.values.iter().take_while(|v| v.is_nan()).count()
    }

    /// Bit-level equality, treating NaN == NaN.
    pub fn same_values(&self, other: &IndicatorSeries) -> bool {
        self.values.len() == other.values.len()
            && self
                .values
                .iter()
                .zip(&other.values)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

/// True when a lookback of `period` cannot produce any value over `len` bars.
pub(crate) fn insufficient(period: usize, len: usize) -> bool {
    period == 0 || period >= len
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Stddev(period) => write!(f, "STDDEV({})", period),
            IndicatorType::MacdLine { fast, slow, signal } => {
                write!(f, "MACD({},{},{})", fast, slow, signal)
            }
            IndicatorType::MacdSignal { fast, slow, signal } => {
                write!(f, "MACD_SIGNAL({},{},{})", fast, slow, signal)
            }
            IndicatorType::MacdHistogram { fast, slow, signal } => {
                write!(f, "MACD_HIST({},{},{})", fast, slow, signal)
            }
            IndicatorType::BollingerUpper {
                period,
                stddev_mult_x100,
            } => write!(f, "BB_UPPER({},{})", period, *stddev_mult_x100 as f64 / 100.0),
            IndicatorType::BollingerMiddle {
                period,
                stddev_mult_x100,
            } => write!(f, "BB_MIDDLE({},{})", period, *stddev_mult_x100 as f64 / 100.0),
            IndicatorType::BollingerLower {
                period,
                stddev_mult_x100,
            } => write!(f, "BB_LOWER({},{})", period, *stddev_mult_x100 as f64 / 100.0),
        }
    }
}
