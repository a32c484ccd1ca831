//! Discrete per-bar trading signals and the crossover predicates strategies
//! build them from.
//!
//! # Crossover semantics
//!
//! A cross at bar `i` means the difference `left - right` has strictly
//! opposite signs at `i - 1` and `i`. Touching (a zero difference) on either
//! bar is not a cross. Bar 0 never crosses, and an undefined value on either
//! bar means no cross.

use serde::{Deserialize, Serialize};

use crate::domain::indicator::IndicatorSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    #[default]
    None,
    EnterLong,
    ExitLong,
}

/// A non-`None` signal observed by the simulator at one bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub index: usize,
    pub timestamp: i64,
    pub signal: Signal,
}

fn differences(
    left: &IndicatorSeries,
    right: impl Fn(usize) -> Option<f64>,
    index: usize,
) -> Option<(f64, f64)> {
    if index == 0 {
        return None;
    }
    let prev = left.value_at(index - 1)? - right(index - 1)?;
    let curr = left.value_at(index)? - right(index)?;
    Some((prev, curr))
}

/// `left` crosses above `right` at `index`.
pub fn crosses_above(left: &IndicatorSeries, right: &IndicatorSeries, index: usize) -> bool {
    differences(left, |i| right.value_at(i), index)
        .is_some_and(|(prev, curr)| prev < 0.0 && curr > 0.0)
}

/// `left` crosses below `right` at `index`.
pub fn crosses_below(left: &IndicatorSeries, right: &IndicatorSeries, index: usize) -> bool {
    differences(left, |i| right.value_at(i), index)
        .is_some_and(|(prev, curr)| prev > 0.0 && curr < 0.0)
}

/// `series` crosses up through the constant `level` at `index`.
pub fn crosses_above_level(series: &IndicatorSeries, level: f64, index: usize) -> bool {
    differences(series, |_| Some(level), index)
        .is_some_and(|(prev, curr)| prev < 0.0 && curr > 0.0)
}

/// `series` crosses down through the constant `level` at `index`.
pub fn crosses_below_level(series: &IndicatorSeries, level: f64, index: usize) -> bool {
    differences(series, |_| Some(level), index)
        .is_some_and(|(prev, curr)| prev > 0.0 && curr < 0.0)
}
