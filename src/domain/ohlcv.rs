//! OHLCV bar and validated price series.

use serde::{Deserialize, Serialize};

use super::error::TradesimError;

pub const MS_PER_DAY: i64 = 86_400_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    fn check(&self) -> Result<(), String> {
        for (name, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{name} must be a positive finite price, got {value}"));
            }
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(format!(
                "volume must be non-negative, got {}",
                self.volume
            ));
        }
        if self.low > self.high {
            return Err(format!("low {} above high {}", self.low, self.high));
        }
        if self.open < self.low || self.open > self.high {
            return Err(format!("open {} outside [low, high]", self.open));
        }
        if self.close < self.low || self.close > self.high {
            return Err(format!("close {} outside [low, high]", self.close));
        }
        Ok(())
    }
}

/// A non-empty sequence of bars with strictly increasing timestamps.
///
/// Construction validates every bar, so the engine never has to re-check
/// ordering or price sanity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    bars: Vec<Bar>,
}

impl Series {
    pub fn new(bars: Vec<Bar>) -> Result<Self, TradesimError> {
        if bars.is_empty() {
            return Err(TradesimError::EmptySeries);
        }
        for (index, bar) in bars.iter().enumerate() {
            bar.check()
                .map_err(|reason| TradesimError::InvalidSeries { index, reason })?;
            if index > 0 && bar.timestamp <= bars[index - 1].timestamp {
                return Err(TradesimError::InvalidSeries {
                    index,
                    reason: format!(
                        "timestamp {} does not follow {}",
                        bar.timestamp,
                        bars[index - 1].timestamp
                    ),
                });
            }
        }
        Ok(Self { bars })
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`.
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> &Bar {
        &self.bars[0]
    }

    pub fn last(&self) -> &Bar {
        &self.bars[self.bars.len() - 1]
    }

    /// Median spacing between consecutive bars, `None` for a single bar.
    pub fn median_interval_ms(&self) -> Option<i64> {
        if self.bars.len() < 2 {
            return None;
        }
        let mut gaps: Vec<i64> = self
            .bars
            .windows(2)
            .map(|w| w[1].timestamp - w[0].timestamp)
            .collect();
        gaps.sort_unstable();
        Some(gaps[gaps.len() / 2])
    }

    /// Return a copy restricted to `[start_ms, end_ms]`; `None` if nothing is left.
    pub fn slice_by_time(&self, start_ms: Option<i64>, end_ms: Option<i64>) -> Option<Series> {
        let bars: Vec<Bar> = self
            .bars
            .iter()
            .filter(|b| start_ms.is_none_or(|s| b.timestamp >= s))
            .filter(|b| end_ms.is_none_or(|e| b.timestamp <= e))
            .copied()
            .collect();
        if bars.is_empty() {
            None
        } else {
            Some(Series { bars })
        }
    }
}
