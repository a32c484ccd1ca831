//! Simple Moving Average indicator.
//!
//! SMA[i] = mean(C[i-n+1..=i]), kept as a sliding sum so each step is O(1).
//! Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::{insufficient, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_sma(bars: &[Bar], period: usize) -> IndicatorSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: sma_values(&closes, period),
    }
}

/// Sliding-window mean over raw values.
pub fn sma_values(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if insufficient(period, values.len()) {
        return out;
    }

    let mut sum = 0.0;
    for (i, &v) in values.iter().enumerate() {
        sum += v;
        if i >= period {
            sum -= values[i - period];
        }
        if i + 1 >= period {
            out[i] = sum / period as f64;
        }
    }
    out
}
