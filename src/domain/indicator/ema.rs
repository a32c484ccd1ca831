//! Exponential Moving Average indicator.
//!
//! k = 2/(n+1), seed with first SMA, then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::{insufficient, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub fn calculate_ema(bars: &[Bar], period: usize) -> IndicatorSeries {
    if insufficient(period, bars.len()) {
        return IndicatorSeries::undefined(IndicatorType::Ema(period), bars.len());
    }
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values: ema_values(&closes, period),
    }
}

/// EMA over raw values that may start with undefined (NaN) entries.
///
/// The seed is the mean of the first `period` defined values, so an EMA
/// over another indicator (e.g. the MACD line) starts where its input does.
pub fn ema_values(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let Some(start) = values.iter().position(|v| !v.is_nan()) else {
        return out;
    };
    if period == 0 || start + period > values.len() {
        return out;
    }

    let k = 2.0 / (period as f64 + 1.0);
    let seed_idx = start + period - 1;
    let mut ema = values[start..=seed_idx].iter().sum::<f64>() / period as f64;
    out[seed_idx] = ema;

    for i in (seed_idx + 1)..values.len() {
        ema = values[i] * k + ema * (1.0 - k);
        out[i] = ema;
    }
    out
}
