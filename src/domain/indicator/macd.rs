//! MACD (Moving Average Convergence Divergence) indicator.
//!
//! MACD Line = EMA(fast) - EMA(slow)
//! Signal Line = EMA(signal) of MACD Line
//! Histogram = MACD Line - Signal Line
//!
//! Default parameters: fast=12, slow=26, signal=9
//! Warmup: the line starts at slow - 1, the signal and histogram at
//! slow - 1 + signal - 1.

use crate::domain::indicator::{ema_values, insufficient, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

/// The three MACD components, each aligned with the input bars.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdSeries {
    pub line: IndicatorSeries,
    pub signal: IndicatorSeries,
    pub histogram: IndicatorSeries,
}

impl MacdSeries {
    pub fn into_parts(self) -> [IndicatorSeries; 3] {
        [self.line, self.signal, self.histogram]
    }
}

pub fn calculate_macd(bars: &[Bar], fast: usize, slow: usize, signal: usize) -> MacdSeries {
    let len = bars.len();
    let mut out = MacdSeries {
        line: IndicatorSeries::undefined(IndicatorType::MacdLine { fast, slow, signal }, len),
        signal: IndicatorSeries::undefined(IndicatorType::MacdSignal { fast, slow, signal }, len),
        histogram: IndicatorSeries::undefined(
            IndicatorType::MacdHistogram { fast, slow, signal },
            len,
        ),
    };
    if insufficient(fast, len) || insufficient(slow, len) || signal == 0 {
        return out;
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let ema_fast = ema_values(&closes, fast);
    let ema_slow = ema_values(&closes, slow);

    // NaN propagates through the subtraction, so the line is undefined until
    // both EMAs are.
    let line: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_values(&line, signal);
    let histogram: Vec<f64> = line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    out.line.values = line;
    out.signal.values = signal_line;
    out.histogram.values = histogram;
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::indicator::calculate_ema;

    fn ramp(n: usize) -> Vec<Bar> {
        let prices: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        make_bars(&prices)
    }

    #[test]
    fn macd_warmup() {
        let macd = calculate_macd(&ramp(40), 3, 5, 4);

        assert_eq!(macd.line.warmup(), 4);
        assert_eq!(macd.signal.warmup(), 4 + 3);
        assert_eq!(macd.histogram.warmup(), 4 + 3);
    }

    #[test]
    fn macd_line_is_ema_difference() {
        let bars = ramp(30);
        let macd = calculate_macd(&bars, 3, 6, 4);
        let fast = calculate_ema(&bars, 3);
        let slow = calculate_ema(&bars, 6);

        for i in 5..30 {
            let expected = fast.value_at(i).unwrap() - slow.value_at(i).unwrap();
            assert!((macd.line.value_at(i).unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn macd_histogram_is_line_minus_signal() {
        let macd = calculate_macd(&ramp(50), DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL);

        for i in 0..50 {
            if let (Some(l), Some(s)) = (macd.line.value_at(i), macd.signal.value_at(i)) {
                let h = macd.histogram.value_at(i).unwrap();
                assert!((h - (l - s)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn macd_signal_seeded_from_line_mean() {
        let macd = calculate_macd(&ramp(20), 2, 4, 3);
        let start = macd.line.warmup();
        let seed_idx = start + 2;
        let expected = (start..=seed_idx)
            .map(|i| macd.line.value_at(i).unwrap())
            .sum::<f64>()
            / 3.0;
        assert!((macd.signal.value_at(seed_idx).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn macd_constant_prices_zero() {
        let macd = calculate_macd(&make_bars(&[100.0; 40]), 12, 26, 9);
        let last = macd.histogram.value_at(39).unwrap();
        assert!(last.abs() < 1e-10);
        assert!(macd.line.value_at(39).unwrap().abs() < 1e-10);
    }

    #[test]
    fn macd_slow_period_too_long() {
        let macd = calculate_macd(&ramp(10), 12, 26, 9);
        assert_eq!(macd.line.warmup(), 10);
        assert_eq!(macd.signal.warmup(), 10);
        assert_eq!(macd.histogram.warmup(), 10);
    }

    #[test]
    fn macd_zero_signal_period() {
        let macd = calculate_macd(&ramp(30), 12, 26, 0);
        assert_eq!(macd.line.warmup(), 30);
    }

    #[test]
    fn macd_indicator_types() {
        let [line, signal, hist] = calculate_macd(&ramp(5), 12, 26, 9).into_parts();
        assert_eq!(
            line.indicator_type,
            IndicatorType::MacdLine {
                fast: 12,
                slow: 26,
                signal: 9
            }
        );
        assert!(matches!(signal.indicator_type, IndicatorType::MacdSignal { .. }));
        assert!(matches!(hist.indicator_type, IndicatorType::MacdHistogram { .. }));
    }
}
