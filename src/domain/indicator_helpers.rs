//! Computing and looking up the indicators a strategy needs.

use std::collections::HashMap;

use crate::domain::indicator::{
    calculate_bollinger, calculate_ema, calculate_macd, calculate_rsi, calculate_sma,
    calculate_stddev, IndicatorSeries, IndicatorType,
};
use crate::domain::ohlcv::Bar;

/// Pre-computed indicator series keyed by type, all aligned with one bar slice.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    series: HashMap<IndicatorType, IndicatorSeries>,
}

impl IndicatorSet {
    pub fn get(&self, indicator_type: &IndicatorType) -> Option<&IndicatorSeries> {
        self.series.get(indicator_type)
    }

    /// Value of `indicator_type` at `index`, `None` if absent or undefined.
    pub fn value(&self, indicator_type: &IndicatorType, index: usize) -> Option<f64> {
        self.get(indicator_type).and_then(|s| s.value_at(index))
    }

    pub fn insert(&mut self, series: IndicatorSeries) {
        self.series.insert(series.indicator_type, series);
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn types(&self) -> impl Iterator<Item = &IndicatorType> {
        self.series.keys()
    }
}

/// Compute every requested indicator once over `bars`.
///
/// Multi-output indicators (MACD, Bollinger) are calculated once per
/// parameter set and all three components are stored, whichever of them
/// was asked for.
pub fn compute_indicators(bars: &[Bar], types: &[IndicatorType]) -> IndicatorSet {
    let mut set = IndicatorSet::default();

    for &indicator_type in types {
        if set.get(&indicator_type).is_some() {
            continue;
        }
        match indicator_type {
            IndicatorType::Sma(period) => set.insert(calculate_sma(bars, period)),
            IndicatorType::Ema(period) => set.insert(calculate_ema(bars, period)),
            IndicatorType::Rsi(period) => set.insert(calculate_rsi(bars, period)),
            IndicatorType::Stddev(period) => set.insert(calculate_stddev(bars, period)),
            IndicatorType::MacdLine { fast, slow, signal }
            | IndicatorType::MacdSignal { fast, slow, signal }
            | IndicatorType::MacdHistogram { fast, slow, signal } => {
                for part in calculate_macd(bars, fast, slow, signal).into_parts() {
                    set.insert(part);
                }
            }
            IndicatorType::BollingerUpper {
                period,
                stddev_mult_x100,
            }
            | IndicatorType::BollingerMiddle {
                period,
                stddev_mult_x100,
            }
            | IndicatorType::BollingerLower {
                period,
                stddev_mult_x100,
            } => {
                for part in calculate_bollinger(bars, period, stddev_mult_x100).into_parts() {
                    set.insert(part);
                }
            }
        }
    }

    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn computes_each_requested_type() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let set = compute_indicators(&bars, &[IndicatorType::Sma(2), IndicatorType::Rsi(3)]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.value(&IndicatorType::Sma(2), 1), Some(1.5));
        assert_eq!(set.value(&IndicatorType::Rsi(3), 5), Some(100.0));
        assert_eq!(set.value(&IndicatorType::Ema(2), 1), None);
    }

    #[test]
    fn duplicate_requests_computed_once() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let set = compute_indicators(&bars, &[IndicatorType::Sma(2), IndicatorType::Sma(2)]);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn macd_component_brings_siblings() {
        let bars = make_bars(&(0..30).map(|i| 10.0 + i as f64).collect::<Vec<_>>());
        let signal = IndicatorType::MacdSignal {
            fast: 3,
            slow: 6,
            signal: 4,
        };
        let set = compute_indicators(&bars, &[signal]);

        assert_eq!(set.len(), 3);
        assert!(set
            .get(&IndicatorType::MacdLine {
                fast: 3,
                slow: 6,
                signal: 4
            })
            .is_some());
    }

    #[test]
    fn bollinger_component_brings_siblings() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let lower = IndicatorType::BollingerLower {
            period: 2,
            stddev_mult_x100: 200,
        };
        let set = compute_indicators(&bars, &[lower]);
        assert_eq!(set.len(), 3);
        assert!(set.value(&lower, 1).is_some());
    }

    #[test]
    fn missing_indicator_is_none() {
        let set = IndicatorSet::default();
        assert!(set.is_empty());
        assert_eq!(set.value(&IndicatorType::Sma(5), 0), None);
    }
}
