//! Bollinger Bands indicator.
//!
//! Bollinger Bands consist of:
//! - Middle: Simple Moving Average (SMA) over n periods
//! - Upper: Middle + (multiplier × StdDev)
//! - Lower: Middle - (multiplier × StdDev)
//!
//! Where StdDev is population standard deviation (divides by N, not N-1).
//! The multiplier is carried as hundredths so the bands can key a map.
//!
//! Default parameters: period=20, multiplier=2.0
//! Warmup: first (period-1) bars are undefined.

use crate::domain::indicator::{rolling_stddev, sma_values, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::Bar;

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerSeries {
    pub upper: IndicatorSeries,
    pub middle: IndicatorSeries,
    pub lower: IndicatorSeries,
}

impl BollingerSeries {
    pub fn into_parts(self) -> [IndicatorSeries; 3] {
        [self.upper, self.middle, self.lower]
    }
}

pub fn calculate_bollinger(bars: &[Bar], period: usize, stddev_mult_x100: u32) -> BollingerSeries {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let mult = stddev_mult_x100 as f64 / 100.0;

    let middle = sma_values(&closes, period);
    let stddev = rolling_stddev(&closes, period);

    let upper = middle.iter().zip(&stddev).map(|(m, s)| m + mult * s).collect();
    let lower = middle.iter().zip(&stddev).map(|(m, s)| m - mult * s).collect();

    BollingerSeries {
        upper: IndicatorSeries {
            indicator_type: IndicatorType::BollingerUpper {
                period,
                stddev_mult_x100,
            },
            values: upper,
        },
        middle: IndicatorSeries {
            indicator_type: IndicatorType::BollingerMiddle {
                period,
                stddev_mult_x100,
            },
            values: middle,
        },
        lower: IndicatorSeries {
            indicator_type: IndicatorType::BollingerLower {
                period,
                stddev_mult_x100,
            },
            values: lower,
        },
    }
}
