//! Strategy catalogue, parameter schemas, and per-strategy signal rules.
//!
//! The strategy set is closed: [`StrategyId`] names every variant and
//! [`Strategy`] carries the validated parameters for one of them. Each
//! variant owns a typed parameter struct, so a parameter name that is not in
//! the variant's schema is rejected instead of being ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::TradesimError;
use crate::domain::indicator::IndicatorType;
use crate::domain::indicator_helpers::IndicatorSet;
use crate::domain::signal::{
    crosses_above, crosses_above_level, crosses_below, crosses_below_level, Signal,
};

/// Raw parameter values keyed by name, as supplied by a caller.
pub type StrategyParameters = BTreeMap<String, f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    SimpleMa,
    Rsi,
    Combined,
    Macd,
}

impl StrategyId {
    pub const fn all() -> [StrategyId; 4] {
        [
            StrategyId::SimpleMa,
            StrategyId::Rsi,
            StrategyId::Combined,
            StrategyId::Macd,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::SimpleMa => "simple_ma",
            StrategyId::Rsi => "rsi",
            StrategyId::Combined => "combined",
            StrategyId::Macd => "macd",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StrategyId::SimpleMa => "Moving average crossover",
            StrategyId::Rsi => "RSI oversold/overbought reversal",
            StrategyId::Combined => "Moving average crossover filtered by RSI",
            StrategyId::Macd => "MACD line / signal line crossover confirmed by histogram",
        }
    }

    pub fn schema(&self) -> &'static [ParamSpec] {
        match self {
            StrategyId::SimpleMa => SIMPLE_MA_SCHEMA,
            StrategyId::Rsi => RSI_SCHEMA,
            StrategyId::Combined => COMBINED_SCHEMA,
            StrategyId::Macd => MACD_SCHEMA,
        }
    }

    fn expected() -> String {
        StrategyId::all()
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyId {
    type Err = TradesimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        StrategyId::all()
            .into_iter()
            .find(|id| id.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| TradesimError::UnknownStrategy {
                name: name.to_string(),
                expected: StrategyId::expected(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    Int,
    Float,
}

/// Declared range and default for one strategy parameter.
///
/// `step` is the sweep grid spacing. Integer parameters must also land on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,
    pub description: &'static str,
}

impl ParamSpec {
    const fn int(name: &'static str, min: f64, max: f64, default: f64, description: &'static str) -> Self {
        ParamSpec {
            name,
            kind: ParamKind::Int,
            min,
            max,
            step: 1.0,
            default,
            description,
        }
    }

    const fn float(name: &'static str, min: f64, max: f64, default: f64, description: &'static str) -> Self {
        ParamSpec {
            name,
            kind: ParamKind::Float,
            min,
            max,
            step: 0.5,
            default,
            description,
        }
    }

    /// Candidate values from `min` to `max` inclusive, `stride` steps apart.
    pub fn grid(&self, stride: usize) -> Vec<f64> {
        let delta = self.step * stride.max(1) as f64;
        let count = ((self.max - self.min) / delta + 1e-9).floor() as usize;
        (0..=count).map(|i| self.min + i as f64 * delta).collect()
    }

    fn check(&self, strategy: StrategyId, value: f64) -> Result<(), TradesimError> {
        if !value.is_finite() || value < self.min || value > self.max {
            return Err(TradesimError::ParameterOutOfRange {
                strategy: strategy.to_string(),
                name: self.name.to_string(),
                value,
                min: self.min,
                max: self.max,
            });
        }
        // Float steps only shape sweep grids.
        if self.kind == ParamKind::Float {
            return Ok(());
        }
        let steps = (value - self.min) / self.step;
        if (steps - steps.round()).abs() > 1e-9 {
            return Err(TradesimError::ParameterNotOnStep {
                strategy: strategy.to_string(),
                name: self.name.to_string(),
                value,
                step: self.step,
            });
        }
        Ok(())
    }
}

const SIMPLE_MA_SCHEMA: &[ParamSpec] = &[
    ParamSpec::int("short_window", 5.0, 100.0, 20.0, "Short-term moving average window"),
    ParamSpec::int("long_window", 10.0, 200.0, 50.0, "Long-term moving average window"),
];

const RSI_SCHEMA: &[ParamSpec] = &[
    ParamSpec::int("rsi_period", 2.0, 50.0, 14.0, "RSI calculation period"),
    ParamSpec::float("rsi_overbought", 60.0, 90.0, 70.0, "RSI level considered overbought"),
    ParamSpec::float("rsi_oversold", 10.0, 40.0, 30.0, "RSI level considered oversold"),
];

const COMBINED_SCHEMA: &[ParamSpec] = &[
    ParamSpec::int("ma_short", 5.0, 50.0, 20.0, "Short-term moving average window"),
    ParamSpec::int("ma_long", 20.0, 200.0, 50.0, "Long-term moving average window"),
    ParamSpec::int("rsi_period", 2.0, 50.0, 14.0, "RSI calculation period"),
    ParamSpec::float("rsi_overbought", 60.0, 90.0, 70.0, "RSI level that blocks entries and forces exits"),
];

const MACD_SCHEMA: &[ParamSpec] = &[
    ParamSpec::int("fast_period", 5.0, 50.0, 12.0, "Fast EMA period"),
    ParamSpec::int("slow_period", 10.0, 100.0, 26.0, "Slow EMA period"),
    ParamSpec::int("signal_period", 3.0, 50.0, 9.0, "Signal line period"),
];

/// Schema-checked values with defaults filled in.
struct Resolved(BTreeMap<&'static str, f64>);

impl Resolved {
    fn new(strategy: StrategyId, params: &StrategyParameters) -> Result<Self, TradesimError> {
        let schema = strategy.schema();
        if let Some(name) = params
            .keys()
            .find(|name| !schema.iter().any(|spec| spec.name == name.as_str()))
        {
            return Err(TradesimError::UnknownParameter {
                strategy: strategy.to_string(),
                name: name.clone(),
            });
        }

        let mut values = BTreeMap::new();
        for spec in schema {
            let value = params.get(spec.name).copied().unwrap_or(spec.default);
            spec.check(strategy, value)?;
            values.insert(spec.name, value);
        }
        Ok(Resolved(values))
    }

    fn float(&self, strategy: StrategyId, name: &str) -> Result<f64, TradesimError> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| TradesimError::UnknownParameter {
                strategy: strategy.to_string(),
                name: name.to_string(),
            })
    }

    fn period(&self, strategy: StrategyId, name: &str) -> Result<usize, TradesimError> {
        Ok(self.float(strategy, name)? as usize)
    }
}

fn conflict(strategy: StrategyId, reason: String) -> TradesimError {
    TradesimError::ParameterConflict {
        strategy: strategy.to_string(),
        reason,
    }
}

fn ma_cross(indicators: &IndicatorSet, short: usize, long: usize, index: usize) -> (bool, bool) {
    match (
        indicators.get(&IndicatorType::Sma(short)),
        indicators.get(&IndicatorType::Sma(long)),
    ) {
        (Some(s), Some(l)) => (crosses_above(s, l, index), crosses_below(s, l, index)),
        _ => (false, false),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimpleMaParams {
    pub short_window: usize,
    pub long_window: usize,
}

impl SimpleMaParams {
    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![
            IndicatorType::Sma(self.short_window),
            IndicatorType::Sma(self.long_window),
        ]
    }

    fn should_enter(&self, indicators: &IndicatorSet, index: usize) -> bool {
        ma_cross(indicators, self.short_window, self.long_window, index).0
    }

    fn should_exit(&self, indicators: &IndicatorSet, index: usize) -> bool {
        ma_cross(indicators, self.short_window, self.long_window, index).1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RsiParams {
    pub rsi_period: usize,
    pub rsi_overbought: f64,
    pub rsi_oversold: f64,
}

impl RsiParams {
    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![IndicatorType::Rsi(self.rsi_period)]
    }

    fn should_enter(&self, indicators: &IndicatorSet, index: usize) -> bool {
        indicators
            .get(&IndicatorType::Rsi(self.rsi_period))
            .is_some_and(|rsi| crosses_above_level(rsi, self.rsi_oversold, index))
    }

    fn should_exit(&self, indicators: &IndicatorSet, index: usize) -> bool {
        indicators
            .get(&IndicatorType::Rsi(self.rsi_period))
            .is_some_and(|rsi| crosses_below_level(rsi, self.rsi_overbought, index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CombinedParams {
    pub ma_short: usize,
    pub ma_long: usize,
    pub rsi_period: usize,
    pub rsi_overbought: f64,
}

impl CombinedParams {
    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![
            IndicatorType::Sma(self.ma_short),
            IndicatorType::Sma(self.ma_long),
            IndicatorType::Rsi(self.rsi_period),
        ]
    }

    fn should_enter(&self, indicators: &IndicatorSet, index: usize) -> bool {
        ma_cross(indicators, self.ma_short, self.ma_long, index).0
            && indicators
                .value(&IndicatorType::Rsi(self.rsi_period), index)
                .is_some_and(|rsi| rsi < self.rsi_overbought)
    }

    fn should_exit(&self, indicators: &IndicatorSet, index: usize) -> bool {
        ma_cross(indicators, self.ma_short, self.ma_long, index).1
            || indicators
                .get(&IndicatorType::Rsi(self.rsi_period))
                .is_some_and(|rsi| crosses_above_level(rsi, self.rsi_overbought, index))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdParams {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl MacdParams {
    fn line(&self) -> IndicatorType {
        IndicatorType::MacdLine {
            fast: self.fast_period,
            slow: self.slow_period,
            signal: self.signal_period,
        }
    }

    fn signal_line(&self) -> IndicatorType {
        IndicatorType::MacdSignal {
            fast: self.fast_period,
            slow: self.slow_period,
            signal: self.signal_period,
        }
    }

    fn histogram(&self) -> IndicatorType {
        IndicatorType::MacdHistogram {
            fast: self.fast_period,
            slow: self.slow_period,
            signal: self.signal_period,
        }
    }

    fn required_indicators(&self) -> Vec<IndicatorType> {
        vec![self.line(), self.signal_line(), self.histogram()]
    }

    fn should_enter(&self, indicators: &IndicatorSet, index: usize) -> bool {
        let crossed = match (
            indicators.get(&self.line()),
            indicators.get(&self.signal_line()),
        ) {
            (Some(line), Some(signal)) => crosses_above(line, signal, index),
            _ => false,
        };
        crossed
            && indicators
                .value(&self.histogram(), index)
                .is_some_and(|h| h > 0.0)
    }

    fn should_exit(&self, indicators: &IndicatorSet, index: usize) -> bool {
        let crossed = match (
            indicators.get(&self.line()),
            indicators.get(&self.signal_line()),
        ) {
            (Some(line), Some(signal)) => crosses_below(line, signal, index),
            _ => false,
        };
        crossed
            && indicators
                .value(&self.histogram(), index)
                .is_some_and(|h| h < 0.0)
    }
}

/// A strategy variant with validated parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "strategy", content = "parameters", rename_all = "snake_case")]
pub enum Strategy {
    SimpleMa(SimpleMaParams),
    Rsi(RsiParams),
    Combined(CombinedParams),
    Macd(MacdParams),
}

impl Strategy {
    /// Validate `params` against the schema of `id` and build the strategy.
    ///
    /// Missing parameters take their schema default; unknown names,
    /// out-of-range values, fractional integers, and inconsistent pairs
    /// (short >= long, oversold >= overbought, fast >= slow) are rejected.
    pub fn from_parameters(id: StrategyId, params: &StrategyParameters) -> Result<Self, TradesimError> {
        let r = Resolved::new(id, params)?;
        let strategy = match id {
            StrategyId::SimpleMa => {
                let p = SimpleMaParams {
                    short_window: r.period(id, "short_window")?,
                    long_window: r.period(id, "long_window")?,
                };
                if p.short_window >= p.long_window {
                    return Err(conflict(
                        id,
                        format!(
                            "short_window ({}) must be less than long_window ({})",
                            p.short_window, p.long_window
                        ),
                    ));
                }
                Strategy::SimpleMa(p)
            }
            StrategyId::Rsi => {
                let p = RsiParams {
                    rsi_period: r.period(id, "rsi_period")?,
                    rsi_overbought: r.float(id, "rsi_overbought")?,
                    rsi_oversold: r.float(id, "rsi_oversold")?,
                };
                if p.rsi_oversold >= p.rsi_overbought {
                    return Err(conflict(
                        id,
                        format!(
                            "rsi_oversold ({}) must be less than rsi_overbought ({})",
                            p.rsi_oversold, p.rsi_overbought
                        ),
                    ));
                }
                Strategy::Rsi(p)
            }
            StrategyId::Combined => {
                let p = CombinedParams {
                    ma_short: r.period(id, "ma_short")?,
                    ma_long: r.period(id, "ma_long")?,
                    rsi_period: r.period(id, "rsi_period")?,
                    rsi_overbought: r.float(id, "rsi_overbought")?,
                };
                if p.ma_short >= p.ma_long {
                    return Err(conflict(
                        id,
                        format!(
                            "ma_short ({}) must be less than ma_long ({})",
                            p.ma_short, p.ma_long
                        ),
                    ));
                }
                Strategy::Combined(p)
            }
            StrategyId::Macd => {
                let p = MacdParams {
                    fast_period: r.period(id, "fast_period")?,
                    slow_period: r.period(id, "slow_period")?,
                    signal_period: r.period(id, "signal_period")?,
                };
                if p.fast_period >= p.slow_period {
                    return Err(conflict(
                        id,
                        format!(
                            "fast_period ({}) must be less than slow_period ({})",
                            p.fast_period, p.slow_period
                        ),
                    ));
                }
                Strategy::Macd(p)
            }
        };
        Ok(strategy)
    }

    /// The strategy with every parameter at its schema default.
    pub fn default_for(id: StrategyId) -> Result<Self, TradesimError> {
        Strategy::from_parameters(id, &StrategyParameters::new())
    }

    pub fn id(&self) -> StrategyId {
        match self {
            Strategy::SimpleMa(_) => StrategyId::SimpleMa,
            Strategy::Rsi(_) => StrategyId::Rsi,
            Strategy::Combined(_) => StrategyId::Combined,
            Strategy::Macd(_) => StrategyId::Macd,
        }
    }

    /// Effective parameter values, including defaults.
    pub fn parameters(&self) -> StrategyParameters {
        let pairs: Vec<(&str, f64)> = match self {
            Strategy::SimpleMa(p) => vec![
                ("short_window", p.short_window as f64),
                ("long_window", p.long_window as f64),
            ],
            Strategy::Rsi(p) => vec![
                ("rsi_period", p.rsi_period as f64),
                ("rsi_overbought", p.rsi_overbought),
                ("rsi_oversold", p.rsi_oversold),
            ],
            Strategy::Combined(p) => vec![
                ("ma_short", p.ma_short as f64),
                ("ma_long", p.ma_long as f64),
                ("rsi_period", p.rsi_period as f64),
                ("rsi_overbought", p.rsi_overbought),
            ],
            Strategy::Macd(p) => vec![
                ("fast_period", p.fast_period as f64),
                ("slow_period", p.slow_period as f64),
                ("signal_period", p.signal_period as f64),
            ],
        };
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    pub fn required_indicators(&self) -> Vec<IndicatorType> {
        match self {
            Strategy::SimpleMa(p) => p.required_indicators(),
            Strategy::Rsi(p) => p.required_indicators(),
            Strategy::Combined(p) => p.required_indicators(),
            Strategy::Macd(p) => p.required_indicators(),
        }
    }

    fn should_enter(&self, indicators: &IndicatorSet, index: usize) -> bool {
        match self {
            Strategy::SimpleMa(p) => p.should_enter(indicators, index),
            Strategy::Rsi(p) => p.should_enter(indicators, index),
            Strategy::Combined(p) => p.should_enter(indicators, index),
            Strategy::Macd(p) => p.should_enter(indicators, index),
        }
    }

    fn should_exit(&self, indicators: &IndicatorSet, index: usize) -> bool {
        match self {
            Strategy::SimpleMa(p) => p.should_exit(indicators, index),
            Strategy::Rsi(p) => p.should_exit(indicators, index),
            Strategy::Combined(p) => p.should_exit(indicators, index),
            Strategy::Macd(p) => p.should_exit(indicators, index),
        }
    }

    /// Signal for bar `index`. Entries are only emitted while flat and exits
    /// only while a position is open.
    pub fn signal(&self, indicators: &IndicatorSet, index: usize, position_open: bool) -> Signal {
        if position_open {
            if self.should_exit(indicators, index) {
                return Signal::ExitLong;
            }
        } else if self.should_enter(indicators, index) {
            return Signal::EnterLong;
        }
        Signal::None
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .parameters()
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        write!(f, "{}({})", self.id(), params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::indicator_helpers::compute_indicators;

    fn params(pairs: &[(&str, f64)]) -> StrategyParameters {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn signals(strategy: &Strategy, closes: &[f64], open: bool) -> Vec<Signal> {
        let bars = make_bars(closes);
        let set = compute_indicators(&bars, &strategy.required_indicators());
        (0..bars.len())
            .map(|i| strategy.signal(&set, i, open))
            .collect()
    }

    #[test]
    fn parse_strategy_ids() {
        assert_eq!("simple_ma".parse::<StrategyId>().unwrap(), StrategyId::SimpleMa);
        assert_eq!("RSI".parse::<StrategyId>().unwrap(), StrategyId::Rsi);
        assert_eq!(" combined ".parse::<StrategyId>().unwrap(), StrategyId::Combined);
        assert_eq!("macd".parse::<StrategyId>().unwrap(), StrategyId::Macd);
    }

    #[test]
    fn unknown_strategy_lists_expected() {
        let err = "bollinger".parse::<StrategyId>().unwrap_err();
        match err {
            TradesimError::UnknownStrategy { name, expected } => {
                assert_eq!(name, "bollinger");
                assert_eq!(expected, "simple_ma, rsi, combined, macd");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn defaults_match_schema() {
        let s = Strategy::default_for(StrategyId::SimpleMa).unwrap();
        assert_eq!(
            s,
            Strategy::SimpleMa(SimpleMaParams {
                short_window: 20,
                long_window: 50
            })
        );
        for id in StrategyId::all() {
            assert!(Strategy::default_for(id).is_ok(), "{id} defaults invalid");
        }
    }

    #[test]
    fn out_of_range_rejected() {
        let err = Strategy::from_parameters(StrategyId::SimpleMa, &params(&[("short_window", 2.0)]))
            .unwrap_err();
        assert!(matches!(
            err,
            TradesimError::ParameterOutOfRange { ref name, min, .. } if name == "short_window" && min == 5.0
        ));
    }

    #[test]
    fn non_finite_rejected() {
        let err = Strategy::from_parameters(StrategyId::Rsi, &params(&[("rsi_overbought", f64::NAN)]))
            .unwrap_err();
        assert!(matches!(err, TradesimError::ParameterOutOfRange { .. }));
    }

    #[test]
    fn float_thresholds_accept_any_in_range_value() {
        let s = Strategy::from_parameters(
            StrategyId::Rsi,
            &params(&[("rsi_overbought", 72.3), ("rsi_oversold", 33.3)]),
        )
        .unwrap();
        assert_eq!(
            s,
            Strategy::Rsi(RsiParams {
                rsi_period: 14,
                rsi_overbought: 72.3,
                rsi_oversold: 33.3
            })
        );
        assert!(Strategy::from_parameters(StrategyId::Combined, &params(&[("rsi_overbought", 60.01)])).is_ok());
    }

    #[test]
    fn float_grid_uses_step_spacing() {
        let spec = RSI_SCHEMA[1];
        assert_eq!(spec.grid(20), vec![60.0, 70.0, 80.0, 90.0]);
    }

    #[test]
    fn resolved_lookup_of_undeclared_name_fails() {
        let r = Resolved::new(StrategyId::Macd, &StrategyParameters::new()).unwrap();
        assert_eq!(r.period(StrategyId::Macd, "fast_period").unwrap(), 12);
        assert!(matches!(
            r.period(StrategyId::Macd, "fast_perod"),
            Err(TradesimError::UnknownParameter { ref name, .. }) if name == "fast_perod"
        ));
    }

    #[test]
    fn fractional_integer_rejected() {
        let err = Strategy::from_parameters(StrategyId::Macd, &params(&[("fast_period", 12.5)]))
            .unwrap_err();
        assert!(matches!(err, TradesimError::ParameterNotOnStep { .. }));
    }

    #[test]
    fn unknown_parameter_rejected() {
        let err = Strategy::from_parameters(StrategyId::Rsi, &params(&[("period", 14.0)])).unwrap_err();
        assert!(matches!(
            err,
            TradesimError::UnknownParameter { ref name, .. } if name == "period"
        ));
    }

    #[test]
    fn cross_parameter_conflicts_rejected() {
        let cases = [
            (StrategyId::SimpleMa, params(&[("short_window", 50.0), ("long_window", 50.0)])),
            (StrategyId::Combined, params(&[("ma_short", 50.0), ("ma_long", 20.0)])),
            (StrategyId::Macd, params(&[("fast_period", 30.0), ("slow_period", 20.0)])),
        ];
        for (id, p) in cases {
            assert!(
                matches!(
                    Strategy::from_parameters(id, &p),
                    Err(TradesimError::ParameterConflict { .. })
                ),
                "{id} should conflict"
            );
        }
    }

    #[test]
    fn parameters_round_trip_through_validation() {
        let s = Strategy::from_parameters(
            StrategyId::Combined,
            &params(&[("ma_short", 10.0), ("rsi_overbought", 75.5)]),
        )
        .unwrap();
        let again = Strategy::from_parameters(StrategyId::Combined, &s.parameters()).unwrap();
        assert_eq!(s, again);
    }

    #[test]
    fn grid_spans_schema() {
        let spec = SIMPLE_MA_SCHEMA[0];
        let grid = spec.grid(25);
        assert_eq!(grid, vec![5.0, 30.0, 55.0, 80.0]);
    }

    #[test]
    fn simple_ma_crossover_bars() {
        // closes [10,10,11,9,12] with SMA(1) vs SMA(2):
        // diff = [-, 0, 0.5, -1, 1.5]
        let strategy = Strategy::SimpleMa(SimpleMaParams {
            short_window: 1,
            long_window: 2,
        });
        let closes = [10.0, 10.0, 11.0, 9.0, 12.0];

        let flat = signals(&strategy, &closes, false);
        assert_eq!(
            flat,
            vec![
                Signal::None,
                Signal::None,
                Signal::None,
                Signal::None,
                Signal::EnterLong
            ]
        );

        let open = signals(&strategy, &closes, true);
        assert_eq!(
            open,
            vec![
                Signal::None,
                Signal::None,
                Signal::None,
                Signal::ExitLong,
                Signal::None
            ]
        );
    }

    #[test]
    fn rsi_enters_on_oversold_recovery() {
        let strategy = Strategy::Rsi(RsiParams {
            rsi_period: 2,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
        });
        // falls hard, then recovers
        let closes = [10.0, 9.0, 8.0, 7.0, 9.0];
        let flat = signals(&strategy, &closes, false);
        assert_eq!(flat[4], Signal::EnterLong);
        assert!(flat[..4].iter().all(|s| *s == Signal::None));
    }

    #[test]
    fn rsi_exits_on_overbought_reversal() {
        let strategy = Strategy::Rsi(RsiParams {
            rsi_period: 2,
            rsi_overbought: 70.0,
            rsi_oversold: 30.0,
        });
        let closes = [10.0, 11.0, 12.0, 13.0, 11.0];
        let open = signals(&strategy, &closes, true);
        assert_eq!(open[4], Signal::ExitLong);
    }

    #[test]
    fn no_entry_while_open_and_no_exit_while_flat() {
        let strategy = Strategy::SimpleMa(SimpleMaParams {
            short_window: 1,
            long_window: 2,
        });
        let closes = [10.0, 10.0, 11.0, 9.0, 12.0];
        assert!(!signals(&strategy, &closes, true).contains(&Signal::EnterLong));
        assert!(!signals(&strategy, &closes, false).contains(&Signal::ExitLong));
    }

    #[test]
    fn short_series_yields_no_signals() {
        let strategy = Strategy::default_for(StrategyId::Combined).unwrap();
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i % 3) as f64).collect();
        assert!(signals(&strategy, &closes, false)
            .iter()
            .all(|s| *s == Signal::None));
    }

    #[test]
    fn combined_entry_blocked_when_overbought() {
        // SMA(1) crosses SMA(3) at bar 3 while RSI(2) is 80
        let closes = [10.0, 9.0, 8.0, 12.0, 13.0];
        let strategy = |rsi_overbought| {
            Strategy::Combined(CombinedParams {
                ma_short: 1,
                ma_long: 3,
                rsi_period: 2,
                rsi_overbought,
            })
        };

        assert!(!signals(&strategy(70.0), &closes, false).contains(&Signal::EnterLong));
        assert_eq!(signals(&strategy(90.0), &closes, false)[3], Signal::EnterLong);
    }

    #[test]
    fn macd_entry_needs_positive_histogram() {
        let strategy = Strategy::Macd(MacdParams {
            fast_period: 2,
            slow_period: 4,
            signal_period: 2,
        });
        // accelerating decline, then a steady rally
        let mut closes: Vec<f64> = (0..12).map(|i| 100.0 - 0.3 * (i * i) as f64).collect();
        closes.extend((1..8).map(|i| 63.7 + 3.0 * i as f64));
        let bars = make_bars(&closes);
        let set = compute_indicators(&bars, &strategy.required_indicators());

        let entries: Vec<usize> = (0..bars.len())
            .filter(|&i| strategy.signal(&set, i, false) == Signal::EnterLong)
            .collect();
        assert!(!entries.is_empty());
        for i in entries {
            let hist = IndicatorType::MacdHistogram {
                fast: 2,
                slow: 4,
                signal: 2,
            };
            assert!(set.value(&hist, i).unwrap() > 0.0);
        }
    }

    #[test]
    fn display_includes_parameters() {
        let s = Strategy::default_for(StrategyId::Macd).unwrap();
        assert_eq!(s.to_string(), "macd(fast_period=12,signal_period=9,slow_period=26)");
    }
}
