//! Configuration loading and validation.
//!
//! Reads the INI sections through [`ConfigPort`], applies defaults, and
//! rejects malformed, unknown, or out-of-range values before any run starts.
//!
//! ```ini
//! [backtest]      data source, capital, sizing, risk and cost settings
//! [engine]        max_concurrent_runs
//! [strategy]      name
//! [<strategy id>] parameters for that strategy
//! ```

use std::path::PathBuf;

use chrono::NaiveDate;

use super::backtest::{EngineConfig, RunConfig};
use super::error::TradesimError;
use super::ohlcv::MS_PER_DAY;
use super::strategy::{Strategy, StrategyId, StrategyParameters};
use crate::ports::config_port::ConfigPort;

const BACKTEST_KEYS: &[&str] = &[
    "symbol",
    "data_dir",
    "start_date",
    "end_date",
    "initial_capital",
    "position_size",
    "stop_loss",
    "take_profit",
    "commission",
    "annualization_factor",
];
const ENGINE_KEYS: &[&str] = &["max_concurrent_runs"];
const STRATEGY_KEYS: &[&str] = &["name"];

/// Where the price series comes from and which part of it to use.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSettings {
    pub symbol: Option<String>,
    pub data_dir: PathBuf,
    /// Inclusive bounds in epoch milliseconds.
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> TradesimError {
    TradesimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

/// Check a run configuration against the accepted ranges.
pub fn validate_run_config(config: &RunConfig) -> Result<(), TradesimError> {
    let RunConfig {
        initial_capital,
        position_size,
        stop_loss,
        take_profit,
        commission,
        annualization_factor,
    } = *config;

    if !initial_capital.is_finite() || initial_capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    if !(position_size > 0.0 && position_size <= 1.0) {
        return Err(invalid(
            "backtest",
            "position_size",
            "position_size must be in (0, 1]",
        ));
    }
    if !(stop_loss > 0.0 && stop_loss < 1.0) {
        return Err(invalid("backtest", "stop_loss", "stop_loss must be in (0, 1)"));
    }
    if !(take_profit > 0.0 && take_profit < 1.0) {
        return Err(invalid(
            "backtest",
            "take_profit",
            "take_profit must be in (0, 1)",
        ));
    }
    if !(commission >= 0.0 && commission < 1.0) {
        return Err(invalid("backtest", "commission", "commission must be in [0, 1)"));
    }
    if let Some(factor) = annualization_factor {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(invalid(
                "backtest",
                "annualization_factor",
                "annualization_factor must be positive",
            ));
        }
    }
    Ok(())
}

fn reject_unknown_keys(
    config: &dyn ConfigPort,
    section: &str,
    allowed: &[&str],
) -> Result<(), TradesimError> {
    match config
        .keys(section)
        .into_iter()
        .find(|k| !allowed.contains(&k.as_str()))
    {
        Some(key) => Err(invalid(
            section,
            &key,
            format!("unknown key (expected one of: {})", allowed.join(", ")),
        )),
        None => Ok(()),
    }
}

fn read_f64(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<f64>, TradesimError> {
    config
        .get_string(section, key)
        .map(|raw| {
            raw.parse::<f64>()
                .map_err(|_| invalid(section, key, format!("'{raw}' is not a number")))
        })
        .transpose()
}

fn read_usize(config: &dyn ConfigPort, section: &str, key: &str) -> Result<Option<usize>, TradesimError> {
    config
        .get_string(section, key)
        .map(|raw| {
            raw.parse::<usize>()
                .map_err(|_| invalid(section, key, format!("'{raw}' is not a whole number")))
        })
        .transpose()
}

fn parse_date(raw: &str, key: &str) -> Result<NaiveDate, TradesimError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        invalid(
            "backtest",
            key,
            format!("invalid {key} format, expected YYYY-MM-DD"),
        )
    })
}

fn date_start_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .unwrap_or_default()
}

/// Load `[backtest]` run settings, defaulting anything absent.
pub fn load_run_config(config: &dyn ConfigPort) -> Result<RunConfig, TradesimError> {
    reject_unknown_keys(config, "backtest", BACKTEST_KEYS)?;
    let defaults = RunConfig::default();

    let run = RunConfig {
        initial_capital: read_f64(config, "backtest", "initial_capital")?
            .unwrap_or(defaults.initial_capital),
        position_size: read_f64(config, "backtest", "position_size")?
            .unwrap_or(defaults.position_size),
        stop_loss: read_f64(config, "backtest", "stop_loss")?.unwrap_or(defaults.stop_loss),
        take_profit: read_f64(config, "backtest", "take_profit")?.unwrap_or(defaults.take_profit),
        commission: read_f64(config, "backtest", "commission")?.unwrap_or(defaults.commission),
        annualization_factor: read_f64(config, "backtest", "annualization_factor")?,
    };
    validate_run_config(&run)?;
    Ok(run)
}

/// Load `[backtest]` data source settings.
pub fn load_data_settings(config: &dyn ConfigPort) -> Result<DataSettings, TradesimError> {
    reject_unknown_keys(config, "backtest", BACKTEST_KEYS)?;

    let start = config
        .get_string("backtest", "start_date")
        .map(|raw| parse_date(&raw, "start_date"))
        .transpose()?;
    let end = config
        .get_string("backtest", "end_date")
        .map(|raw| parse_date(&raw, "end_date"))
        .transpose()?;

    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }

    Ok(DataSettings {
        symbol: config.get_string("backtest", "symbol"),
        data_dir: config
            .get_string("backtest", "data_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("data")),
        start_ms: start.map(date_start_ms),
        // end date covers its whole day
        end_ms: end.map(|d| date_start_ms(d) + MS_PER_DAY - 1),
    })
}

/// Load `[engine]` settings.
pub fn load_engine_config(config: &dyn ConfigPort) -> Result<EngineConfig, TradesimError> {
    reject_unknown_keys(config, "engine", ENGINE_KEYS)?;
    match read_usize(config, "engine", "max_concurrent_runs")? {
        Some(0) => Err(invalid(
            "engine",
            "max_concurrent_runs",
            "max_concurrent_runs must be at least 1",
        )),
        Some(n) => Ok(EngineConfig {
            max_concurrent_runs: n,
        }),
        None => Ok(EngineConfig::default()),
    }
}

/// The strategy named in `[strategy] name`, if any.
pub fn load_strategy_id(config: &dyn ConfigPort) -> Result<Option<StrategyId>, TradesimError> {
    reject_unknown_keys(config, "strategy", STRATEGY_KEYS)?;
    config
        .get_string("strategy", "name")
        .map(|name| name.parse::<StrategyId>())
        .transpose()
}

/// Raw parameter values from the section named after `id`.
pub fn load_strategy_parameters(
    config: &dyn ConfigPort,
    id: StrategyId,
) -> Result<StrategyParameters, TradesimError> {
    let section = id.as_str();
    let mut params = StrategyParameters::new();
    for key in config.keys(section) {
        if let Some(value) = read_f64(config, section, &key)? {
            params.insert(key, value);
        }
    }
    Ok(params)
}

/// Build `id` from its config section, validating against its schema.
pub fn load_strategy(config: &dyn ConfigPort, id: StrategyId) -> Result<Strategy, TradesimError> {
    Strategy::from_parameters(id, &load_strategy_parameters(config, id)?)
}

/// Load and check every section, as a dry run would.
pub fn validate_config(config: &dyn ConfigPort) -> Result<(), TradesimError> {
    load_run_config(config)?;
    load_data_settings(config)?;
    load_engine_config(config)?;
    if let Some(id) = load_strategy_id(config)? {
        load_strategy(config, id)?;
    }
    for id in StrategyId::all() {
        if config.has_section(id.as_str()) {
            load_strategy(config, id)?;
        }
    }
    Ok(())
}
