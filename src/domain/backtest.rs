//! Backtest orchestration.
//!
//! A single run wires indicators, signals, the simulator, and metrics over
//! one series. Batches of independent runs (strategy comparisons, parameter
//! sweeps) execute on a rayon pool capped at the configured concurrency;
//! every run owns its own state and only the series is shared, read-only.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use super::config_validation::validate_run_config;
use super::error::TradesimError;
use super::execution::ExecutionParams;
use super::indicator_helpers::compute_indicators;
use super::metrics::{annualization_factor, BacktestMetrics, RankMetric};
use super::ohlcv::Series;
use super::portfolio::EquityPoint;
use super::position::Trade;
use super::signal::SignalEvent;
use super::simulator::simulate;
use super::strategy::{Strategy, StrategyId, StrategyParameters};

/// Run-level capital, sizing, and cost settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunConfig {
    pub initial_capital: f64,
    pub position_size: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub commission: f64,
    /// Bars per year for Sharpe/Sortino; derived from bar spacing when `None`.
    pub annualization_factor: Option<f64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            initial_capital: 10_000.0,
            position_size: 1.0,
            stop_loss: 0.02,
            take_profit: 0.03,
            commission: 0.001,
            annualization_factor: None,
        }
    }
}

impl RunConfig {
    pub fn execution_params(&self) -> ExecutionParams {
        ExecutionParams {
            position_size: self.position_size,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
            commission: self.commission,
        }
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub max_concurrent_runs: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_concurrent_runs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        }
    }
}

/// A validated run: a strategy with checked parameters plus checked run settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BacktestRequest {
    strategy: Strategy,
    config: RunConfig,
}

impl BacktestRequest {
    /// Validate everything a run needs before any state is created.
    pub fn new(
        strategy: StrategyId,
        params: &StrategyParameters,
        config: RunConfig,
    ) -> Result<Self, TradesimError> {
        validate_run_config(&config)?;
        let strategy = Strategy::from_parameters(strategy, params)?;
        Ok(BacktestRequest { strategy, config })
    }

    /// Wrap an already-built strategy, validating only the run settings.
    pub fn for_strategy(strategy: Strategy, config: RunConfig) -> Result<Self, TradesimError> {
        validate_run_config(&config)?;
        Ok(BacktestRequest { strategy, config })
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestResult {
    pub strategy: StrategyId,
    pub parameters: StrategyParameters,
    pub trades: Vec<Trade>,
    pub metrics: BacktestMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub signals: Vec<SignalEvent>,
    /// Equity hit zero mid-run and the remaining bars ran flat.
    pub capital_exhausted: bool,
    pub bars: usize,
    pub annualization_factor: f64,
}

impl BacktestResult {
    pub fn label(&self) -> String {
        let params = self
            .parameters
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        format!("{}({})", self.strategy, params)
    }
}

/// Run one validated request over `series`.
///
/// Deterministic: the same series and request always produce the same result.
pub fn run_backtest(series: &Series, request: &BacktestRequest) -> BacktestResult {
    let strategy = request.strategy();
    let config = request.config();
    let bars = series.bars();

    debug!(strategy = %strategy, bars = bars.len(), "backtest started");

    let indicators = compute_indicators(bars, &strategy.required_indicators());
    let outcome = simulate(
        bars,
        strategy,
        &indicators,
        &config.execution_params(),
        config.initial_capital,
    );

    let factor = config
        .annualization_factor
        .unwrap_or_else(|| annualization_factor(series.median_interval_ms()));
    let metrics = BacktestMetrics::compute(
        &outcome.equity_curve,
        &outcome.trades,
        config.initial_capital,
        factor,
        outcome.bars_in_market,
    );

    debug!(
        strategy = %strategy,
        trades = outcome.trades.len(),
        total_return = metrics.total_return,
        capital_exhausted = outcome.capital_exhausted,
        "backtest finished"
    );

    BacktestResult {
        strategy: strategy.id(),
        parameters: strategy.parameters(),
        trades: outcome.trades,
        metrics,
        equity_curve: outcome.equity_curve,
        signals: outcome.signals,
        capital_exhausted: outcome.capital_exhausted,
        bars: bars.len(),
        annualization_factor: factor,
    }
}

/// Run independent requests concurrently, at most `max_concurrent` at a time.
///
/// Results come back in request order.
pub fn run_many(
    series: &Series,
    requests: &[BacktestRequest],
    max_concurrent: usize,
) -> Result<Vec<BacktestResult>, TradesimError> {
    if max_concurrent == 0 {
        return Err(TradesimError::ConfigInvalid {
            section: "engine".to_string(),
            key: "max_concurrent_runs".to_string(),
            reason: "max_concurrent_runs must be at least 1".to_string(),
        });
    }

    let threads = max_concurrent.min(requests.len().max(1));
    info!(runs = requests.len(), threads, "running backtest batch");

    if threads == 1 {
        return Ok(requests.iter().map(|r| run_backtest(series, r)).collect());
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| TradesimError::ConfigInvalid {
            section: "engine".to_string(),
            key: "max_concurrent_runs".to_string(),
            reason: format!("failed to start worker pool: {e}"),
        })?;

    Ok(pool.install(|| {
        requests
            .par_iter()
            .map(|r| run_backtest(series, r))
            .collect()
    }))
}

/// Candidate values per parameter name.
pub type ParameterGrid = BTreeMap<String, Vec<f64>>;

/// Cartesian product of `grid` over `base`, validated per combination.
///
/// Combinations that only violate a cross-parameter constraint (for example
/// short window >= long window) are skipped. Any other invalid value fails
/// the whole expansion.
pub fn expand_grid(
    strategy: StrategyId,
    base: &StrategyParameters,
    grid: &ParameterGrid,
) -> Result<Vec<Strategy>, TradesimError> {
    let mut combos: Vec<StrategyParameters> = vec![base.clone()];
    for (name, values) in grid {
        let mut next = Vec::with_capacity(combos.len() * values.len().max(1));
        for combo in &combos {
            for &value in values {
                let mut params = combo.clone();
                params.insert(name.clone(), value);
                next.push(params);
            }
        }
        combos = next;
    }

    let mut strategies = Vec::with_capacity(combos.len());
    for params in &combos {
        match Strategy::from_parameters(strategy, params) {
            Ok(s) => {
                if !strategies.contains(&s) {
                    strategies.push(s);
                }
            }
            Err(TradesimError::ParameterConflict { .. }) => continue,
            Err(e) => return Err(e),
        }
    }

    if strategies.is_empty() {
        return Err(TradesimError::ParameterConflict {
            strategy: strategy.to_string(),
            reason: "no parameter combination in the grid is valid".to_string(),
        });
    }
    Ok(strategies)
}

/// Order results best-first by `metric`; undefined scores go last.
pub fn rank_results(mut results: Vec<BacktestResult>, metric: RankMetric) -> Vec<BacktestResult> {
    results.sort_by(|a, b| {
        match (metric.score(&a.metrics), metric.score(&b.metrics)) {
            (Some(x), Some(y)) => y.total_cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
    });
    results
}

/// Expand `grid`, run every combination concurrently, and rank the results.
pub fn sweep(
    series: &Series,
    strategy: StrategyId,
    base: &StrategyParameters,
    grid: &ParameterGrid,
    config: RunConfig,
    engine: &EngineConfig,
    metric: RankMetric,
) -> Result<Vec<BacktestResult>, TradesimError> {
    let requests = expand_grid(strategy, base, grid)?
        .into_iter()
        .map(|s| BacktestRequest::for_strategy(s, config))
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        strategy = %strategy,
        combinations = requests.len(),
        rank_by = %metric,
        "parameter sweep"
    );

    let results = run_many(series, &requests, engine.max_concurrent_runs)?;
    Ok(rank_results(results, metric))
}
