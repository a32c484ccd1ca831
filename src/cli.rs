//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::{
    self as engine, BacktestRequest, BacktestResult, ParameterGrid,
};
use crate::domain::config_validation::{
    load_data_settings, load_engine_config, load_run_config, load_strategy,
    load_strategy_id, load_strategy_parameters, validate_config,
};
use crate::domain::error::TradesimError;
use crate::domain::metrics::RankMetric;
use crate::domain::ohlcv::Series;
use crate::domain::strategy::{ParamKind, Strategy, StrategyId};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

/// Upper bound on values generated from one `start:end:step` range.
const MAX_RANGE_VALUES: usize = 10_000;

#[derive(Parser, Debug)]
#[command(name = "tradesim", about = "Single-instrument strategy backtester")]
pub struct Cli {
    /// Log filter used when TRADESIM_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
    /// `text` or `json`
    #[arg(long, global = true, default_value = "text")]
    pub log_format: String,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one strategy over one symbol
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [strategy] name
        #[arg(short, long)]
        strategy: Option<String>,
        /// Overrides [backtest] symbol
        #[arg(long)]
        symbol: Option<String>,
        /// Write the result as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run several strategies concurrently over the same series
    Compare {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated strategy ids; all strategies when omitted
        #[arg(short, long, value_delimiter = ',')]
        strategies: Vec<String>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Run a parameter grid and rank the results
    Sweep {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<String>,
        /// `name=v1,v2,...` or `name=start:end:step`; repeatable
        #[arg(short, long = "param", value_name = "NAME=VALUES")]
        params: Vec<String>,
        /// Schema steps between candidates for parameters without --param
        #[arg(long, default_value_t = 10)]
        stride: usize,
        #[arg(long, default_value = "sharpe_ratio")]
        rank_by: String,
        /// Rows to print
        #[arg(long, default_value_t = 10)]
        top: usize,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List strategies and their parameter schemas
    Strategies,
    /// Check a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn init_tracing(log_level: &str, log_format: &str) -> Result<(), String> {
    let filter = std::env::var("TRADESIM_LOG").unwrap_or_else(|_| log_level.to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;

    let format = log_format.trim().to_lowercase();
    let installed = if format == "json" {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .try_init()
    };
    installed.map_err(|err| format!("failed to install log subscriber: {err}"))
}

pub fn run(cli: Cli) -> ExitCode {
    if let Err(err) = init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {err}");
        return ExitCode::from(2);
    }

    let outcome = match cli.command {
        Command::Backtest {
            config,
            strategy,
            symbol,
            output,
        } => run_backtest(&config, strategy.as_deref(), symbol.as_deref(), output.as_deref()),
        Command::Compare {
            config,
            strategies,
            symbol,
            output,
        } => run_compare(&config, &strategies, symbol.as_deref(), output.as_deref()),
        Command::Sweep {
            config,
            strategy,
            params,
            stride,
            rank_by,
            top,
            symbol,
            output,
        } => run_sweep(
            &config,
            &SweepArgs {
                strategy: strategy.as_deref(),
                params: &params,
                stride,
                rank_by: &rank_by,
                top,
                symbol: symbol.as_deref(),
                output: output.as_deref(),
            },
        ),
        Command::Strategies => {
            print_strategies();
            Ok(())
        }
        Command::Validate { config } => run_validate(&config),
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, TradesimError> {
    eprintln!("Loading config from {}", path.display());
    FileConfigAdapter::from_file(path)
}

fn data_port_for(config: &dyn ConfigPort) -> Result<CsvAdapter, TradesimError> {
    Ok(CsvAdapter::new(load_data_settings(config)?.data_dir))
}

/// Fetch the configured symbol (or `symbol_override`) within the configured dates.
pub fn load_series(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    symbol_override: Option<&str>,
) -> Result<Series, TradesimError> {
    let settings = load_data_settings(config)?;
    let symbol = symbol_override
        .map(str::to_string)
        .or(settings.symbol)
        .ok_or_else(|| TradesimError::ConfigMissing {
            section: "backtest".into(),
            key: "symbol".into(),
        })?;
    let series = data_port
        .fetch_range(&symbol, settings.start_ms, settings.end_ms)
        .map_err(|err| with_symbol_hint(data_port, &symbol, err))?;
    eprintln!("Loaded {} bars for {}", series.len(), symbol);
    Ok(series)
}

/// Replace a load failure for an unknown symbol with one listing the known ones.
fn with_symbol_hint(data_port: &dyn DataPort, symbol: &str, err: TradesimError) -> TradesimError {
    match data_port.list_symbols() {
        Ok(symbols) if !symbols.iter().any(|s| s == symbol) => TradesimError::Data {
            reason: format!(
                "no data for symbol {} (available: {})",
                symbol,
                if symbols.is_empty() {
                    "none".to_string()
                } else {
                    symbols.join(", ")
                }
            ),
        },
        _ => err,
    }
}

/// The strategy named on the command line or in `[strategy] name`.
pub fn resolve_strategy_id(
    config: &dyn ConfigPort,
    name_override: Option<&str>,
) -> Result<StrategyId, TradesimError> {
    match name_override {
        Some(name) => name.parse(),
        None => load_strategy_id(config)?.ok_or_else(|| TradesimError::ConfigMissing {
            section: "strategy".into(),
            key: "name".into(),
        }),
    }
}

/// Parse `name=v1,v2` or `name=start:end:step` into one grid axis.
pub fn parse_grid_arg(raw: &str) -> Result<(String, Vec<f64>), TradesimError> {
    let invalid = |key: &str, reason: String| TradesimError::ConfigInvalid {
        section: "sweep".into(),
        key: key.to_string(),
        reason,
    };

    let (name, spec) = raw
        .split_once('=')
        .ok_or_else(|| invalid("param", format!("'{raw}' is not NAME=VALUES")))?;
    let name = name.trim().to_lowercase();
    let spec = spec.trim();
    if name.is_empty() || spec.is_empty() {
        return Err(invalid("param", format!("'{raw}' is not NAME=VALUES")));
    }

    let number = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(name.as_str(), format!("'{}' is not a number", s.trim())))
    };

    let parts: Vec<&str> = spec.split(':').collect();
    let values = match parts.as_slice() {
        [start, end, step] => {
            let (start, end, step) = (number(*start)?, number(*end)?, number(*step)?);
            if step <= 0.0 || end < start {
                return Err(invalid(
                    &name,
                    "range must satisfy start <= end and step > 0".to_string(),
                ));
            }
            let count = ((end - start) / step + 1e-9).floor() as usize + 1;
            if count > MAX_RANGE_VALUES {
                return Err(invalid(name.as_str(), format!("range yields {count} values")));
            }
            (0..count)
                .map(|i| ((start + i as f64 * step) * 1e9).round() / 1e9)
                .collect()
        }
        [list] => list.split(',').map(number).collect::<Result<Vec<_>, _>>()?,
        _ => {
            return Err(invalid(
                &name,
                format!("'{spec}' is neither a list nor start:end:step"),
            ))
        }
    };
    Ok((name, values))
}

/// Explicit axes from `--param`, schema grids for every other parameter.
pub fn build_grid(id: StrategyId, args: &[String], stride: usize) -> Result<ParameterGrid, TradesimError> {
    let mut grid = ParameterGrid::new();
    for raw in args {
        let (name, values) = parse_grid_arg(raw)?;
        grid.insert(name, values);
    }
    for spec in id.schema() {
        grid.entry(spec.name.to_string())
            .or_insert_with(|| spec.grid(stride));
    }
    Ok(grid)
}

fn write_report(results: &[BacktestResult], output: Option<&Path>) -> Result<(), TradesimError> {
    let Some(path) = output else {
        return Ok(());
    };
    let path_str = path.to_str().ok_or_else(|| TradesimError::Report {
        reason: format!("output path {} is not valid UTF-8", path.display()),
    })?;
    let adapter = JsonReportAdapter::new();
    match results {
        [single] => adapter.write(single, path_str)?,
        many => adapter.write_many(many, path_str)?,
    }
    eprintln!("\nReport written to: {}", path.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    let m = &result.metrics;
    eprintln!("\n=== {} ===", result.label());
    eprintln!("Bars:             {}", result.bars);
    eprintln!("Total Return:     {:.2}%", m.total_return * 100.0);
    eprintln!("Annual Return:    {}", percent(m.annual_return.value()));
    eprintln!("Sharpe Ratio:     {:.2}", m.sharpe_ratio);
    eprintln!("Sortino Ratio:    {:.2}", m.sortino_ratio);
    eprintln!("Max Drawdown:     -{:.1}%", m.max_drawdown * 100.0);
    eprintln!("Total Trades:     {}", m.total_trades);
    eprintln!("Win Rate:         {:.1}%", m.win_rate * 100.0);
    eprintln!("Profit Factor:    {:.2}", m.profit_factor);
    eprintln!("Commission Paid:  {:.2}", m.commission_paid);
    eprintln!("Final Equity:     {:.2}", m.final_equity);
    if result.capital_exhausted {
        eprintln!("warning: capital exhausted; remaining bars ran flat");
    }
}

fn percent(value: Option<f64>) -> String {
    value.map_or_else(|| "undefined".to_string(), |v| format!("{:.2}%", v * 100.0))
}

fn print_table(results: &[BacktestResult]) {
    println!(
        "{:<4} {:<60} {:>10} {:>8} {:>8} {:>7} {:>8}",
        "#", "run", "return", "sharpe", "max_dd", "trades", "win"
    );
    for (rank, r) in results.iter().enumerate() {
        let m = &r.metrics;
        println!(
            "{:<4} {:<60} {:>9.2}% {:>8.2} {:>7.1}% {:>7} {:>7.1}%",
            rank + 1,
            r.label(),
            m.total_return * 100.0,
            m.sharpe_ratio,
            m.max_drawdown * 100.0,
            m.total_trades,
            m.win_rate * 100.0,
        );
    }
}

/// Load, run and report one backtest.
pub fn backtest_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    strategy_override: Option<&str>,
    symbol_override: Option<&str>,
    output: Option<&Path>,
) -> Result<BacktestResult, TradesimError> {
    let run_config = load_run_config(config)?;
    let id = resolve_strategy_id(config, strategy_override)?;
    let strategy = load_strategy(config, id)?;
    let request = BacktestRequest::for_strategy(strategy, run_config)?;

    let series = load_series(data_port, config, symbol_override)?;
    eprintln!("Running backtest: {}", request.strategy());
    let result = engine::run_backtest(&series, &request);

    print_summary(&result);
    write_report(std::slice::from_ref(&result), output)?;
    Ok(result)
}

/// Run several strategies over one series. An empty list means every strategy.
pub fn compare_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    strategy_names: &[String],
    symbol_override: Option<&str>,
    output: Option<&Path>,
) -> Result<Vec<BacktestResult>, TradesimError> {
    let run_config = load_run_config(config)?;
    let engine_config = load_engine_config(config)?;

    let ids: Vec<StrategyId> = if strategy_names.is_empty() {
        StrategyId::all().to_vec()
    } else {
        strategy_names
            .iter()
            .map(|n| n.parse::<StrategyId>())
            .collect::<Result<Vec<_>, _>>()?
    };
    let requests = ids
        .into_iter()
        .map(|id| BacktestRequest::for_strategy(load_strategy(config, id)?, run_config))
        .collect::<Result<Vec<_>, TradesimError>>()?;

    let series = load_series(data_port, config, symbol_override)?;
    eprintln!(
        "Comparing {} strategies ({} at a time)",
        requests.len(),
        engine_config.max_concurrent_runs
    );
    let results = engine::run_many(&series, &requests, engine_config.max_concurrent_runs)?;

    print_table(&results);
    write_report(&results, output)?;
    Ok(results)
}

pub struct SweepArgs<'a> {
    pub strategy: Option<&'a str>,
    pub params: &'a [String],
    pub stride: usize,
    pub rank_by: &'a str,
    pub top: usize,
    pub symbol: Option<&'a str>,
    pub output: Option<&'a Path>,
}

/// Expand a parameter grid, run it concurrently, print and report the ranking.
pub fn sweep_pipeline(
    data_port: &dyn DataPort,
    config: &dyn ConfigPort,
    args: &SweepArgs<'_>,
) -> Result<Vec<BacktestResult>, TradesimError> {
    let run_config = load_run_config(config)?;
    let engine_config = load_engine_config(config)?;
    let metric: RankMetric = args.rank_by.parse()?;
    let id = resolve_strategy_id(config, args.strategy)?;
    let base = load_strategy_parameters(config, id)?;
    let grid = build_grid(id, args.params, args.stride)?;

    let series = load_series(data_port, config, args.symbol)?;
    let results = engine::sweep(&series, id, &base, &grid, run_config, &engine_config, metric)?;

    eprintln!("Ranked {} runs by {}", results.len(), metric);
    print_table(&results[..results.len().min(args.top)]);
    write_report(&results, args.output)?;
    Ok(results)
}

fn run_backtest(
    config_path: &Path,
    strategy: Option<&str>,
    symbol: Option<&str>,
    output: Option<&Path>,
) -> Result<(), TradesimError> {
    let config = load_config(config_path)?;
    let data_port = data_port_for(&config)?;
    backtest_pipeline(&data_port, &config, strategy, symbol, output).map(|_| ())
}

fn run_compare(
    config_path: &Path,
    strategies: &[String],
    symbol: Option<&str>,
    output: Option<&Path>,
) -> Result<(), TradesimError> {
    let config = load_config(config_path)?;
    let data_port = data_port_for(&config)?;
    compare_pipeline(&data_port, &config, strategies, symbol, output).map(|_| ())
}

fn run_sweep(config_path: &Path, args: &SweepArgs<'_>) -> Result<(), TradesimError> {
    let config = load_config(config_path)?;
    let data_port = data_port_for(&config)?;
    sweep_pipeline(&data_port, &config, args).map(|_| ())
}

pub fn run_validate(config_path: &Path) -> Result<(), TradesimError> {
    let config = load_config(config_path)?;
    validate_config(&config)?;

    let run = load_run_config(&config)?;
    let engine_config = load_engine_config(&config)?;
    let data = load_data_settings(&config)?;
    eprintln!("Config validated successfully");
    eprintln!("  symbol:          {}", data.symbol.as_deref().unwrap_or("(unset)"));
    eprintln!("  data_dir:        {}", data.data_dir.display());
    eprintln!("  initial_capital: {}", run.initial_capital);
    eprintln!("  position_size:   {}", run.position_size);
    eprintln!("  stop_loss:       {}", run.stop_loss);
    eprintln!("  take_profit:     {}", run.take_profit);
    eprintln!("  commission:      {}", run.commission);
    eprintln!("  max_concurrent:  {}", engine_config.max_concurrent_runs);
    if let Some(id) = load_strategy_id(&config)? {
        eprintln!("  strategy:        {}", load_strategy(&config, id)?);
    }
    Ok(())
}

fn print_strategies() {
    for id in StrategyId::all() {
        println!("{} - {}", id, id.description());
        for spec in id.schema() {
            let kind = match spec.kind {
                ParamKind::Int => "int",
                ParamKind::Float => "float",
            };
            println!(
                "  {:<16} {:<5} [{}, {}] step {} default {}  {}",
                spec.name, kind, spec.min, spec.max, spec.step, spec.default, spec.description
            );
        }
        if let Ok(strategy) = Strategy::default_for(id) {
            println!("  defaults: {}", strategy);
        }
    }
}
