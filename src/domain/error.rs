//! Domain error types.

/// Top-level error type for tradesim.
///
/// Only configuration and I/O problems are errors. Short series, capital
/// exhaustion and degenerate metrics are reported inside the result instead.
#[derive(Debug, thiserror::Error)]
pub enum TradesimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown strategy '{name}' (expected one of: {expected})")]
    UnknownStrategy { name: String, expected: String },

    #[error("unknown parameter '{name}' for strategy {strategy}")]
    UnknownParameter { strategy: String, name: String },

    #[error("parameter {name} = {value} for strategy {strategy} is outside [{min}, {max}]")]
    ParameterOutOfRange {
        strategy: String,
        name: String,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("parameter {name} = {value} for strategy {strategy} must be a multiple of {step}")]
    ParameterNotOnStep {
        strategy: String,
        name: String,
        value: f64,
        step: f64,
    },

    #[error("invalid parameters for strategy {strategy}: {reason}")]
    ParameterConflict { strategy: String, reason: String },

    #[error("price series is empty")]
    EmptySeries,

    #[error("invalid bar at index {index}: {reason}")]
    InvalidSeries { index: usize, reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&TradesimError> for std::process::ExitCode {
    fn from(err: &TradesimError) -> Self {
        let code: u8 = match err {
            TradesimError::Io(_) => 1,
            TradesimError::ConfigParse { .. }
            | TradesimError::ConfigMissing { .. }
            | TradesimError::ConfigInvalid { .. } => 2,
            TradesimError::UnknownStrategy { .. }
            | TradesimError::UnknownParameter { .. }
            | TradesimError::ParameterOutOfRange { .. }
            | TradesimError::ParameterNotOnStep { .. }
            | TradesimError::ParameterConflict { .. } => 4,
            TradesimError::EmptySeries
            | TradesimError::InvalidSeries { .. }
            | TradesimError::Data { .. } => 5,
            TradesimError::Report { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
