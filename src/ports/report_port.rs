//! Report output port trait.

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TradesimError;

/// Port for writing backtest results somewhere durable.
pub trait ReportPort {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), TradesimError>;

    /// Write several results, e.g. a comparison or a ranked sweep.
    ///
    /// Default implementation writes only the first result.
    fn write_many(
        &self,
        results: &[BacktestResult],
        output_path: &str,
    ) -> Result<(), TradesimError> {
        match results.first() {
            Some(first) => self.write(first, output_path),
            None => Err(TradesimError::Report {
                reason: "no results to write".into(),
            }),
        }
    }
}
