//! JSON report adapter implementing ReportPort.
//!
//! Writes pretty-printed JSON: a single report object for `write`, an array
//! of them (in the given order) for `write_many`. Undefined metrics appear as
//! the string `"undefined"`.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::TradesimError;
use crate::ports::report_port::ReportPort;

#[derive(Serialize)]
struct ReportEntry<'a> {
    label: String,
    #[serde(flatten)]
    result: &'a BacktestResult,
}

impl<'a> From<&'a BacktestResult> for ReportEntry<'a> {
    fn from(result: &'a BacktestResult) -> Self {
        Self {
            label: result.label(),
            result,
        }
    }
}

pub struct JsonReportAdapter;

impl JsonReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn write_json<T: Serialize>(&self, value: &T, output_path: &str) -> Result<(), TradesimError> {
        let json = serde_json::to_string_pretty(value).map_err(|e| TradesimError::Report {
            reason: format!("failed to serialize report: {}", e),
        })?;

        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(TradesimError::Io)?;
        }
        fs::write(path, json).map_err(TradesimError::Io)?;
        Ok(())
    }
}

impl Default for JsonReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for JsonReportAdapter {
    fn write(&self, result: &BacktestResult, output_path: &str) -> Result<(), TradesimError> {
        self.write_json(&ReportEntry::from(result), output_path)
    }

    fn write_many(
        &self,
        results: &[BacktestResult],
        output_path: &str,
    ) -> Result<(), TradesimError> {
        let entries: Vec<ReportEntry<'_>> = results.iter().map(ReportEntry::from).collect();
        self.write_json(&entries, output_path)
    }
}
