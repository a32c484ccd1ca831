//! CSV file data adapter.
//!
//! One file per symbol, `{base_path}/{symbol}.csv`, with a header row and
//! columns `timestamp,open,high,low,close,volume`. The first column holds
//! either epoch milliseconds or a `YYYY-MM-DD` date (midnight UTC).

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::{Bar, Series};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }
}

fn parse_timestamp(raw: &str) -> Result<i64, String> {
    if let Ok(ms) = raw.parse::<i64>() {
        return Ok(ms);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| format!("invalid timestamp '{}'", raw))
}

fn parse_column(record: &csv::StringRecord, idx: usize, name: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .ok_or_else(|| format!("missing {} column", name))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid {} value '{}': {}", name, raw, e))
}

fn parse_record(record: &csv::StringRecord) -> Result<Bar, String> {
    let timestamp = parse_timestamp(
        record
            .get(0)
            .ok_or_else(|| "missing timestamp column".to_string())?
            .trim(),
    )?;
    Ok(Bar {
        timestamp,
        open: parse_column(record, 1, "open")?,
        high: parse_column(record, 2, "high")?,
        low: parse_column(record, 3, "low")?,
        close: parse_column(record, 4, "close")?,
        volume: parse_column(record, 5, "volume")?,
    })
}

impl DataPort for CsvAdapter {
    fn fetch_series(&self, symbol: &str) -> Result<Series, TradesimError> {
        let path = self.csv_path(symbol);
        let content = fs::read_to_string(&path).map_err(|e| TradesimError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| TradesimError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;
            let bar = parse_record(&record).map_err(|reason| TradesimError::Data {
                reason: format!("{} row {}: {}", path.display(), row + 1, reason),
            })?;
            bars.push(bar);
        }

        // Files may be written newest-first; duplicates still fail validation.
        bars.sort_by_key(|b| b.timestamp);
        Series::new(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| TradesimError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TradesimError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_test_data() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_path_buf();

        let csv_content = "date,open,high,low,close,volume\n\
            2024-01-15,100.0,110.0,90.0,105.0,50000\n\
            2024-01-16,105.0,115.0,100.0,110.0,60000\n\
            2024-01-17,110.0,120.0,105.0,115.0,55000\n";

        fs::write(path.join("BTC-USD.csv"), csv_content).unwrap();
        fs::write(
            path.join("ETH-USD.csv"),
            "timestamp,open,high,low,close,volume\n\
             1700000060000,11,12,10,11.5,3\n\
             1700000000000,10,11,9,10.5,2\n",
        )
        .unwrap();
        fs::write(path.join("notes.txt"), "not data").unwrap();

        (dir, path)
    }

    #[test]
    fn fetch_series_returns_correct_data() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter.fetch_series("BTC-USD").unwrap();
        let bars = series.bars();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].timestamp, 1_705_276_800_000);
        assert_eq!(bars[0].open, 100.0);
        assert_eq!(bars[0].high, 110.0);
        assert_eq!(bars[0].low, 90.0);
        assert_eq!(bars[0].close, 105.0);
        assert_eq!(bars[0].volume, 50000.0);
    }

    #[test]
    fn epoch_millis_rows_are_sorted() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let series = adapter.fetch_series("ETH-USD").unwrap();
        assert_eq!(series.first().timestamp, 1_700_000_000_000);
        assert_eq!(series.last().close, 11.5);
    }

    #[test]
    fn fetch_range_filters_by_time() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let day = 1_705_363_200_000;
        let series = adapter
            .fetch_range("BTC-USD", Some(day), Some(day))
            .unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.first().close, 110.0);

        let result = adapter.fetch_range("BTC-USD", Some(0), Some(1));
        assert!(matches!(result, Err(TradesimError::EmptySeries)));
    }

    #[test]
    fn fetch_series_errors_for_missing_file() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_series("XYZ");
        assert!(matches!(result, Err(TradesimError::Data { .. })));
    }

    #[test]
    fn bad_number_is_data_error() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("BAD.csv"),
            "date,open,high,low,close,volume\n2024-01-15,abc,1,1,1,1\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        let err = adapter.fetch_series("BAD").unwrap_err();
        assert!(err.to_string().contains("invalid open value"));
    }

    #[test]
    fn invalid_bar_is_series_error() {
        let (_dir, path) = setup_test_data();
        fs::write(
            path.join("NEG.csv"),
            "date,open,high,low,close,volume\n\
             2024-01-15,10,11,9,10,1\n\
             2024-01-16,10,11,9,-1,1\n",
        )
        .unwrap();
        let adapter = CsvAdapter::new(path);

        let result = adapter.fetch_series("NEG");
        assert!(matches!(
            result,
            Err(TradesimError::InvalidSeries { index: 1, .. })
        ));
    }

    #[test]
    fn header_only_file_is_empty_series() {
        let (_dir, path) = setup_test_data();
        fs::write(path.join("EMPTY.csv"), "date,open,high,low,close,volume\n").unwrap();
        let adapter = CsvAdapter::new(path);

        assert!(matches!(
            adapter.fetch_series("EMPTY"),
            Err(TradesimError::EmptySeries)
        ));
    }

    #[test]
    fn list_symbols_returns_csv_stems() {
        let (_dir, path) = setup_test_data();
        let adapter = CsvAdapter::new(path);

        let symbols = adapter.list_symbols().unwrap();
        assert_eq!(symbols, vec!["BTC-USD", "ETH-USD"]);
    }
}
