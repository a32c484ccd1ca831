#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use tradesim::domain::error::TradesimError;
pub use tradesim::domain::ohlcv::{Bar, Series, MS_PER_DAY};
use tradesim::ports::data_port::DataPort;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<Bar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_series(&self, symbol: &str) -> Result<Series, TradesimError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(TradesimError::Data {
                reason: reason.clone(),
            });
        }
        Series::new(self.data.get(symbol).cloned().unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

/// Daily bar with a 1% band around `close`.
pub fn make_bar(day: i64, close: f64) -> Bar {
    Bar {
        timestamp: day * MS_PER_DAY,
        open: close,
        high: close * 1.01,
        low: close * 0.99,
        close,
        volume: 1000.0,
    }
}

/// Daily bar with explicit range; open equals close.
pub fn make_range_bar(day: i64, low: f64, high: f64, close: f64) -> Bar {
    Bar {
        timestamp: day * MS_PER_DAY,
        open: close,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

pub fn bars_from_closes(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| make_bar(i as i64, c))
        .collect()
}

pub fn series_from_closes(closes: &[f64]) -> Series {
    Series::new(bars_from_closes(closes)).unwrap()
}

/// Oscillating uptrend that gives every strategy something to trade.
pub fn wave_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 12.0 * (t / 7.0).sin() + 4.0 * (t / 2.3).cos() + t * 0.05
        })
        .collect()
}

/// Write `{dir}/{symbol}.csv` with one dated row per close.
pub fn write_csv(dir: &Path, symbol: &str, closes: &[f64]) {
    let mut content = String::from("date,open,high,low,close,volume\n");
    let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    for (i, &c) in closes.iter().enumerate() {
        let date = start + chrono::Duration::days(i as i64);
        content.push_str(&format!(
            "{},{},{},{},{},1000\n",
            date.format("%Y-%m-%d"),
            c,
            c * 1.01,
            c * 0.99,
            c
        ));
    }
    std::fs::write(dir.join(format!("{symbol}.csv")), content).unwrap();
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Complete configuration pointing at `data_dir`.
pub fn sample_ini(data_dir: &Path) -> String {
    format!(
        r#"
[backtest]
symbol = WAVE
data_dir = {}
initial_capital = 10000
position_size = 1.0
stop_loss = 0.05
take_profit = 0.1
commission = 0.001

[engine]
max_concurrent_runs = 2

[strategy]
name = simple_ma

[simple_ma]
short_window = 5
long_window = 20
"#,
        data_dir.display()
    )
}
