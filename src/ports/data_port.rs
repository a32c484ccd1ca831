//! Price data access port trait.

use crate::domain::error::TradesimError;
use crate::domain::ohlcv::Series;

pub trait DataPort {
    /// Load the full, validated series for `symbol`.
    fn fetch_series(&self, symbol: &str) -> Result<Series, TradesimError>;

    fn list_symbols(&self) -> Result<Vec<String>, TradesimError>;

    /// Load `symbol` restricted to `[start_ms, end_ms]`.
    fn fetch_range(
        &self,
        symbol: &str,
        start_ms: Option<i64>,
        end_ms: Option<i64>,
    ) -> Result<Series, TradesimError> {
        self.fetch_series(symbol)?
            .slice_by_time(start_ms, end_ms)
            .ok_or(TradesimError::EmptySeries)
    }
}
