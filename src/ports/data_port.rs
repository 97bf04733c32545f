//! Price-series access port trait.

use crate::domain::error::SplitquantError;
use crate::domain::ohlcv::DailyBar;
use chrono::NaiveDate;

/// Supplier of daily bars for the traded instrument. The engine never fetches
/// data itself; it receives a usable series or an explicit error up front.
pub trait DataPort {
    /// Bars in `[start, end]`, ascending by date. Non-trading days are simply
    /// absent; gaps are tolerated.
    fn fetch_ohlcv(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, SplitquantError>;

    /// First date, last date, and bar count of the available series.
    fn data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SplitquantError>;
}
