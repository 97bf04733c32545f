//! Daily OHLCV bar representation.

use chrono::NaiveDate;

/// One daily price bar for the traded instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}
