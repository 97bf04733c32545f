//! Weekly resampling and the rolling-mean RSI over weekly closes.
//!
//! Daily bars collapse to one close per week, keyed by the week-ending
//! Friday. The oscillator is a 14-period relative-strength value computed
//! with a simple rolling mean of gains and losses over the weekly deltas.

use chrono::NaiveDate;

use super::calendar;
use super::error::SplitquantError;
use super::ohlcv::DailyBar;

pub const DEFAULT_WINDOW: usize = 14;

/// One computed weekly oscillator value.
#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyPoint {
    /// Friday ending the week this reading belongs to.
    pub week_ending: NaiveDate,
    pub rsi: f64,
}

/// Last close of each week, ascending by week-ending Friday. Expects `bars`
/// ascending by date; a later bar in the same week replaces the close.
fn weekly_closes(bars: &[DailyBar]) -> Vec<(NaiveDate, f64)> {
    let mut weeks: Vec<(NaiveDate, f64)> = Vec::new();
    for bar in bars {
        let friday = calendar::week_ending_friday(bar.date);
        match weeks.last_mut() {
            Some((week, close)) if *week == friday => *close = bar.close,
            _ => weeks.push((friday, bar.close)),
        }
    }
    weeks
}

/// Compute the weekly RSI series over `bars` with the given window.
///
/// Needs at least `window + 1` distinct weeks; with all-gain windows the
/// value saturates at 100.
pub fn weekly_rsi(bars: &[DailyBar], window: usize) -> Result<Vec<WeeklyPoint>, SplitquantError> {
    let weeks = weekly_closes(bars);
    if window == 0 || weeks.len() < window + 1 {
        return Err(SplitquantError::InsufficientData {
            weeks: weeks.len(),
            minimum: window + 1,
        });
    }

    let deltas: Vec<f64> = weeks.windows(2).map(|pair| pair[1].1 - pair[0].1).collect();

    let mut points = Vec::with_capacity(deltas.len() - window + 1);
    for end in (window - 1)..deltas.len() {
        let slice = &deltas[end + 1 - window..=end];
        let gain: f64 = slice.iter().filter(|d| **d > 0.0).sum::<f64>() / window as f64;
        let loss: f64 = slice.iter().filter(|d| **d < 0.0).map(|d| -d).sum::<f64>() / window as f64;
        let rsi = if loss == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + gain / loss)
        };
        points.push(WeeklyPoint {
            week_ending: weeks[end + 1].0,
            rsi,
        });
    }
    Ok(points)
}
