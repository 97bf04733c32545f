//! Trading calendar: weekends, US exchange holidays, trading-day arithmetic.
//!
//! The holiday table is a fixed list covering 2024-2025 (ten scheduled
//! closures per year plus the 2025-01-09 National Day of Mourning). Outside
//! [`HOLIDAY_COVERAGE`] the table is empty and only weekends are excluded;
//! callers simulating other years must extend the table.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Years covered by the holiday table, inclusive.
pub const HOLIDAY_COVERAGE: (i32, i32) = (2024, 2025);

const HOLIDAYS: [(i32, u32, u32); 21] = [
    (2024, 1, 1),   // New Year's Day
    (2024, 1, 15),  // Martin Luther King Jr. Day
    (2024, 2, 19),  // Washington's Birthday
    (2024, 3, 29),  // Good Friday
    (2024, 5, 27),  // Memorial Day
    (2024, 6, 19),  // Juneteenth
    (2024, 7, 4),   // Independence Day
    (2024, 9, 2),   // Labor Day
    (2024, 11, 28), // Thanksgiving Day
    (2024, 12, 25), // Christmas Day
    (2025, 1, 1),   // New Year's Day
    (2025, 1, 9),   // Jimmy Carter National Day of Mourning
    (2025, 1, 20),  // Martin Luther King Jr. Day
    (2025, 2, 17),  // Washington's Birthday
    (2025, 4, 18),  // Good Friday
    (2025, 5, 26),  // Memorial Day
    (2025, 6, 19),  // Juneteenth
    (2025, 7, 4),   // Independence Day
    (2025, 9, 1),   // Labor Day
    (2025, 11, 27), // Thanksgiving Day
    (2025, 12, 25), // Christmas Day
];

/// True when `date` is in the fixed holiday table.
pub fn is_holiday(date: NaiveDate) -> bool {
    HOLIDAYS.contains(&(date.year(), date.month(), date.day()))
}

/// True when the exchange is open on `date`: a weekday that is not a listed
/// holiday. Outside [`HOLIDAY_COVERAGE`] this degrades to a weekday check.
pub fn is_trading_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !is_holiday(date)
}

/// Step `date` forward until `n` trading days have elapsed.
pub fn advance_by_trading_days(date: NaiveDate, n: u32) -> NaiveDate {
    let mut current = date;
    let mut elapsed = 0;
    while elapsed < n {
        current += Duration::days(1);
        if is_trading_day(current) {
            elapsed += 1;
        }
    }
    current
}

/// Trading days in `(from, to]`: the holding duration of a lot bought on
/// `from` and evaluated on `to`.
pub fn trading_days_between(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut current = from;
    let mut count = 0;
    while current < to {
        current += Duration::days(1);
        if is_trading_day(current) {
            count += 1;
        }
    }
    count
}

/// Trading days in `[from, to]`, counting both endpoints.
pub fn trading_days_span(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut current = from;
    let mut count = 0;
    while current <= to {
        if is_trading_day(current) {
            count += 1;
        }
        current += Duration::days(1);
    }
    count
}

/// The Friday ending the week that contains `date`. Saturday and Sunday map
/// forward to the next Friday.
pub fn week_ending_friday(date: NaiveDate) -> NaiveDate {
    let weekday = date.weekday().num_days_from_monday() as i64;
    date + Duration::days((4 - weekday).rem_euclid(7))
}
