//! Weekly oscillator reference lookup port trait.

use chrono::NaiveDate;

/// Lookup of the precomputed weekly oscillator value covering a date.
///
/// Resolution policy: the week whose span contains the date first, else the
/// nearest earlier week-end, else the single latest known value. `None` only
/// when the table holds nothing at all; callers abort the run rather than
/// defaulting.
pub trait OscillatorPort {
    fn resolve(&self, date: NaiveDate) -> Option<f64>;
}
