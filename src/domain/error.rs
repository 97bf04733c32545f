//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for splitquant.
#[derive(Debug, thiserror::Error)]
pub enum SplitquantError {
    #[error("price data error: {reason}")]
    Data { reason: String },

    #[error("reference table error: {reason}")]
    Reference { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(
        "no weekly oscillator reading for week ending {week_ending}: \
         one week prior {recent:?}, two weeks prior {prior:?}"
    )]
    MissingOscillator {
        week_ending: NaiveDate,
        recent: Option<f64>,
        prior: Option<f64>,
    },

    #[error("no price bars between {start} and {end}")]
    NoData { start: NaiveDate, end: NaiveDate },

    #[error("insufficient weekly data: have {weeks} weeks, need {minimum}")]
    InsufficientData { weeks: usize, minimum: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&SplitquantError> for std::process::ExitCode {
    fn from(err: &SplitquantError) -> Self {
        let code: u8 = match err {
            SplitquantError::Io(_) => 1,
            SplitquantError::ConfigParse { .. }
            | SplitquantError::ConfigMissing { .. }
            | SplitquantError::ConfigInvalid { .. } => 2,
            SplitquantError::Data { .. } | SplitquantError::Reference { .. } => 3,
            SplitquantError::MissingOscillator { .. } => 4,
            SplitquantError::NoData { .. } | SplitquantError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
