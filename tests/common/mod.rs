//! Shared helpers for integration tests.

#![allow(dead_code)]

use chrono::NaiveDate;
use splitquant::domain::ohlcv::DailyBar;
use splitquant::domain::regime::{RegimeParams, StrategyParams};
use splitquant::ports::oscillator_port::OscillatorPort;
use std::collections::HashMap;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date_str: &str, close: f64) -> DailyBar {
    DailyBar {
        date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1_000,
    }
}

/// Every week resolves to the same reading.
pub struct FlatOscillator(pub f64);

impl OscillatorPort for FlatOscillator {
    fn resolve(&self, _date: NaiveDate) -> Option<f64> {
        Some(self.0)
    }
}

/// Exact-match table keyed by week-ending Friday.
pub struct TableOscillator(pub HashMap<NaiveDate, f64>);

impl TableOscillator {
    pub fn from_entries(entries: &[(NaiveDate, f64)]) -> Self {
        TableOscillator(entries.iter().copied().collect())
    }
}

impl OscillatorPort for TableOscillator {
    fn resolve(&self, date: NaiveDate) -> Option<f64> {
        self.0.get(&date).copied()
    }
}

/// Two even splits per regime, default thresholds.
pub fn halves_strategy() -> StrategyParams {
    let halves = |base: RegimeParams| RegimeParams {
        split_count: 2,
        split_ratios: vec![0.5, 0.5],
        ..base
    };
    StrategyParams {
        safe: halves(RegimeParams::safe_default()),
        aggressive: halves(RegimeParams::aggressive_default()),
    }
}
