//! Regime classification driven by the weekly momentum oscillator.
//!
//! Two regimes, each bound to a fixed parameter set. The classifier consumes
//! two consecutive weekly readings and the previous regime; the rule table
//! always compares the OLDER reading against the NEWER one, and the safe
//! rules are checked before the aggressive ones.

use std::fmt;

/// One of the two strategy configurations in force on a given week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    Safe,
    Aggressive,
}

impl Regime {
    /// Seed rule used before any prior regime exists: a single reading at or
    /// above the 50 midline starts safe, anything below starts aggressive.
    pub fn from_reading(reading: f64) -> Self {
        if reading >= 50.0 {
            Regime::Safe
        } else {
            Regime::Aggressive
        }
    }

    /// Compact two-letter code used in ledger exports.
    pub fn code(&self) -> &'static str {
        match self {
            Regime::Safe => "SF",
            Regime::Aggressive => "AG",
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Safe => write!(f, "SAFE"),
            Regime::Aggressive => write!(f, "AGGRESSIVE"),
        }
    }
}

/// Parameter set bound to a regime. Immutable configuration; looked up by the
/// regime in force, never stored per position.
#[derive(Debug, Clone, PartialEq)]
pub struct RegimeParams {
    /// Appreciation over the previous close that prices a buy order, in percent.
    pub buy_threshold_pct: f64,
    /// Appreciation over a lot's own fill price that prices its sell target, in percent.
    pub sell_threshold_pct: f64,
    /// Maximum holding period in trading days before a forced exit.
    pub max_hold_days: u32,
    /// Number of lots the capital base is divided into.
    pub split_count: usize,
    /// Fraction of the capital base allocated to each successive round; sums to 1.0.
    pub split_ratios: Vec<f64>,
}

impl RegimeParams {
    pub fn safe_default() -> Self {
        RegimeParams {
            buy_threshold_pct: 3.5,
            sell_threshold_pct: 1.4,
            max_hold_days: 30,
            split_count: 7,
            split_ratios: vec![0.049, 0.127, 0.230, 0.257, 0.028, 0.169, 0.140],
        }
    }

    pub fn aggressive_default() -> Self {
        RegimeParams {
            buy_threshold_pct: 3.6,
            sell_threshold_pct: 3.5,
            max_hold_days: 7,
            split_count: 8,
            split_ratios: vec![0.062, 0.134, 0.118, 0.148, 0.150, 0.182, 0.186, 0.020],
        }
    }

    /// Nominal buy-order price from the previous close.
    pub fn buy_order_price(&self, prev_close: f64) -> f64 {
        prev_close * (1.0 + self.buy_threshold_pct / 100.0)
    }

    /// Sell target from a reference price (a lot's fill price, or the
    /// previous close for display rows).
    pub fn sell_target_price(&self, reference: f64) -> f64 {
        reference * (1.0 + self.sell_threshold_pct / 100.0)
    }
}

/// The two regime parameter sets for a run.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub safe: RegimeParams,
    pub aggressive: RegimeParams,
}

impl StrategyParams {
    pub fn params_for(&self, regime: Regime) -> &RegimeParams {
        match regime {
            Regime::Safe => &self.safe,
            Regime::Aggressive => &self.aggressive,
        }
    }
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            safe: RegimeParams::safe_default(),
            aggressive: RegimeParams::aggressive_default(),
        }
    }
}

/// Classify the regime for a new week.
///
/// `recent` is the reading from one week ago and `prior` the reading from two
/// weeks ago; `prior` is the OLDER of the two and every rule below compares it
/// against the newer reading. The safe group is evaluated first, then the
/// aggressive group; when neither matches the previous regime holds.
///
/// The rule groups are kept as literal boolean chains; their exact order and
/// boundaries are part of the strategy definition.
pub fn classify(recent: f64, prior: f64, previous: Regime) -> Regime {
    let safe = (prior > 65.0 && prior > recent)
        || (40.0 < prior && prior < 50.0 && prior > recent)
        || (prior >= 50.0 && recent < 50.0);
    if safe {
        return Regime::Safe;
    }

    let aggressive = (prior < 50.0 && prior < recent && recent > 50.0)
        || (50.0 < prior && prior < 60.0 && prior < recent)
        || (prior < 35.0 && prior < recent);
    if aggressive {
        return Regime::Aggressive;
    }

    previous
}
