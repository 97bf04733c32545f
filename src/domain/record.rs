//! Daily ledger records and the deferred sell back-patch.
//!
//! Records are append-only. The one sanctioned after-the-fact change is the
//! back-patch: when a lot is sold, the historical record that booked its buy
//! receives the sell date, fill price, realized P&L, and holding days. The
//! [`BackPatchIndex`] maps each open round to its buy record so the patch is
//! a single lookup instead of a scan.

use chrono::NaiveDate;
use std::collections::{HashMap, VecDeque};

use super::regime::Regime;

/// Buy execution details carried on the day's record.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyFill {
    pub round: usize,
    pub price: f64,
    pub shares: i64,
    pub cost: f64,
}

/// One row per simulated trading day.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    pub date: NaiveDate,
    /// 1-based count of distinct trading weeks since the start of the run.
    pub week: u32,
    /// Weekly oscillator reading in force (display value).
    pub oscillator: f64,
    pub regime: Regime,
    /// Round number before the day's buy, clamped to the regime's split count.
    pub round: usize,
    /// Allocation sized for the day's buy; zero when no buy executed.
    pub seed_amount: f64,
    /// Nominal buy-order price from the previous close.
    pub buy_order_price: f64,
    pub close: f64,
    /// Sell target for display: from the previous close, or recomputed from
    /// the fill price when a buy executed.
    pub sell_target_price: f64,
    /// Date the day's holding period would force an exit.
    pub stop_loss_date: NaiveDate,
    /// 1-based ordinal of this bar within the backtest window.
    pub trading_day: usize,
    pub buy: Option<BuyFill>,
    /// Back-patched when the day's lot is later sold.
    pub sell_date: Option<NaiveDate>,
    pub sell_price: f64,
    /// Trading days from this record's date to the sell date, inclusive.
    pub holding_days: u32,
    /// Shares held across all open lots at the end of the day.
    pub holdings: i64,
    /// Realized P&L of the lot bought on this day, back-patched at sell time.
    pub realized_pnl: f64,
    /// Realized P&L of all sells executed on this day.
    pub daily_realized: f64,
    pub cumulative_realized: f64,
    pub position_value: f64,
    pub cash_balance: f64,
    pub total_assets: f64,
}

impl DailyRecord {
    /// Fill in the sell side of this record's buy, once.
    pub fn patch_sell(
        &mut self,
        sell_date: NaiveDate,
        sell_price: f64,
        realized_pnl: f64,
        holding_days: u32,
    ) {
        self.sell_date = Some(sell_date);
        self.sell_price = sell_price;
        self.realized_pnl = realized_pnl;
        self.holding_days = holding_days;
    }
}

/// FIFO map from open round number to the index of the record that booked the
/// round's buy. Rounds can repeat while earlier lots of the same round are
/// still open (the counter contracts on sells), so each round keys a queue:
/// the oldest unsold buy record is always patched first.
#[derive(Debug, Default)]
pub struct BackPatchIndex {
    open: HashMap<usize, VecDeque<usize>>,
}

impl BackPatchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember that `record_index` booked a buy for `round`.
    pub fn register_buy(&mut self, round: usize, record_index: usize) {
        self.open.entry(round).or_default().push_back(record_index);
    }

    /// Claim the oldest unsold buy record for `round`, if any.
    pub fn take(&mut self, round: usize) -> Option<usize> {
        let queue = self.open.get_mut(&round)?;
        let index = queue.pop_front();
        if queue.is_empty() {
            self.open.remove(&round);
        }
        index
    }
}
