//! Day-by-day replay of the capital-split strategy over a daily price series.
//!
//! Ordering inside a day is an observable invariant: the capital-rebase tick
//! runs first, then the week-boundary regime update, then sells, then the
//! single buy slot, then the day's record is appended, and only then are the
//! day's sells back-patched into their originating buy records.

use chrono::{Duration, NaiveDate};

use super::calendar;
use super::error::SplitquantError;
use super::ledger::Ledger;
use super::ohlcv::DailyBar;
use super::record::{BackPatchIndex, BuyFill, DailyRecord};
use super::regime::{classify, Regime, StrategyParams};
use crate::ports::oscillator_port::OscillatorPort;

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub start_date: NaiveDate,
    /// Defaults to the last available bar when unset.
    pub end_date: Option<NaiveDate>,
    pub strategy: StrategyParams,
}

/// Regime state resolved for the week the backtest starts in.
#[derive(Debug, Clone, PartialEq)]
pub struct StartState {
    pub regime: Regime,
    /// Reading for the start week itself, when the table covers it.
    pub week_reading: Option<f64>,
    /// Reading from one week before the start week.
    pub recent: f64,
    /// Reading from two weeks before the start week.
    pub prior: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trading_days: usize,
    pub initial_capital: f64,
    pub final_value: f64,
    pub total_return_pct: f64,
    pub open_positions: usize,
}

#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub records: Vec<DailyRecord>,
    pub summary: BacktestSummary,
    pub start: StartState,
}

/// Resolve the regime in force when the backtest starts.
///
/// The seed regime comes from the most recent reading alone, then the
/// two-reading rule table refines it. Fails when either of the two prior
/// weeks' readings cannot be resolved; the run must not start on stale data.
pub fn resolve_start_state(
    start_date: NaiveDate,
    oscillator: &dyn OscillatorPort,
) -> Result<StartState, SplitquantError> {
    let start_friday = calendar::week_ending_friday(start_date);
    let week_reading = oscillator.resolve(start_friday);
    let recent = oscillator.resolve(start_friday - Duration::days(7));
    let prior = oscillator.resolve(start_friday - Duration::days(14));

    let (Some(recent), Some(prior)) = (recent, prior) else {
        return Err(SplitquantError::MissingOscillator {
            week_ending: start_friday,
            recent,
            prior,
        });
    };

    let seed = Regime::from_reading(recent);
    Ok(StartState {
        regime: classify(recent, prior, seed),
        week_reading,
        recent,
        prior,
    })
}

/// Replay the strategy over `bars` between the configured dates.
///
/// `bars` must be ascending by date and should include at least one bar
/// before `start_date` so the first simulated day has a previous close;
/// without one, the first bar only seeds the close and produces no record.
pub fn run_backtest(
    bars: &[DailyBar],
    config: &BacktestConfig,
    oscillator: &dyn OscillatorPort,
) -> Result<BacktestResult, SplitquantError> {
    let end_date = match config.end_date {
        Some(date) => date,
        None => match bars.last() {
            Some(bar) => bar.date,
            None => {
                return Err(SplitquantError::NoData {
                    start: config.start_date,
                    end: config.start_date,
                });
            }
        },
    };

    let window: Vec<&DailyBar> = bars
        .iter()
        .filter(|bar| bar.date >= config.start_date && bar.date <= end_date)
        .collect();
    if window.is_empty() {
        return Err(SplitquantError::NoData {
            start: config.start_date,
            end: end_date,
        });
    }

    let start = resolve_start_state(config.start_date, oscillator)?;
    let mut regime = start.regime;

    let mut ledger = Ledger::new(config.initial_capital);
    let mut records: Vec<DailyRecord> = Vec::with_capacity(window.len());
    let mut patch_index = BackPatchIndex::new();

    let mut prev_close: Option<f64> = bars
        .iter()
        .filter(|bar| bar.date < config.start_date)
        .next_back()
        .map(|bar| bar.close);

    let mut current_week_friday: Option<NaiveDate> = None;
    let mut current_week_reading = start.week_reading;
    let mut week: u32 = 0;
    let mut cumulative_realized = 0.0;

    for (i, bar) in window.iter().enumerate() {
        if calendar::is_trading_day(bar.date) {
            ledger.mark_trading_day(bar.close);
        }

        let this_friday = calendar::week_ending_friday(bar.date);
        if current_week_friday != Some(this_friday) {
            current_week_friday = Some(this_friday);
            current_week_reading = oscillator.resolve(this_friday);

            let recent = oscillator.resolve(this_friday - Duration::days(7));
            let prior = oscillator.resolve(this_friday - Duration::days(14));
            let (Some(recent), Some(prior)) = (recent, prior) else {
                return Err(SplitquantError::MissingOscillator {
                    week_ending: this_friday,
                    recent,
                    prior,
                });
            };

            regime = classify(recent, prior, regime);
            week += 1;
        }

        if let Some(previous_close) = prev_close {
            let params = config.strategy.params_for(regime);
            let buy_order_price = params.buy_order_price(previous_close);
            let mut sell_target = params.sell_target_price(previous_close);

            let intents = ledger.evaluate_sells(bar.close, bar.date, &config.strategy);
            let fills = ledger.execute_sells(&intents);
            let daily_realized: f64 = fills.iter().map(|fill| fill.realized_pnl).sum();
            cumulative_realized += daily_realized;

            let round_before_buy = ledger.current_round;
            let mut buy: Option<BuyFill> = None;
            let mut seed_amount = 0.0;

            // The order is a buy-on-weakness limit: it fills only when the
            // day closed below the nominal order price, at the close itself.
            if ledger.can_buy(params) && buy_order_price > bar.close {
                if let Some(position) =
                    ledger.execute_buy(bar.close, bar.date, regime, params)
                {
                    seed_amount = ledger.position_size(position.round, params);
                    sell_target = params.sell_target_price(position.buy_price);
                    buy = Some(BuyFill {
                        round: position.round,
                        price: position.buy_price,
                        shares: position.shares,
                        cost: position.cost,
                    });
                }
            }

            let record_index = records.len();
            records.push(DailyRecord {
                date: bar.date,
                week,
                oscillator: current_week_reading.unwrap_or(50.0),
                regime,
                round: round_before_buy.min(params.split_count),
                seed_amount,
                buy_order_price,
                close: bar.close,
                sell_target_price: sell_target,
                stop_loss_date: calendar::advance_by_trading_days(bar.date, params.max_hold_days),
                trading_day: i + 1,
                buy: buy.clone(),
                sell_date: None,
                sell_price: 0.0,
                holding_days: 0,
                holdings: ledger.total_shares(),
                realized_pnl: 0.0,
                daily_realized,
                cumulative_realized,
                position_value: ledger.position_value(bar.close),
                cash_balance: ledger.available_cash,
                total_assets: ledger.total_assets(bar.close),
            });

            if let Some(fill) = &buy {
                patch_index.register_buy(fill.round, record_index);
            }

            for fill in &fills {
                if let Some(index) = patch_index.take(fill.round) {
                    let holding_days = calendar::trading_days_span(records[index].date, bar.date);
                    records[index].patch_sell(
                        bar.date,
                        fill.sell_price,
                        fill.realized_pnl,
                        holding_days,
                    );
                }
            }
        }

        prev_close = Some(bar.close);
    }

    let final_value = records
        .last()
        .map(|record| record.total_assets)
        .unwrap_or(config.initial_capital);
    let total_return_pct =
        (final_value - config.initial_capital) / config.initial_capital * 100.0;

    Ok(BacktestResult {
        summary: BacktestSummary {
            start_date: config.start_date,
            end_date,
            trading_days: window.len(),
            initial_capital: config.initial_capital,
            final_value,
            total_return_pct,
            open_positions: ledger.positions.len(),
        },
        records,
        start,
    })
}
