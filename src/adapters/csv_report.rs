//! CSV ledger report adapter.
//!
//! Writes a run summary block followed by the full daily-record table, one
//! row per simulated day with the buy/sell execution and back-patched sell
//! columns.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SplitquantError;
use crate::domain::metrics::DrawdownReport;
use crate::domain::record::DailyRecord;
use crate::ports::report_port::ReportPort;
use chrono::NaiveDate;

pub struct CsvReportAdapter;

const HEADERS: [&str; 23] = [
    "date",
    "week",
    "rsi",
    "mode",
    "round",
    "seed",
    "buy_order",
    "close",
    "sell_target",
    "stop_date",
    "day",
    "buy_fill",
    "shares",
    "cost",
    "sell_date",
    "sell_fill",
    "hold_days",
    "holdings",
    "realized_pnl",
    "cum_realized",
    "daily_realized",
    "cash",
    "total_assets",
];

impl CsvReportAdapter {
    fn summary_rows(result: &BacktestResult, drawdown: &DrawdownReport) -> Vec<(String, String)> {
        let summary = &result.summary;
        vec![
            (
                "period".into(),
                format!("{} .. {}", summary.start_date, summary.end_date),
            ),
            ("trading_days".into(), summary.trading_days.to_string()),
            (
                "initial_capital".into(),
                format!("{:.2}", summary.initial_capital),
            ),
            ("final_value".into(), format!("{:.2}", summary.final_value)),
            (
                "total_return_pct".into(),
                format!("{:+.2}", summary.total_return_pct),
            ),
            (
                "max_drawdown_pct".into(),
                format!("{:.2}", drawdown.max_drawdown_pct),
            ),
            ("drawdown_trough".into(), opt_date(drawdown.trough_date)),
            (
                "drawdown_trough_value".into(),
                format!("{:.2}", drawdown.trough_value),
            ),
            ("drawdown_peak".into(), opt_date(drawdown.peak_date)),
            ("overall_peak".into(), opt_date(drawdown.overall_peak_date)),
            (
                "overall_peak_value".into(),
                format!("{:.2}", drawdown.overall_peak_value),
            ),
            (
                "open_positions".into(),
                summary.open_positions.to_string(),
            ),
        ]
    }

    fn record_row(record: &DailyRecord) -> Vec<String> {
        let (buy_fill, shares, cost) = match &record.buy {
            Some(fill) => (
                format!("{:.2}", fill.price),
                fill.shares.to_string(),
                format!("{:.2}", fill.cost),
            ),
            None => (String::new(), String::new(), String::new()),
        };

        vec![
            record.date.to_string(),
            record.week.to_string(),
            format!("{:.2}", record.oscillator),
            record.regime.code().to_string(),
            record.round.to_string(),
            if record.seed_amount > 0.0 {
                format!("{:.2}", record.seed_amount)
            } else {
                String::new()
            },
            format!("{:.2}", record.buy_order_price),
            format!("{:.2}", record.close),
            format!("{:.2}", record.sell_target_price),
            record.stop_loss_date.to_string(),
            record.trading_day.to_string(),
            buy_fill,
            shares,
            cost,
            opt_date(record.sell_date),
            if record.sell_date.is_some() {
                format!("{:.2}", record.sell_price)
            } else {
                String::new()
            },
            if record.holding_days > 0 {
                record.holding_days.to_string()
            } else {
                String::new()
            },
            record.holdings.to_string(),
            if record.sell_date.is_some() {
                format!("{:.2}", record.realized_pnl)
            } else {
                String::new()
            },
            format!("{:.2}", record.cumulative_realized),
            if record.daily_realized != 0.0 {
                format!("{:.2}", record.daily_realized)
            } else {
                String::new()
            },
            format!("{:.2}", record.cash_balance),
            format!("{:.2}", record.total_assets),
        ]
    }
}

fn opt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.to_string()).unwrap_or_default()
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        result: &BacktestResult,
        drawdown: &DrawdownReport,
        output_path: &Path,
    ) -> Result<(), SplitquantError> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_path(output_path)
            .map_err(|e| SplitquantError::Data {
                reason: format!("failed to open {}: {}", output_path.display(), e),
            })?;

        for (label, value) in Self::summary_rows(result, drawdown) {
            writer
                .write_record([label.as_str(), value.as_str()])
                .map_err(|e| SplitquantError::Data {
                    reason: format!("report write error: {}", e),
                })?;
        }
        writer
            .write_record([""])
            .map_err(|e| SplitquantError::Data {
                reason: format!("report write error: {}", e),
            })?;

        writer
            .write_record(HEADERS)
            .map_err(|e| SplitquantError::Data {
                reason: format!("report write error: {}", e),
            })?;
        for record in &result.records {
            writer
                .write_record(Self::record_row(record))
                .map_err(|e| SplitquantError::Data {
                    reason: format!("report write error: {}", e),
                })?;
        }

        writer.flush().map_err(|e| SplitquantError::Data {
            reason: format!("report flush error: {}", e),
        })
    }
}
