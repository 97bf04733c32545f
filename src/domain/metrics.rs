//! Drawdown and return analysis over the daily-record ledger.

use chrono::NaiveDate;

use super::record::DailyRecord;

/// Maximum-drawdown report from a single forward pass over total assets.
///
/// `peak_date` is the peak in force at the moment the worst drawdown hit,
/// which need not be the overall best day; the overall peak is tracked
/// independently.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownReport {
    pub max_drawdown_pct: f64,
    pub trough_date: Option<NaiveDate>,
    pub trough_value: f64,
    pub peak_date: Option<NaiveDate>,
    pub overall_peak_date: Option<NaiveDate>,
    pub overall_peak_value: f64,
}

impl DrawdownReport {
    pub fn compute(records: &[DailyRecord]) -> Self {
        let mut report = DrawdownReport {
            max_drawdown_pct: 0.0,
            trough_date: None,
            trough_value: 0.0,
            peak_date: None,
            overall_peak_date: None,
            overall_peak_value: 0.0,
        };

        let mut running_peak = 0.0_f64;
        let mut running_peak_date: Option<NaiveDate> = None;

        for record in records {
            let assets = record.total_assets;

            if assets > report.overall_peak_value {
                report.overall_peak_value = assets;
                report.overall_peak_date = Some(record.date);
            }

            if assets > running_peak {
                running_peak = assets;
                running_peak_date = Some(record.date);
            }

            if running_peak > 0.0 {
                let drawdown = (running_peak - assets) / running_peak * 100.0;
                if drawdown > report.max_drawdown_pct {
                    report.max_drawdown_pct = drawdown;
                    report.trough_date = Some(record.date);
                    report.trough_value = assets;
                    report.peak_date = running_peak_date;
                }
            }
        }

        report
    }
}

/// Final return over the run, in percent of initial capital.
pub fn total_return_pct(records: &[DailyRecord], initial_capital: f64) -> f64 {
    let final_value = records
        .last()
        .map(|record| record.total_assets)
        .unwrap_or(initial_capital);
    if initial_capital > 0.0 {
        (final_value - initial_capital) / initial_capital * 100.0
    } else {
        0.0
    }
}
