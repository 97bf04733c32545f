//! Report generation port trait.

use std::path::Path;

use crate::domain::backtest::BacktestResult;
use crate::domain::error::SplitquantError;
use crate::domain::metrics::DrawdownReport;

/// Port for writing the daily-record ledger and run summary.
pub trait ReportPort {
    fn write(
        &self,
        result: &BacktestResult,
        drawdown: &DrawdownReport,
        output_path: &Path,
    ) -> Result<(), SplitquantError>;
}
