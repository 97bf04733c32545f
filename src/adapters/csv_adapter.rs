//! CSV price-file data adapter.
//!
//! One file per instrument with a `date,open,high,low,close,volume` header,
//! dates in `YYYY-MM-DD`.

use crate::domain::error::SplitquantError;
use crate::domain::ohlcv::DailyBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvBarAdapter {
    path: PathBuf,
}

impl CsvBarAdapter {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_all(&self) -> Result<Vec<DailyBar>, SplitquantError> {
        let content = fs::read_to_string(&self.path).map_err(|e| SplitquantError::Data {
            reason: format!("failed to read {}: {}", self.path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| SplitquantError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let date_str = record.get(0).ok_or_else(|| SplitquantError::Data {
                reason: "missing date column".into(),
            })?;
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                SplitquantError::Data {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            let field = |index: usize, name: &str| -> Result<f64, SplitquantError> {
                record
                    .get(index)
                    .ok_or_else(|| SplitquantError::Data {
                        reason: format!("missing {} column", name),
                    })?
                    .parse()
                    .map_err(|e| SplitquantError::Data {
                        reason: format!("invalid {} value on {}: {}", name, date, e),
                    })
            };

            let open = field(1, "open")?;
            let high = field(2, "high")?;
            let low = field(3, "low")?;
            let close = field(4, "close")?;
            let volume: i64 = record
                .get(5)
                .ok_or_else(|| SplitquantError::Data {
                    reason: "missing volume column".into(),
                })?
                .parse()
                .map_err(|e| SplitquantError::Data {
                    reason: format!("invalid volume value on {}: {}", date, e),
                })?;

            bars.push(DailyBar {
                date,
                open,
                high,
                low,
                close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        Ok(bars)
    }
}

impl DataPort for CsvBarAdapter {
    fn fetch_ohlcv(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyBar>, SplitquantError> {
        let bars = self.read_all()?;
        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }

    fn data_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SplitquantError> {
        let bars = self.read_all()?;
        match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Ok(Some((first.date, last.date, bars.len()))),
            _ => Ok(None),
        }
    }
}
