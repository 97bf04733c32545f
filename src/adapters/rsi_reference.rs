//! JSON weekly-RSI reference table adapter.
//!
//! File layout: one object per year keyed by the year string, each holding a
//! `weeks` array of `{start, end, week, rsi}` entries, plus a `metadata`
//! block with update bookkeeping. Lookups follow a three-stage policy: the
//! week containing the date, else the nearest earlier week-end, else the
//! single latest known value.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::domain::error::SplitquantError;
use crate::domain::weekly_rsi::WeeklyPoint;
use crate::ports::oscillator_port::OscillatorPort;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekEntry {
    /// Monday opening the week, `YYYY-MM-DD`.
    pub start: String,
    /// Friday ending the week, `YYYY-MM-DD`.
    pub end: String,
    /// ISO week number of the week's start.
    pub week: u32,
    pub rsi: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearBlock {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub weeks: Vec<WeekEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub total_years: usize,
    #[serde(default)]
    pub total_weeks: usize,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ReferenceFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
    #[serde(flatten)]
    years: BTreeMap<String, YearBlock>,
}

/// A week entry with parsed dates, for lookups.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ResolvedWeek {
    start: NaiveDate,
    end: NaiveDate,
    rsi: f64,
}

pub struct RsiReferenceTable {
    file: ReferenceFile,
    /// All weeks across years, ascending by week end.
    entries: Vec<ResolvedWeek>,
}

impl RsiReferenceTable {
    /// An empty table, ready to be filled by [`RsiReferenceTable::merge`].
    pub fn empty() -> Self {
        RsiReferenceTable {
            file: ReferenceFile::default(),
            entries: Vec::new(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SplitquantError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| SplitquantError::Reference {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self, SplitquantError> {
        let file: ReferenceFile =
            serde_json::from_str(content).map_err(|e| SplitquantError::Reference {
                reason: format!("invalid JSON: {}", e),
            })?;
        let mut table = RsiReferenceTable {
            file,
            entries: Vec::new(),
        };
        table.rebuild_entries()?;
        Ok(table)
    }

    fn rebuild_entries(&mut self) -> Result<(), SplitquantError> {
        let mut entries = Vec::new();
        for (year, block) in &self.file.years {
            for week in &block.weeks {
                let start = parse_entry_date(&week.start, year)?;
                let end = parse_entry_date(&week.end, year)?;
                entries.push(ResolvedWeek {
                    start,
                    end,
                    rsi: week.rsi,
                });
            }
        }
        entries.sort_by_key(|entry| entry.end);
        self.entries = entries;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_weeks(&self) -> usize {
        self.entries.len()
    }

    /// First and last week-ending dates held by the table.
    pub fn coverage(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => Some((first.end, last.end)),
            _ => None,
        }
    }

    /// Merge computed weekly points into the table: entries for an already
    /// known week number are replaced, new weeks appended. Returns the number
    /// of entries added or changed.
    pub fn merge(&mut self, points: &[WeeklyPoint]) -> usize {
        let mut touched = 0;
        for point in points {
            let week_ending = point.week_ending;
            let week_start = week_ending - Duration::days(4);
            let entry = WeekEntry {
                start: week_start.format(DATE_FORMAT).to_string(),
                end: week_ending.format(DATE_FORMAT).to_string(),
                week: week_start.iso_week().week(),
                rsi: round2(point.rsi),
            };

            let year = week_ending.year().to_string();
            let block = self.file.years.entry(year.clone()).or_insert_with(|| YearBlock {
                description: format!("{year} weekly RSI data"),
                weeks: Vec::new(),
            });

            match block.weeks.iter_mut().find(|w| w.week == entry.week) {
                Some(existing) => {
                    if *existing != entry {
                        *existing = entry;
                        touched += 1;
                    }
                }
                None => {
                    block.weeks.push(entry);
                    touched += 1;
                }
            }
            block.weeks.sort_by_key(|w| w.week);
        }

        // Entries derived from merge input always parse back.
        let _ = self.rebuild_entries();
        touched
    }

    /// Write the table as pretty JSON, refreshing the metadata block.
    pub fn save<P: AsRef<Path>>(&mut self, path: P, as_of: NaiveDate) -> Result<(), SplitquantError> {
        let total_weeks = self
            .file
            .years
            .values()
            .map(|block| block.weeks.len())
            .sum();
        self.file.metadata = Some(Metadata {
            last_updated: as_of.format(DATE_FORMAT).to_string(),
            total_years: self.file.years.len(),
            total_weeks,
            description: "weekly RSI reference table (14-week rolling RSI)".to_string(),
        });

        let json =
            serde_json::to_string_pretty(&self.file).map_err(|e| SplitquantError::Reference {
                reason: format!("serialize failed: {}", e),
            })?;
        fs::write(path.as_ref(), json).map_err(|e| SplitquantError::Reference {
            reason: format!("failed to write {}: {}", path.as_ref().display(), e),
        })
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.file.metadata.as_ref()
    }
}

fn parse_entry_date(value: &str, year: &str) -> Result<NaiveDate, SplitquantError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| SplitquantError::Reference {
        reason: format!("invalid date '{}' in year {}: {}", value, year, e),
    })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl OscillatorPort for RsiReferenceTable {
    fn resolve(&self, date: NaiveDate) -> Option<f64> {
        // Stage 1: the week whose span contains the date.
        if let Some(entry) = self
            .entries
            .iter()
            .find(|entry| entry.start <= date && date <= entry.end)
        {
            return Some(entry.rsi);
        }

        // Stage 2: nearest earlier week-end.
        if let Some(entry) = self.entries.iter().rev().find(|entry| entry.end <= date) {
            return Some(entry.rsi);
        }

        // Stage 3: latest known value.
        self.entries.last().map(|entry| entry.rsi)
    }
}
