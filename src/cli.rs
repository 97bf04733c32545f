//! CLI definition and dispatch.

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvBarAdapter;
use crate::adapters::csv_report::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::rsi_reference::RsiReferenceTable;
use crate::domain::backtest::{self as backtest_engine, BacktestConfig};
use crate::domain::config_validation::{
    parse_split_ratios, validate_backtest_config, validate_strategy_config,
};
use crate::domain::error::SplitquantError;
use crate::domain::metrics::DrawdownReport;
use crate::domain::regime::{RegimeParams, StrategyParams};
use crate::domain::weekly_rsi::{self, DEFAULT_WINDOW};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "splitquant", about = "Capital-split leveraged-ETF strategy backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show price-series and reference-table coverage
    Info {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Recompute the weekly oscillator reference table from index bars
    UpdateReference {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            output,
            start,
            end,
        } => run_backtest(&config, output.as_ref(), start.as_deref(), end.as_deref()),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config } => run_info(&config),
        Command::UpdateReference { config } => run_update_reference(&config),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = SplitquantError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    start_override: Option<&str>,
    end_override: Option<&str>,
) -> Result<BacktestConfig, SplitquantError> {
    let start_str = match start_override {
        Some(s) => s.to_string(),
        None => adapter.get_string("backtest", "start_date").ok_or_else(|| {
            SplitquantError::ConfigMissing {
                section: "backtest".into(),
                key: "start_date".into(),
            }
        })?,
    };
    let start_date = parse_cli_date(&start_str, "start_date")?;

    let end_str = match end_override {
        Some(s) => Some(s.to_string()),
        None => adapter.get_string("backtest", "end_date"),
    };
    let end_date = match end_str {
        Some(s) => Some(parse_cli_date(&s, "end_date")?),
        None => None,
    };

    Ok(BacktestConfig {
        initial_capital: adapter.get_double("backtest", "initial_capital", 9_000.0),
        start_date,
        end_date,
        strategy: build_strategy_params(adapter)?,
    })
}

fn parse_cli_date(value: &str, field: &str) -> Result<NaiveDate, SplitquantError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| SplitquantError::ConfigInvalid {
        section: "backtest".into(),
        key: field.into(),
        reason: "invalid date format (expected YYYY-MM-DD)".into(),
    })
}

pub fn build_regime_params(
    adapter: &dyn ConfigPort,
    section: &str,
    defaults: RegimeParams,
) -> Result<RegimeParams, SplitquantError> {
    let split_ratios = match adapter.get_string(section, "split_ratios") {
        Some(value) => {
            parse_split_ratios(&value).map_err(|reason| SplitquantError::ConfigInvalid {
                section: section.to_string(),
                key: "split_ratios".to_string(),
                reason,
            })?
        }
        None => defaults.split_ratios.clone(),
    };

    Ok(RegimeParams {
        buy_threshold_pct: adapter.get_double(section, "buy_threshold", defaults.buy_threshold_pct),
        sell_threshold_pct: adapter.get_double(
            section,
            "sell_threshold",
            defaults.sell_threshold_pct,
        ),
        max_hold_days: adapter.get_int(section, "max_hold_days", defaults.max_hold_days as i64)
            as u32,
        split_count: adapter.get_int(section, "split_count", defaults.split_count as i64) as usize,
        split_ratios,
    })
}

pub fn build_strategy_params(adapter: &dyn ConfigPort) -> Result<StrategyParams, SplitquantError> {
    Ok(StrategyParams {
        safe: build_regime_params(adapter, "safe", RegimeParams::safe_default())?,
        aggressive: build_regime_params(adapter, "aggressive", RegimeParams::aggressive_default())?,
    })
}

fn run_backtest(
    config_path: &PathBuf,
    output_path: Option<&PathBuf>,
    start_override: Option<&str>,
    end_override: Option<&str>,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate
    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 3: Build run configuration
    let bt_config = match build_backtest_config(&adapter, start_override, end_override) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 4: Load the weekly oscillator reference table
    let reference_path = match adapter.get_string("backtest", "reference") {
        Some(p) => p,
        None => {
            let err = SplitquantError::ConfigMissing {
                section: "backtest".into(),
                key: "reference".into(),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
    };
    eprintln!("Loading reference table from {}", reference_path);
    let reference = match RsiReferenceTable::from_file(&reference_path) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    match reference.coverage() {
        Some((first, last)) => {
            eprintln!(
                "  {} weeks, {} to {}",
                reference.total_weeks(),
                first,
                last
            );
        }
        None => eprintln!("  warning: reference table is empty"),
    }

    // Stage 5: Fetch the full price series; the engine trims to the window
    // and uses the bar before the start date for the first previous close.
    let prices_path = match adapter.get_string("backtest", "prices") {
        Some(p) => p,
        None => {
            let err = SplitquantError::ConfigMissing {
                section: "backtest".into(),
                key: "prices".into(),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
    };
    let data_port = CsvBarAdapter::new(PathBuf::from(&prices_path));
    let bars = match data_port.data_range() {
        Ok(Some((first, last, count))) => {
            eprintln!("Loading {} bars from {} ({} to {})", count, prices_path, first, last);
            match data_port.fetch_ohlcv(first, last) {
                Ok(bars) => bars,
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            }
        }
        Ok(None) => {
            let err = SplitquantError::NoData {
                start: bt_config.start_date,
                end: bt_config.end_date.unwrap_or(bt_config.start_date),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 6: Run the simulation
    eprintln!(
        "Running backtest: {} to {}",
        bt_config.start_date,
        bt_config
            .end_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "latest".into()),
    );
    let result = match backtest_engine::run_backtest(&bars, &bt_config, &reference) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!(
        "  start regime {} (one week prior {:.2}, two weeks prior {:.2})",
        result.start.regime, result.start.recent, result.start.prior,
    );

    // Stage 7: Analyze and summarize
    let drawdown = DrawdownReport::compute(&result.records);

    eprintln!("\n=== Backtest Results ===");
    eprintln!(
        "Period:           {} to {}",
        result.summary.start_date, result.summary.end_date
    );
    eprintln!("Trading Days:     {}", result.summary.trading_days);
    eprintln!("Initial Capital:  ${:.2}", result.summary.initial_capital);
    eprintln!("Final Value:      ${:.2}", result.summary.final_value);
    eprintln!("Total Return:     {:+.2}%", result.summary.total_return_pct);
    eprintln!("Max Drawdown:     -{:.2}%", drawdown.max_drawdown_pct);
    if let (Some(trough), Some(peak)) = (drawdown.trough_date, drawdown.peak_date) {
        eprintln!("  trough {} (from peak {})", trough, peak);
    }
    if let Some(peak) = drawdown.overall_peak_date {
        eprintln!(
            "Peak Assets:      ${:.2} on {}",
            drawdown.overall_peak_value, peak
        );
    }
    eprintln!("Open Positions:   {}", result.summary.open_positions);

    // Stage 8: Write the ledger report
    let output = output_path
        .cloned()
        .unwrap_or_else(|| PathBuf::from("backtest_report.csv"));
    match CsvReportAdapter.write(&result, &drawdown, &output) {
        Ok(()) => {
            eprintln!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_backtest_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    if let Err(e) = validate_strategy_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    let strategy = match build_strategy_params(&adapter) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    eprintln!("\nRegime parameters:");
    for (name, params) in [("safe", &strategy.safe), ("aggressive", &strategy.aggressive)] {
        eprintln!(
            "  {}: buy +{}%, sell +{}%, max hold {}d, {} splits",
            name,
            params.buy_threshold_pct,
            params.sell_threshold_pct,
            params.max_hold_days,
            params.split_count,
        );
    }

    eprintln!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &PathBuf) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Some(prices_path) = adapter.get_string("backtest", "prices") {
        let data_port = CsvBarAdapter::new(PathBuf::from(&prices_path));
        match data_port.data_range() {
            Ok(Some((first, last, count))) => {
                println!("{}: {} bars, {} to {}", prices_path, count, first, last);
            }
            Ok(None) => eprintln!("{}: no bars found", prices_path),
            Err(e) => eprintln!("error reading {}: {}", prices_path, e),
        }
    }

    if let Some(reference_path) = adapter.get_string("backtest", "reference") {
        match RsiReferenceTable::from_file(&reference_path) {
            Ok(table) => match table.coverage() {
                Some((first, last)) => {
                    println!(
                        "{}: {} weeks, {} to {}",
                        reference_path,
                        table.total_weeks(),
                        first,
                        last
                    );
                }
                None => eprintln!("{}: empty reference table", reference_path),
            },
            Err(e) => eprintln!("error reading {}: {}", reference_path, e),
        }
    }

    ExitCode::SUCCESS
}

fn run_update_reference(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let prices_path = match adapter.get_string("reference", "prices") {
        Some(p) => p,
        None => {
            let err = SplitquantError::ConfigMissing {
                section: "reference".into(),
                key: "prices".into(),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
    };
    let table_path = match adapter.get_string("backtest", "reference") {
        Some(p) => p,
        None => {
            let err = SplitquantError::ConfigMissing {
                section: "backtest".into(),
                key: "reference".into(),
            };
            eprintln!("error: {err}");
            return (&err).into();
        }
    };
    let window = adapter.get_int("reference", "window", DEFAULT_WINDOW as i64) as usize;

    // Stage 1: Load the index bars
    let data_port = CsvBarAdapter::new(PathBuf::from(&prices_path));
    let bars = match data_port.data_range() {
        Ok(Some((first, last, count))) => {
            eprintln!("Loading {} index bars from {} ({} to {})", count, prices_path, first, last);
            match data_port.fetch_ohlcv(first, last) {
                Ok(bars) => bars,
                Err(e) => {
                    eprintln!("error: {e}");
                    return (&e).into();
                }
            }
        }
        Ok(None) => {
            eprintln!("error: no bars in {}", prices_path);
            return ExitCode::from(5);
        }
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 2: Compute the weekly oscillator series
    let points = match weekly_rsi::weekly_rsi(&bars, window) {
        Ok(points) => points,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Computed {} weekly readings ({}-week window)", points.len(), window);

    // Stage 3: Merge into the existing table and save
    let mut table = if std::path::Path::new(&table_path).exists() {
        match RsiReferenceTable::from_file(&table_path) {
            Ok(t) => t,
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    } else {
        eprintln!("No existing table at {}, creating one", table_path);
        RsiReferenceTable::empty()
    };

    let touched = table.merge(&points);
    let today = Local::now().date_naive();
    if let Err(e) = table.save(&table_path, today) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!(
        "Reference table updated: {} weeks total, {} added or changed",
        table.total_weeks(),
        touched,
    );
    eprintln!("Written to: {}", table_path);
    ExitCode::SUCCESS
}
