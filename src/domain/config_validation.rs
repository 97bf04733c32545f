//! Configuration validation.
//!
//! Rejects invalid run parameters before the backtest loop starts: the core
//! engine takes capital, dates, and regime parameter sets as given.

use crate::domain::error::SplitquantError;
use crate::domain::regime::RegimeParams;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

const RATIO_SUM_TOLERANCE: f64 = 1e-6;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SplitquantError> {
    validate_initial_capital(config)?;
    validate_dates(config)?;
    validate_path(config, "prices")?;
    validate_path(config, "reference")?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), SplitquantError> {
    validate_regime_section(config, "safe", &RegimeParams::safe_default())?;
    validate_regime_section(config, "aggressive", &RegimeParams::aggressive_default())?;
    Ok(())
}

/// Parse a comma-separated split-ratio list.
pub fn parse_split_ratios(value: &str) -> Result<Vec<f64>, String> {
    value
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .map_err(|_| format!("'{part}' is not a number"))
        })
        .collect()
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), SplitquantError> {
    let value = config.get_double("backtest", "initial_capital", 0.0);
    if value <= 0.0 {
        return Err(SplitquantError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "initial_capital".to_string(),
            reason: "initial_capital must be positive".to_string(),
        });
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SplitquantError> {
    let start_str =
        config
            .get_string("backtest", "start_date")
            .ok_or_else(|| SplitquantError::ConfigMissing {
                section: "backtest".to_string(),
                key: "start_date".to_string(),
            })?;
    let start_date = parse_date(&start_str, "start_date")?;

    // end_date is optional: absent means "latest available bar".
    if let Some(end_str) = config.get_string("backtest", "end_date") {
        let end_date = parse_date(&end_str, "end_date")?;
        if start_date >= end_date {
            return Err(SplitquantError::ConfigInvalid {
                section: "backtest".to_string(),
                key: "start_date".to_string(),
                reason: "start_date must be before end_date".to_string(),
            });
        }
    }
    Ok(())
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, SplitquantError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| SplitquantError::ConfigInvalid {
        section: "backtest".to_string(),
        key: field.to_string(),
        reason: format!("invalid {} format, expected YYYY-MM-DD", field),
    })
}

fn validate_path(config: &dyn ConfigPort, key: &str) -> Result<(), SplitquantError> {
    match config.get_string("backtest", key) {
        Some(s) if !s.trim().is_empty() => Ok(()),
        _ => Err(SplitquantError::ConfigMissing {
            section: "backtest".to_string(),
            key: key.to_string(),
        }),
    }
}

fn validate_regime_section(
    config: &dyn ConfigPort,
    section: &str,
    defaults: &RegimeParams,
) -> Result<(), SplitquantError> {
    let buy = config.get_double(section, "buy_threshold", defaults.buy_threshold_pct);
    if buy <= 0.0 {
        return Err(SplitquantError::ConfigInvalid {
            section: section.to_string(),
            key: "buy_threshold".to_string(),
            reason: "buy_threshold must be positive".to_string(),
        });
    }

    let sell = config.get_double(section, "sell_threshold", defaults.sell_threshold_pct);
    if sell <= 0.0 {
        return Err(SplitquantError::ConfigInvalid {
            section: section.to_string(),
            key: "sell_threshold".to_string(),
            reason: "sell_threshold must be positive".to_string(),
        });
    }

    let max_hold = config.get_int(section, "max_hold_days", defaults.max_hold_days as i64);
    if max_hold < 1 {
        return Err(SplitquantError::ConfigInvalid {
            section: section.to_string(),
            key: "max_hold_days".to_string(),
            reason: "max_hold_days must be at least 1".to_string(),
        });
    }

    let split_count = config.get_int(section, "split_count", defaults.split_count as i64);
    if split_count < 1 {
        return Err(SplitquantError::ConfigInvalid {
            section: section.to_string(),
            key: "split_count".to_string(),
            reason: "split_count must be at least 1".to_string(),
        });
    }

    let ratios = match config.get_string(section, "split_ratios") {
        Some(value) => {
            parse_split_ratios(&value).map_err(|reason| SplitquantError::ConfigInvalid {
                section: section.to_string(),
                key: "split_ratios".to_string(),
                reason,
            })?
        }
        None => defaults.split_ratios.clone(),
    };

    if ratios.len() != split_count as usize {
        return Err(SplitquantError::ConfigInvalid {
            section: section.to_string(),
            key: "split_ratios".to_string(),
            reason: format!(
                "expected {} ratios to match split_count, got {}",
                split_count,
                ratios.len()
            ),
        });
    }
    if ratios.iter().any(|r| *r <= 0.0) {
        return Err(SplitquantError::ConfigInvalid {
            section: section.to_string(),
            key: "split_ratios".to_string(),
            reason: "every split ratio must be positive".to_string(),
        });
    }
    let sum: f64 = ratios.iter().sum();
    if (sum - 1.0).abs() > RATIO_SUM_TOLERANCE {
        return Err(SplitquantError::ConfigInvalid {
            section: section.to_string(),
            key: "split_ratios".to_string(),
            reason: format!("split ratios must sum to 1.0, got {sum}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn adapter(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const VALID: &str = "\
[backtest]
initial_capital = 9000
start_date = 2024-01-02
end_date = 2024-06-28
prices = data/soxl.csv
reference = data/weekly_rsi.json
";

    #[test]
    fn valid_config_passes() {
        let config = adapter(VALID);
        assert!(validate_backtest_config(&config).is_ok());
        assert!(validate_strategy_config(&config).is_ok());
    }

    #[test]
    fn non_positive_capital_rejected() {
        let config = adapter(
            "[backtest]\ninitial_capital = 0\nstart_date = 2024-01-02\n\
             prices = p.csv\nreference = r.json\n",
        );
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SplitquantError::ConfigInvalid { ref key, .. } if key == "initial_capital"));
    }

    #[test]
    fn missing_start_date_rejected() {
        let config = adapter("[backtest]\ninitial_capital = 9000\nprices = p.csv\nreference = r.json\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SplitquantError::ConfigMissing { ref key, .. } if key == "start_date"));
    }

    #[test]
    fn malformed_date_rejected() {
        let config = adapter(
            "[backtest]\ninitial_capital = 9000\nstart_date = 02/01/2024\n\
             prices = p.csv\nreference = r.json\n",
        );
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SplitquantError::ConfigInvalid { ref key, .. } if key == "start_date"));
    }

    #[test]
    fn end_before_start_rejected() {
        let config = adapter(
            "[backtest]\ninitial_capital = 9000\nstart_date = 2024-06-01\n\
             end_date = 2024-01-02\nprices = p.csv\nreference = r.json\n",
        );
        assert!(validate_backtest_config(&config).is_err());
    }

    #[test]
    fn end_date_is_optional() {
        let config = adapter(
            "[backtest]\ninitial_capital = 9000\nstart_date = 2024-01-02\n\
             prices = p.csv\nreference = r.json\n",
        );
        assert!(validate_backtest_config(&config).is_ok());
    }

    #[test]
    fn missing_prices_path_rejected() {
        let config = adapter(
            "[backtest]\ninitial_capital = 9000\nstart_date = 2024-01-02\nreference = r.json\n",
        );
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SplitquantError::ConfigMissing { ref key, .. } if key == "prices"));
    }

    #[test]
    fn ratio_list_must_match_split_count() {
        let config = adapter(&format!(
            "{VALID}[safe]\nsplit_count = 3\nsplit_ratios = 0.5, 0.5\n"
        ));
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, SplitquantError::ConfigInvalid { ref key, .. } if key == "split_ratios"));
    }

    #[test]
    fn ratio_list_must_sum_to_one() {
        let config = adapter(&format!(
            "{VALID}[aggressive]\nsplit_count = 2\nsplit_ratios = 0.6, 0.5\n"
        ));
        let err = validate_strategy_config(&config).unwrap_err();
        assert!(matches!(err, SplitquantError::ConfigInvalid { ref section, .. } if section == "aggressive"));
    }

    #[test]
    fn negative_ratio_rejected() {
        let config = adapter(&format!(
            "{VALID}[safe]\nsplit_count = 2\nsplit_ratios = 1.5, -0.5\n"
        ));
        assert!(validate_strategy_config(&config).is_err());
    }

    #[test]
    fn garbage_ratio_rejected() {
        let config = adapter(&format!(
            "{VALID}[safe]\nsplit_count = 2\nsplit_ratios = 0.5, lots\n"
        ));
        assert!(validate_strategy_config(&config).is_err());
    }

    #[test]
    fn zero_hold_days_rejected() {
        let config = adapter(&format!("{VALID}[safe]\nmax_hold_days = 0\n"));
        assert!(validate_strategy_config(&config).is_err());
    }

    #[test]
    fn parse_split_ratios_roundtrip() {
        let ratios = parse_split_ratios("0.049, 0.127, 0.230").unwrap();
        assert_eq!(ratios, vec![0.049, 0.127, 0.230]);
        assert!(parse_split_ratios("a, b").is_err());
    }
}
