//! Configuration validation.
//!
//! Validates every config field before any data is fetched or loaded.

use crate::domain::alpha::AlphaKind;
use crate::domain::error::AlphaSimError;
use crate::domain::run_config::ProviderKind;
use crate::domain::universe::parse_codes;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), AlphaSimError> {
    validate_codes(config)?;
    validate_dates(config)?;
    validate_provider(config)?;
    validate_simulation(config)?;
    Ok(())
}

fn validate_codes(config: &dyn ConfigPort) -> Result<(), AlphaSimError> {
    match config.get_string("data", "codes") {
        Some(codes) if !codes.trim().is_empty() => {
            parse_codes(&codes)?;
            Ok(())
        }
        _ => Err(AlphaSimError::ConfigMissing {
            section: "data".to_string(),
            key: "codes".to_string(),
        }),
    }
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), AlphaSimError> {
    let start_date = parse_date(config.get_string("data", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("data", "end_date").as_deref(), "end_date")?;

    if start_date > end_date {
        return Err(AlphaSimError::ConfigInvalid {
            section: "data".to_string(),
            key: "start_date".to_string(),
            reason: "start_date must not be after end_date".to_string(),
        });
    }
    Ok(())
}

pub(crate) fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, AlphaSimError> {
    match value {
        None => Err(AlphaSimError::ConfigMissing {
            section: "data".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            AlphaSimError::ConfigInvalid {
                section: "data".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }
        }),
    }
}

fn validate_provider(config: &dyn ConfigPort) -> Result<(), AlphaSimError> {
    let provider = config
        .get_string("data", "provider")
        .unwrap_or_else(|| "csv".to_string());

    match provider.parse::<ProviderKind>()? {
        ProviderKind::Csv => match config.get_string("data", "csv_dir") {
            Some(dir) if !dir.trim().is_empty() => Ok(()),
            _ => Err(AlphaSimError::ConfigMissing {
                section: "data".to_string(),
                key: "csv_dir".to_string(),
            }),
        },
        ProviderKind::Sqlite => {
            match config.get_string("sqlite", "path") {
                Some(path) if !path.trim().is_empty() => {}
                _ => {
                    return Err(AlphaSimError::ConfigMissing {
                        section: "sqlite".to_string(),
                        key: "path".to_string(),
                    });
                }
            }
            if let Some(size) = parse_number::<i64>(config, "sqlite", "pool_size")? {
                if size < 1 {
                    return Err(AlphaSimError::ConfigInvalid {
                        section: "sqlite".to_string(),
                        key: "pool_size".to_string(),
                        reason: "pool_size must be at least 1".to_string(),
                    });
                }
            }
            Ok(())
        }
    }
}

fn validate_simulation(config: &dyn ConfigPort) -> Result<(), AlphaSimError> {
    if let Some(name) = config.get_string("simulation", "alpha") {
        name.parse::<AlphaKind>()?;
    }

    let funds = parse_number::<f64>(config, "simulation", "initial_funds")?
        .unwrap_or(crate::domain::simulation::INITIAL_FUNDS);
    if !(funds.is_finite() && funds > 0.0) {
        return Err(AlphaSimError::ConfigInvalid {
            section: "simulation".to_string(),
            key: "initial_funds".to_string(),
            reason: "initial_funds must be positive".to_string(),
        });
    }
    Ok(())
}

/// Reads `[section] key` as a number. Absent keys give `None`; present but
/// unparseable values are an error rather than a silent default.
pub(crate) fn parse_number<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<T>, AlphaSimError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AlphaSimError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason: format!("{raw:?} is not a number"),
            }),
    }
}
