//! Typed run parameters resolved from configuration.

use crate::domain::alpha::AlphaKind;
use crate::domain::error::AlphaSimError;
use chrono::NaiveDate;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Csv,
    Sqlite,
}

impl FromStr for ProviderKind {
    type Err = AlphaSimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ProviderKind::Csv),
            "sqlite" => Ok(ProviderKind::Sqlite),
            other => Err(AlphaSimError::ConfigInvalid {
                section: "data".to_string(),
                key: "provider".to_string(),
                reason: format!("unknown provider '{other}', expected csv or sqlite"),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub codes: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub provider: ProviderKind,
    pub csv_dir: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
    pub alpha: AlphaKind,
    pub initial_funds: f64,
}
