//! CSV directory price provider.
//!
//! Reads `<base>/<CODE>.csv` files with a `date,open,high,low,close,volume`
//! header, one row per trading day.

use crate::domain::error::AlphaSimError;
use crate::ports::price_port::{PriceProvider, PriceRow};
use chrono::NaiveDate;
use log::warn;
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }
}

impl PriceProvider for CsvAdapter {
    fn fetch_historical(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceRow>, AlphaSimError> {
        let path = self.csv_path(code);
        let unavailable = |reason: String| AlphaSimError::DataUnavailable {
            code: code.to_string(),
            reason,
        };

        let file = File::open(&path)
            .map_err(|e| unavailable(format!("failed to read {}: {}", path.display(), e)))?;
        let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

        let mut rows = Vec::new();
        for result in rdr.deserialize::<CsvRow>() {
            let row = match result {
                Ok(row) => row,
                Err(e) if e.is_io_error() => {
                    return Err(unavailable(format!("CSV read error: {}", e)));
                }
                Err(e) => {
                    warn!("{}: skipping unreadable CSV row ({})", code, e);
                    continue;
                }
            };

            // Rows with unreadable dates are passed through; dataset assembly
            // rejects them with a warning.
            if let Ok(date) = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
                if date < start_date || date > end_date {
                    continue;
                }
            }

            rows.push(PriceRow {
                date: row.date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        rows.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(rows)
    }
}
