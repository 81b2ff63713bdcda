#![allow(dead_code)]

use alphasim::domain::dataset::HistoricalDataset;
use alphasim::domain::error::AlphaSimError;
pub use alphasim::domain::historical::HistoricalRecord;
use alphasim::ports::price_port::{PriceProvider, PriceRow};
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockPriceProvider {
    pub data: HashMap<String, Vec<PriceRow>>,
    pub errors: HashMap<String, String>,
    pub calls: RefCell<Vec<String>>,
}

impl MockPriceProvider {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_rows(mut self, code: &str, rows: Vec<PriceRow>) -> Self {
        self.data.insert(code.to_string(), rows);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl PriceProvider for MockPriceProvider {
    fn fetch_historical(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceRow>, AlphaSimError> {
        self.calls.borrow_mut().push(code.to_string());
        if let Some(reason) = self.errors.get(code) {
            return Err(AlphaSimError::DataUnavailable {
                code: code.to_string(),
                reason: reason.clone(),
            });
        }
        let start = start_date.format("%Y-%m-%d").to_string();
        let end = end_date.format("%Y-%m-%d").to_string();
        Ok(self
            .data
            .get(code)
            .map(|rows| {
                rows.iter()
                    .filter(|r| r.date >= start && r.date <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn universe(codes: &[&str]) -> Vec<String> {
    codes.iter().map(|c| c.to_string()).collect()
}

pub fn price_row(date: &str, open: f64, close: f64) -> PriceRow {
    PriceRow {
        date: date.to_string(),
        open,
        high: open.max(close) + 1.0,
        low: open.min(close) - 1.0,
        close,
        volume: 1000,
    }
}

pub fn record(code: &str, day: NaiveDate, open: f64, close: f64) -> HistoricalRecord {
    HistoricalRecord::new(
        code,
        day,
        open,
        open.max(close) + 1.0,
        open.min(close) - 1.0,
        close,
        1000,
    )
    .unwrap()
}

/// `count` consecutive calendar days of rows starting at `start_date`,
/// drifting by `step` per day.
pub fn generate_rows(start_date: &str, count: usize, start_price: f64, step: f64) -> Vec<PriceRow> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    (0..count)
        .map(|i| {
            let open = start_price + step * i as f64;
            let close = open + step / 2.0 + if i % 2 == 0 { 0.25 } else { -0.25 };
            price_row(
                &(start + chrono::Duration::days(i as i64))
                    .format("%Y-%m-%d")
                    .to_string(),
                open,
                close,
            )
        })
        .collect()
}

pub fn generate_dataset(codes: &[&str], days: usize) -> HistoricalDataset {
    let mut records = Vec::new();
    for i in 0..days {
        let day = date(2024, 1, 1) + chrono::Duration::days(i as i64);
        for (j, code) in codes.iter().enumerate() {
            let open = 20.0 + 10.0 * j as f64 + (i % 5) as f64;
            let close = open + if (i + j) % 3 == 0 { -0.5 } else { 0.75 };
            records.push(record(code, day, open, close));
        }
    }
    HistoricalDataset::from_records(records)
}
