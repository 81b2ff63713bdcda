//! Historical price provider port.

use crate::domain::error::AlphaSimError;
use chrono::NaiveDate;

/// One raw daily row as handed over by a provider. The date is kept as the
/// provider's `YYYY-MM-DD` string; dataset assembly parses it.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

pub trait PriceProvider {
    /// All rows for `code` between `start_date` and `end_date` inclusive,
    /// ascending by date.
    fn fetch_historical(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceRow>, AlphaSimError>;
}
