//! Per-stock daily price record.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("{field} must be positive and finite, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("high {high} is below low {low}")]
    HighBelowLow { high: f64, low: f64 },
}

/// One stock's OHLCV bar for one date.
///
/// Everything except `realized_return` is fixed at construction; the
/// simulator writes the realized return when the date is traded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    code: String,
    date: NaiveDate,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: u64,
    realized_return: f64,
}

impl HistoricalRecord {
    pub fn new(
        code: impl Into<String>,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, RecordError> {
        let record = Self {
            code: code.into(),
            date,
            open,
            high,
            low,
            close,
            volume,
            realized_return: 0.0,
        };
        record.validate()?;
        Ok(record)
    }

    /// Checks the price invariants. Records decoded from storage bypass
    /// `new`, so loaders call this directly.
    pub fn validate(&self) -> Result<(), RecordError> {
        for (field, value) in [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(RecordError::NonPositive { field, value });
            }
        }
        if self.high < self.low {
            return Err(RecordError::HighBelowLow {
                high: self.high,
                low: self.low,
            });
        }
        Ok(())
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn open(&self) -> f64 {
        self.open
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    pub fn close(&self) -> f64 {
        self.close
    }

    pub fn volume(&self) -> u64 {
        self.volume
    }

    /// Profit or loss booked on this date by the last simulation, 0.0 if the
    /// date was never traded.
    pub fn realized_return(&self) -> f64 {
        self.realized_return
    }

    /// close - open
    pub fn intraday_change(&self) -> f64 {
        self.close - self.open
    }

    pub(crate) fn set_realized_return(&mut self, value: f64) {
        self.realized_return = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[test]
    fn new_accepts_valid_bar() {
        let rec = HistoricalRecord::new("AAPL", sample_date(), 100.0, 110.0, 90.0, 105.0, 50_000)
            .unwrap();
        assert_eq!(rec.code(), "AAPL");
        assert_eq!(rec.date(), sample_date());
        assert_eq!(rec.volume(), 50_000);
        assert_eq!(rec.realized_return(), 0.0);
        assert!((rec.intraday_change() - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_rejects_high_below_low() {
        let err = HistoricalRecord::new("AAPL", sample_date(), 100.0, 90.0, 95.0, 92.0, 1)
            .unwrap_err();
        assert_eq!(err, RecordError::HighBelowLow { high: 90.0, low: 95.0 });
    }

    #[test]
    fn new_rejects_non_positive_prices() {
        let err =
            HistoricalRecord::new("AAPL", sample_date(), 0.0, 10.0, 5.0, 6.0, 1).unwrap_err();
        assert!(matches!(err, RecordError::NonPositive { field: "open", .. }));

        let err = HistoricalRecord::new("AAPL", sample_date(), 5.0, 10.0, 5.0, f64::NAN, 1)
            .unwrap_err();
        assert!(matches!(err, RecordError::NonPositive { field: "close", .. }));
    }

    #[test]
    fn flat_bar_is_valid() {
        assert!(HistoricalRecord::new("X", sample_date(), 1.0, 1.0, 1.0, 1.0, 0).is_ok());
    }
}
