//! Alpha scoring contract and a few built-in alphas.
//!
//! The simulator only compares scores within one day's cross-section, so
//! their scale is irrelevant; only ratios drive position sizing.

use crate::domain::error::AlphaSimError;
use crate::domain::historical::HistoricalRecord;
use std::fmt;
use std::str::FromStr;

pub trait Alpha {
    fn score(&self, record: &HistoricalRecord) -> f64;

    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> Alpha for F
where
    F: Fn(&HistoricalRecord) -> f64,
{
    fn score(&self, record: &HistoricalRecord) -> f64 {
        self(record)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaKind {
    /// Same weight for every stock.
    Equal,
    /// close / open of the data day.
    IntradayMomentum,
    /// open / close of the data day.
    MeanReversion,
    /// Traded volume.
    Volume,
    /// Where the close sits inside the day's range, 0..=1.
    RangePosition,
}

impl AlphaKind {
    pub const ALL: [AlphaKind; 5] = [
        AlphaKind::Equal,
        AlphaKind::IntradayMomentum,
        AlphaKind::MeanReversion,
        AlphaKind::Volume,
        AlphaKind::RangePosition,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlphaKind::Equal => "equal",
            AlphaKind::IntradayMomentum => "intraday_momentum",
            AlphaKind::MeanReversion => "mean_reversion",
            AlphaKind::Volume => "volume",
            AlphaKind::RangePosition => "range_position",
        }
    }
}

impl fmt::Display for AlphaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlphaKind {
    type Err = AlphaSimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        AlphaKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| AlphaSimError::UnknownAlpha(s.trim().to_string()))
    }
}

impl Alpha for AlphaKind {
    fn score(&self, record: &HistoricalRecord) -> f64 {
        match self {
            AlphaKind::Equal => 1.0,
            AlphaKind::IntradayMomentum => record.close() / record.open(),
            AlphaKind::MeanReversion => record.open() / record.close(),
            AlphaKind::Volume => record.volume() as f64,
            AlphaKind::RangePosition => {
                let range = record.high() - record.low();
                if range > 0.0 {
                    (record.close() - record.low()) / range
                } else {
                    0.5
                }
            }
        }
    }

    fn name(&self) -> &str {
        self.as_str()
    }
}
