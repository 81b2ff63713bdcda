//! Historical dataset: date -> cross-section of per-stock records.
//!
//! The dataset is assembled once from a [`PriceProvider`], repaired so every
//! retained date carries the full cross-section, and then only read by the
//! simulator (apart from each record's realized return).

use crate::domain::error::AlphaSimError;
use crate::domain::historical::HistoricalRecord;
use crate::ports::price_port::{PriceProvider, PriceRow};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalDataset {
    by_date: BTreeMap<NaiveDate, Vec<HistoricalRecord>>,
}

impl HistoricalDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a dataset from records listed date by date, each date's
    /// records in cross-section order.
    pub fn from_records(records: impl IntoIterator<Item = HistoricalRecord>) -> Self {
        let mut dataset = Self::new();
        for record in records {
            dataset.insert(record);
        }
        dataset
    }

    /// Appends `record` to its date's cross-section.
    pub fn insert(&mut self, record: HistoricalRecord) {
        self.by_date.entry(record.date()).or_default().push(record);
    }

    /// Drops every date whose record count is below the maximum observed
    /// count. Returns the removed dates in ascending order.
    pub fn repair_coverage(&mut self) -> Vec<NaiveDate> {
        let max_count = self.by_date.values().map(Vec::len).max().unwrap_or(0);
        let removed: Vec<NaiveDate> = self
            .by_date
            .iter()
            .filter(|(_, records)| records.len() < max_count)
            .map(|(date, _)| *date)
            .collect();
        for date in &removed {
            self.by_date.remove(date);
        }
        removed
    }

    /// All dates, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.by_date.keys().copied().collect()
    }

    pub fn cross_section(&self, date: NaiveDate) -> Option<&[HistoricalRecord]> {
        self.by_date.get(&date).map(Vec::as_slice)
    }

    pub(crate) fn cross_section_mut(&mut self, date: NaiveDate) -> Option<&mut [HistoricalRecord]> {
        self.by_date.get_mut(&date).map(Vec::as_mut_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[HistoricalRecord])> {
        self.by_date
            .iter()
            .map(|(date, records)| (*date, records.as_slice()))
    }

    /// Every record, date ascending, cross-section order within a date.
    pub fn records(&self) -> impl Iterator<Item = &HistoricalRecord> {
        self.by_date.values().flatten()
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.by_date.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    /// Stock codes of the earliest date's cross-section.
    pub fn stock_codes(&self) -> Vec<String> {
        self.by_date
            .values()
            .next()
            .map(|records| records.iter().map(|r| r.code().to_string()).collect())
            .unwrap_or_default()
    }

    /// Clears the realized returns left behind by a previous simulation.
    pub fn reset_returns(&mut self) {
        for record in self.by_date.values_mut().flatten() {
            record.set_realized_return(0.0);
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    Provider(String),
    NoData,
    NoValidRows { rejected: usize },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Provider(reason) => write!(f, "{reason}"),
            SkipReason::NoData => write!(f, "no data found"),
            SkipReason::NoValidRows { rejected } => {
                write!(f, "all {rejected} rows rejected")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedStock {
    pub code: String,
    pub reason: SkipReason,
}

/// Dataset plus the post-fetch summary of what was left out.
#[derive(Debug, Clone)]
pub struct DatasetBuild {
    pub dataset: HistoricalDataset,
    pub skipped: Vec<SkippedStock>,
    pub removed_dates: Vec<NaiveDate>,
    pub rejected_rows: usize,
}

pub fn build_dataset(
    provider: &dyn PriceProvider,
    universe: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<DatasetBuild, AlphaSimError> {
    if universe.is_empty() {
        return Err(AlphaSimError::EmptyUniverse);
    }
    if start_date > end_date {
        return Err(AlphaSimError::InvalidDateRange {
            start: start_date,
            end: end_date,
        });
    }

    let mut dataset = HistoricalDataset::new();
    let mut skipped = Vec::new();
    let mut rejected_rows = 0usize;

    for code in universe {
        let rows = match provider.fetch_historical(code, start_date, end_date) {
            Ok(rows) => rows,
            Err(e) => {
                warn!("skipping {} ({})", code, e);
                skipped.push(SkippedStock {
                    code: code.clone(),
                    reason: SkipReason::Provider(e.to_string()),
                });
                continue;
            }
        };

        if rows.is_empty() {
            warn!("skipping {} (no data found)", code);
            skipped.push(SkippedStock {
                code: code.clone(),
                reason: SkipReason::NoData,
            });
            continue;
        }

        let mut seen = HashSet::new();
        let mut accepted = 0usize;
        let mut rejected = 0usize;
        for row in &rows {
            match record_from_row(code, row, start_date, end_date) {
                Ok(record) if seen.insert(record.date()) => {
                    dataset.insert(record);
                    accepted += 1;
                }
                Ok(record) => {
                    warn!("{}: duplicate row for {}, keeping the first", code, record.date());
                    rejected += 1;
                }
                Err(reason) => {
                    warn!("{}: rejecting row {:?} ({})", code, row.date, reason);
                    rejected += 1;
                }
            }
        }
        rejected_rows += rejected;

        if accepted == 0 {
            warn!("skipping {} (every row rejected)", code);
            skipped.push(SkippedStock {
                code: code.clone(),
                reason: SkipReason::NoValidRows { rejected },
            });
            continue;
        }
        info!("  {}: {} rows", code, accepted);
    }

    if skipped.len() == universe.len() {
        return Err(AlphaSimError::DataUnavailable {
            code: "all".to_string(),
            reason: "no stock in the universe returned usable data".to_string(),
        });
    }

    let removed_dates = dataset.repair_coverage();
    if !removed_dates.is_empty() {
        info!(
            "coverage repair removed {} of {} dates",
            removed_dates.len(),
            removed_dates.len() + dataset.len()
        );
    }
    if !skipped.is_empty() {
        info!(
            "dataset built for {} of {} stocks",
            universe.len() - skipped.len(),
            universe.len()
        );
    }

    Ok(DatasetBuild {
        dataset,
        skipped,
        removed_dates,
        rejected_rows,
    })
}

fn record_from_row(
    code: &str,
    row: &PriceRow,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<HistoricalRecord, String> {
    let date = NaiveDate::parse_from_str(row.date.trim(), "%Y-%m-%d")
        .map_err(|e| format!("invalid date: {e}"))?;
    if date < start_date || date > end_date {
        return Err(format!("{date} outside {start_date}..={end_date}"));
    }
    HistoricalRecord::new(code, date, row.open, row.high, row.low, row.close, row.volume)
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(code: &str, day: NaiveDate, close: f64) -> HistoricalRecord {
        HistoricalRecord::new(code, day, close - 1.0, close + 1.0, close - 2.0, close, 1000)
            .unwrap()
    }

    fn row(date: &str, close: f64) -> PriceRow {
        PriceRow {
            date: date.to_string(),
            open: close - 1.0,
            high: close + 1.0,
            low: close - 2.0,
            close,
            volume: 1000,
        }
    }

    struct StubProvider {
        rows: HashMap<String, Vec<PriceRow>>,
    }

    impl PriceProvider for StubProvider {
        fn fetch_historical(
            &self,
            code: &str,
            _start_date: NaiveDate,
            _end_date: NaiveDate,
        ) -> Result<Vec<PriceRow>, AlphaSimError> {
            self.rows
                .get(code)
                .cloned()
                .ok_or_else(|| AlphaSimError::DataUnavailable {
                    code: code.to_string(),
                    reason: "unknown symbol".into(),
                })
        }
    }

    #[test]
    fn insert_keeps_cross_section_order() {
        let mut ds = HistoricalDataset::new();
        ds.insert(record("MSFT", date(2024, 1, 2), 10.0));
        ds.insert(record("AAPL", date(2024, 1, 2), 20.0));
        let codes: Vec<_> = ds
            .cross_section(date(2024, 1, 2))
            .unwrap()
            .iter()
            .map(|r| r.code())
            .collect();
        assert_eq!(codes, vec!["MSFT", "AAPL"]);
    }

    #[test]
    fn dates_are_sorted() {
        let mut ds = HistoricalDataset::new();
        ds.insert(record("A", date(2024, 1, 5), 10.0));
        ds.insert(record("A", date(2024, 1, 1), 10.0));
        ds.insert(record("A", date(2024, 1, 3), 10.0));
        assert_eq!(
            ds.dates(),
            vec![date(2024, 1, 1), date(2024, 1, 3), date(2024, 1, 5)]
        );
    }

    #[test]
    fn repair_coverage_drops_short_dates() {
        let mut ds = HistoricalDataset::new();
        for d in [date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)] {
            ds.insert(record("A", d, 10.0));
        }
        ds.insert(record("B", date(2024, 1, 1), 20.0));
        ds.insert(record("B", date(2024, 1, 3), 20.0));

        let removed = ds.repair_coverage();

        assert_eq!(removed, vec![date(2024, 1, 2)]);
        assert_eq!(ds.dates(), vec![date(2024, 1, 1), date(2024, 1, 3)]);
        assert!(ds.iter().all(|(_, records)| records.len() == 2));
    }

    #[test]
    fn repair_coverage_on_empty_dataset() {
        let mut ds = HistoricalDataset::new();
        assert!(ds.repair_coverage().is_empty());
        assert!(ds.is_empty());
    }

    #[test]
    fn reset_returns_zeroes_every_record() {
        let mut ds = HistoricalDataset::new();
        ds.insert(record("A", date(2024, 1, 1), 10.0));
        ds.cross_section_mut(date(2024, 1, 1)).unwrap()[0].set_realized_return(42.0);
        ds.reset_returns();
        assert!(ds.records().all(|r| r.realized_return() == 0.0));
    }

    #[test]
    fn stock_codes_from_first_date() {
        let mut ds = HistoricalDataset::new();
        ds.insert(record("A", date(2024, 1, 2), 10.0));
        ds.insert(record("B", date(2024, 1, 2), 10.0));
        assert_eq!(ds.stock_codes(), vec!["A", "B"]);
        assert_eq!(ds.record_count(), 2);
    }

    #[test]
    fn build_rejects_empty_universe() {
        let provider = StubProvider {
            rows: HashMap::new(),
        };
        let result = build_dataset(&provider, &[], date(2024, 1, 1), date(2024, 1, 31));
        assert!(matches!(result, Err(AlphaSimError::EmptyUniverse)));
    }

    #[test]
    fn build_rejects_inverted_range() {
        let provider = StubProvider {
            rows: HashMap::new(),
        };
        let result = build_dataset(
            &provider,
            &["A".to_string()],
            date(2024, 2, 1),
            date(2024, 1, 1),
        );
        assert!(matches!(result, Err(AlphaSimError::InvalidDateRange { .. })));
    }

    #[test]
    fn build_skips_failing_stock_and_repairs() {
        let mut rows = HashMap::new();
        rows.insert(
            "A".to_string(),
            vec![row("2024-01-01", 10.0), row("2024-01-02", 11.0)],
        );
        rows.insert("B".to_string(), vec![row("2024-01-02", 20.0)]);
        let provider = StubProvider { rows };
        let universe = vec!["A".to_string(), "B".to_string(), "GONE".to_string()];

        let build = build_dataset(&provider, &universe, date(2024, 1, 1), date(2024, 1, 31))
            .unwrap();

        assert_eq!(build.skipped.len(), 1);
        assert_eq!(build.skipped[0].code, "GONE");
        assert_eq!(build.removed_dates, vec![date(2024, 1, 1)]);
        assert_eq!(build.dataset.dates(), vec![date(2024, 1, 2)]);
        assert_eq!(build.dataset.stock_codes(), vec!["A", "B"]);
    }

    #[test]
    fn build_rejects_bad_rows() {
        let mut rows = HashMap::new();
        rows.insert(
            "A".to_string(),
            vec![
                row("2024-01-01", 10.0),
                row("01/02/2024", 10.0),
                row("2024-01-01", 12.0),
                row("2024-03-01", 10.0),
                PriceRow {
                    high: 1.0,
                    ..row("2024-01-03", 10.0)
                },
            ],
        );
        let provider = StubProvider { rows };

        let build =
            build_dataset(&provider, &["A".to_string()], date(2024, 1, 1), date(2024, 1, 31))
                .unwrap();

        assert_eq!(build.rejected_rows, 4);
        assert_eq!(build.dataset.dates(), vec![date(2024, 1, 1)]);
        let kept = &build.dataset.cross_section(date(2024, 1, 1)).unwrap()[0];
        assert_eq!(kept.close(), 10.0);
    }

    #[test]
    fn build_fails_when_every_stock_is_skipped() {
        let mut rows = HashMap::new();
        rows.insert("EMPTY".to_string(), Vec::new());
        let provider = StubProvider { rows };
        let universe = vec!["EMPTY".to_string(), "GONE".to_string()];

        let result = build_dataset(&provider, &universe, date(2024, 1, 1), date(2024, 1, 31));

        assert!(
            matches!(result, Err(AlphaSimError::DataUnavailable { ref code, .. }) if code == "all")
        );
    }
}
