//! Binary dataset snapshots.
//!
//! A snapshot is a bincode-encoded, versioned list of every record in the
//! dataset (date ascending, cross-section order within a date), so reloading
//! reproduces the mapping and its per-date ordering exactly.

use crate::domain::dataset::HistoricalDataset;
use crate::domain::error::AlphaSimError;
use crate::domain::historical::HistoricalRecord;
use crate::ports::dataset_store::DatasetStore;
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

pub const DATASET_SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize)]
struct SnapshotOut<'a> {
    version: u32,
    generated_at: DateTime<Utc>,
    records: Vec<&'a HistoricalRecord>,
}

#[derive(Deserialize)]
struct DatasetSnapshot {
    version: u32,
    generated_at: DateTime<Utc>,
    records: Vec<HistoricalRecord>,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SnapshotAdapter;

impl SnapshotAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Loads the dataset together with the time the snapshot was written.
    pub fn load_with_timestamp(
        &self,
        path: &Path,
    ) -> Result<(HistoricalDataset, DateTime<Utc>), AlphaSimError> {
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => AlphaSimError::PersistenceMissing {
                path: path.display().to_string(),
            },
            _ => AlphaSimError::Io(e),
        })?;

        let snapshot: DatasetSnapshot =
            bincode::deserialize_from(BufReader::new(file)).map_err(|e| invalid(path, e))?;

        if snapshot.version != DATASET_SNAPSHOT_VERSION {
            return Err(invalid(
                path,
                format!(
                    "version mismatch (found {}, expected {})",
                    snapshot.version, DATASET_SNAPSHOT_VERSION
                ),
            ));
        }

        for record in &snapshot.records {
            record
                .validate()
                .map_err(|e| invalid(path, format!("{} on {}: {}", record.code(), record.date(), e)))?;
        }

        let dataset = HistoricalDataset::from_records(snapshot.records);
        info!(
            "loaded {} records over {} dates from {} (written {})",
            dataset.record_count(),
            dataset.len(),
            path.display(),
            snapshot.generated_at
        );
        Ok((dataset, snapshot.generated_at))
    }
}

fn invalid(path: &Path, reason: impl ToString) -> AlphaSimError {
    AlphaSimError::SnapshotInvalid {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}

impl DatasetStore for SnapshotAdapter {
    fn save(&self, dataset: &HistoricalDataset, path: &Path) -> Result<(), AlphaSimError> {
        let snapshot = SnapshotOut {
            version: DATASET_SNAPSHOT_VERSION,
            generated_at: Utc::now(),
            records: dataset.records().collect(),
        };
        let bytes = bincode::serialize(&snapshot).map_err(|e| invalid(path, e))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                return Err(AlphaSimError::PersistenceConflict {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut writer = BufWriter::new(file);
        if let Err(e) = writer.write_all(&bytes).and_then(|()| writer.flush()) {
            drop(writer);
            // Leave no truncated snapshot behind.
            let _ = fs::remove_file(path);
            return Err(e.into());
        }

        info!(
            "saved {} records over {} dates to {}",
            dataset.record_count(),
            dataset.len(),
            path.display()
        );
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<HistoricalDataset, AlphaSimError> {
        self.load_with_timestamp(path).map(|(dataset, _)| dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::alpha::AlphaKind;
    use crate::domain::simulation::simulate;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_dataset() -> HistoricalDataset {
        let mut records = Vec::new();
        for day in 1..=3 {
            let date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
            let p = day as f64;
            records.push(
                HistoricalRecord::new("MSFT", date, 300.0 + p, 305.0 + p, 295.0, 301.5 + p, 7)
                    .unwrap(),
            );
            records.push(
                HistoricalRecord::new("AAPL", date, 180.0 - p, 182.0, 170.0, 179.25, 11).unwrap(),
            );
        }
        HistoricalDataset::from_records(records)
    }

    #[test]
    fn save_then_load_restores_everything() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("stock_data.bin");
        let mut dataset = sample_dataset();
        simulate(&mut dataset, &AlphaKind::Equal).unwrap();

        let store = SnapshotAdapter::new();
        store.save(&dataset, &path).unwrap();
        let loaded = store.load(&path).unwrap();

        assert_eq!(loaded, dataset);
        assert_eq!(loaded.stock_codes(), vec!["MSFT", "AAPL"]);
        assert!(loaded.records().any(|r| r.realized_return() != 0.0));
    }

    #[test]
    fn save_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stock_data.bin");
        fs::write(&path, b"occupied").unwrap();

        let err = SnapshotAdapter::new()
            .save(&sample_dataset(), &path)
            .unwrap_err();

        assert!(matches!(err, AlphaSimError::PersistenceConflict { .. }));
        assert_eq!(fs::read(&path).unwrap(), b"occupied");
    }

    #[test]
    fn load_missing_path_fails() {
        let dir = TempDir::new().unwrap();
        let err = SnapshotAdapter::new()
            .load(&dir.path().join("absent.bin"))
            .unwrap_err();
        assert!(matches!(err, AlphaSimError::PersistenceMissing { .. }));
    }

    #[test]
    fn load_garbage_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.bin");
        fs::write(&path, [0xffu8; 3]).unwrap();

        let err = SnapshotAdapter::new().load(&path).unwrap_err();
        assert!(matches!(err, AlphaSimError::SnapshotInvalid { .. }));
    }

    #[test]
    fn load_rejects_other_versions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("future.bin");
        let future = SnapshotOut {
            version: DATASET_SNAPSHOT_VERSION + 1,
            generated_at: Utc::now(),
            records: Vec::new(),
        };
        fs::write(&path, bincode::serialize(&future).unwrap()).unwrap();

        let err = SnapshotAdapter::new().load(&path).unwrap_err();
        assert!(
            matches!(err, AlphaSimError::SnapshotInvalid { reason, .. } if reason.contains("version"))
        );
    }

    #[test]
    fn timestamp_is_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stamped.bin");
        let before = Utc::now();
        SnapshotAdapter::new().save(&sample_dataset(), &path).unwrap();

        let (dataset, written) = SnapshotAdapter::new().load_with_timestamp(&path).unwrap();

        assert_eq!(dataset, sample_dataset());
        assert!(written >= before && written <= Utc::now());
    }

    #[test]
    fn empty_dataset_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.bin");
        let store = SnapshotAdapter::new();
        store.save(&HistoricalDataset::new(), &path).unwrap();
        assert!(store.load(&path).unwrap().is_empty());
    }
}
