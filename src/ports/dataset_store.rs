//! Dataset persistence port.

use crate::domain::dataset::HistoricalDataset;
use crate::domain::error::AlphaSimError;
use std::path::Path;

pub trait DatasetStore {
    /// Persist `dataset` at `path`. Fails with `PersistenceConflict` when the
    /// path is already occupied; nothing is written in that case.
    fn save(&self, dataset: &HistoricalDataset, path: &Path) -> Result<(), AlphaSimError>;

    /// Fails with `PersistenceMissing` when nothing exists at `path`.
    fn load(&self, path: &Path) -> Result<HistoricalDataset, AlphaSimError>;
}
