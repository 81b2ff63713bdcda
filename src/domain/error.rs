//! Domain error types.

use chrono::NaiveDate;

/// Broad grouping used to tell configuration mistakes apart from runtime
/// data problems.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Data,
    Persistence,
    Io,
}

/// Top-level error type for alphasim.
#[derive(Debug, thiserror::Error)]
pub enum AlphaSimError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("stock universe is empty")]
    EmptyUniverse,

    #[error("invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("unknown alpha: {0}")]
    UnknownAlpha(String),

    #[error(transparent)]
    Universe(#[from] crate::domain::universe::UniverseError),

    #[error("data unavailable for {code}: {reason}")]
    DataUnavailable { code: String, reason: String },

    #[error("insufficient data: have {days} aligned trading days, need {minimum}")]
    InsufficientData { days: usize, minimum: usize },

    #[error("degenerate allocation on {date}: {reason}")]
    DegenerateAllocation { date: NaiveDate, reason: String },

    #[error("funds exhausted before {date}: balance {funds}")]
    FundsExhausted { date: NaiveDate, funds: f64 },

    #[error("misaligned cross-section on {date}: {reason}")]
    MisalignedCrossSection { date: NaiveDate, reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("refusing to overwrite existing dataset at {path}")]
    PersistenceConflict { path: String },

    #[error("no dataset found at {path}")]
    PersistenceMissing { path: String },

    #[error("invalid dataset snapshot at {path}: {reason}")]
    SnapshotInvalid { path: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AlphaSimError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AlphaSimError::ConfigParse { .. }
            | AlphaSimError::ConfigMissing { .. }
            | AlphaSimError::ConfigInvalid { .. }
            | AlphaSimError::EmptyUniverse
            | AlphaSimError::InvalidDateRange { .. }
            | AlphaSimError::UnknownAlpha(_)
            | AlphaSimError::Universe(_) => ErrorCategory::Configuration,
            AlphaSimError::DataUnavailable { .. }
            | AlphaSimError::InsufficientData { .. }
            | AlphaSimError::DegenerateAllocation { .. }
            | AlphaSimError::MisalignedCrossSection { .. }
            | AlphaSimError::FundsExhausted { .. }
            | AlphaSimError::Database { .. } => ErrorCategory::Data,
            AlphaSimError::PersistenceConflict { .. }
            | AlphaSimError::PersistenceMissing { .. }
            | AlphaSimError::SnapshotInvalid { .. } => ErrorCategory::Persistence,
            AlphaSimError::Io(_) => ErrorCategory::Io,
        }
    }
}

impl From<&AlphaSimError> for std::process::ExitCode {
    fn from(err: &AlphaSimError) -> Self {
        let code: u8 = match err.category() {
            ErrorCategory::Io => 1,
            ErrorCategory::Configuration => 2,
            ErrorCategory::Persistence => 3,
            ErrorCategory::Data => 5,
        };
        std::process::ExitCode::from(code)
    }
}
