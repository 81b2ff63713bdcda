//! Core domain types and logic.

pub mod historical;
pub mod dataset;
pub mod alpha;
pub mod simulation;
pub mod metrics;
pub mod universe;
pub mod run_config;
pub mod config_validation;
pub mod error;
