//! Port traits implemented by [`crate::adapters`].

pub mod config_port;
pub mod dataset_store;
pub mod price_port;
