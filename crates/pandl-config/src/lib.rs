//! pandl-config
//!
//! Persisted settings for the profit-and-loss ledger: which user's data to
//! open, where the document store lives and how it is driven.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::ConfigManager;
pub use model::Config;
