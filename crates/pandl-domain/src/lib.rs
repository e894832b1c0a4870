//! pandl-domain
//!
//! Pure domain models for the profit-and-loss ledger: the October to September
//! fiscal calendar, the four source record types, fixed-cost schedules and the
//! derived monthly summary. No I/O, no storage.

pub mod error;
pub mod figures;
pub mod fiscal;
pub mod fixed_cost;
pub mod summary;

pub use error::ValidationError;
pub use figures::*;
pub use fiscal::*;
pub use fixed_cost::*;
pub use summary::*;
