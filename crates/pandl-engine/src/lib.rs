//! pandl-engine
//!
//! Aggregation, reconciliation and comparison services for the profit-and-loss
//! ledger. Depends on pandl-domain. All persistence goes through the
//! [`DocumentStore`] collaborator passed in by the caller.

pub mod aggregation_service;
pub mod comparison_service;
pub mod error;
pub mod memory_store;
pub mod reconcile_service;
pub mod recurrence_service;
pub mod repository;
pub mod rollover_service;
pub mod storage;
pub mod time;

pub use aggregation_service::*;
pub use comparison_service::*;
pub use error::CoreError;
pub use memory_store::MemoryDocumentStore;
pub use reconcile_service::*;
pub use recurrence_service::*;
pub use repository::*;
pub use rollover_service::*;
pub use storage::*;
pub use time::*;

#[cfg(test)]
mod tests;
