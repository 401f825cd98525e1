//! Fundbook Reconciler - applies accepted matches to the ledger
//!
//! The reconciler turns a confirmed (or auto) match into money movement:
//! payment row, deal balance, anomaly flags, distribution entries and
//! commission accrual, committed as one atomic unit under the deal's
//! lock. Applying the same transaction twice is a no-op.

pub mod config;
pub mod engine;
pub mod error;

pub use config::ReconConfig;
pub use engine::{ApplyOutcome, ReconciliationResult, Reconciler};
pub use error::ReconError;
