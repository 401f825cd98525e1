//! Fundbook Distribution - proceeds and commission splits
//!
//! Pure computation: given an applied payment and the deal's syndicate,
//! produce the per-participant ledger entries and the broker commission
//! delta. Nothing here mutates state; the reconciler commits the output
//! in the same atomic unit as the payment itself, so proceeds are never
//! computed against a balance that later rolls back.

pub mod error;
pub mod split;

pub use error::DistributionError;
pub use split::{commission_for, distribute};
