//! Fundbook Matcher - proposes deal candidates for inbound transactions
//!
//! Pure read-only scoring over a ledger snapshot: given a transaction,
//! produce zero or more candidate deals with a confidence score and a
//! disposition (auto-apply vs. human review). Persisting the resulting
//! match row and applying it is the caller's responsibility.

pub mod config;
pub mod engine;
pub mod features;

pub use config::MatchConfig;
pub use engine::{Disposition, MatchCandidate, Matcher};
pub use features::MatchFeatures;
