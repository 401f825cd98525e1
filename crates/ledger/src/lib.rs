//! Fundbook Ledger - Deal ledger store
//!
//! This is the HEART of Fundbook. All financial state lives in this crate
//! and is mutated only through [`LedgerStore`] commits.
//!
//! # Key Types
//! - `Deal`: a merchant-cash-advance contract collected via daily payments
//! - `Transaction`: a raw bank/processor event, unique per source id
//! - `DealMatch`: a proposed or confirmed transaction-to-deal pairing
//! - `Payment`: an immutable audit row for applied principal
//! - `Participant` / `Commission`: syndication and broker economics
//! - `LedgerStore`: transactional in-memory store with per-deal locks

pub mod anomaly;
pub mod commission;
pub mod deal;
pub mod deal_match;
pub mod entry;
pub mod error;
pub mod participant;
pub mod payment;
pub mod store;
pub mod transaction;

pub use anomaly::Anomaly;
pub use commission::{Commission, CommissionStatus};
pub use deal::{Deal, DealId, DealStatus, LinkedAccount};
pub use deal_match::{DealMatch, MatchId, MatchStatus};
pub use entry::{EntryParty, LedgerEntry};
pub use error::{ErrorKind, LedgerError};
pub use participant::{Participant, ParticipantStatus};
pub use payment::{Payment, PaymentId, PaymentKind};
pub use store::{CommissionAccrual, DealDelta, Ingest, LedgerStore, ReconCommit};
pub use transaction::{FeedRecord, SourceType, Transaction, TransactionId, TransactionKind};
