//! Fundbook Events - the append-only journal
//!
//! Every state change is journaled as a JSON line; the in-memory store
//! and the SQLite feed projection are rebuilt by replaying the journal
//! at startup. Outbound signal events
//! (`match.suggested`, `payment.applied`, ...) share the same stream
//! and are ignored by replay.

pub mod error;
pub mod event;
pub mod reader;
pub mod replay;
pub mod store;

pub use error::EventError;
pub use event::{EventEnvelope, LedgerEvent};
pub use reader::EventReader;
pub use replay::replay_into;
pub use store::EventJournal;
