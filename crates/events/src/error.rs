//! Event journal errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Ledger error during replay: {0}")]
    Replay(#[from] fundbook_ledger::LedgerError),

    #[error("Invalid event file: {0}")]
    InvalidFile(String),
}
