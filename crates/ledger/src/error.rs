//! Ledger errors

use crate::deal::DealStatus;
use crate::deal_match::MatchStatus;
use rust_decimal::Decimal;
use thiserror::Error;

/// Coarse classification used by callers to decide retry behavior.
///
/// - `Validation`: malformed input, rejected immediately, never retried
/// - `Conflict`: state disagreement requiring a human/business decision
/// - `Transient`: contention or connectivity, safe to retry with backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Conflict,
    Transient,
}

/// Errors that can occur in ledger operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Duplicate deal: {0}")]
    DuplicateDeal(String),

    #[error("Unknown deal: {0}")]
    UnknownDeal(String),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("Unknown match: {0}")]
    UnknownMatch(String),

    #[error("Match {id} is {status}, cannot transition to {to}")]
    InvalidMatchTransition {
        id: String,
        status: MatchStatus,
        to: MatchStatus,
    },

    #[error("Deal {id} is in terminal state {status}")]
    DealTerminal { id: String, status: DealStatus },

    #[error("Ownership percentage must be in [0, 1]: {0}")]
    InvalidOwnership(Decimal),

    #[error("Active ownership for deal {deal_id} would reach {total}, over 100%")]
    OwnershipExceeded { deal_id: String, total: Decimal },

    #[error("Transaction amount cannot be negative: {0}")]
    NegativeAmount(Decimal),

    #[error("Transaction external id cannot be empty")]
    EmptyExternalId,

    #[error("Timed out waiting for lock on deal {0}")]
    LockTimeout(String),
}

impl LedgerError {
    /// Classify into the retry taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::UnknownDeal(_)
            | LedgerError::UnknownTransaction(_)
            | LedgerError::UnknownMatch(_)
            | LedgerError::InvalidOwnership(_)
            | LedgerError::OwnershipExceeded { .. }
            | LedgerError::NegativeAmount(_)
            | LedgerError::EmptyExternalId => ErrorKind::Validation,

            LedgerError::DuplicateDeal(_)
            | LedgerError::InvalidMatchTransition { .. }
            | LedgerError::DealTerminal { .. } => ErrorKind::Conflict,

            LedgerError::LockTimeout(_) => ErrorKind::Transient,
        }
    }

    /// True if the caller may retry the operation as-is
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
