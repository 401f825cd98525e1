//! Reconciler errors

use fundbook_ledger::{ErrorKind, LedgerError, MatchStatus};
use thiserror::Error;

/// Errors raised while applying a match
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Distribution error: {0}")]
    Distribution(#[from] fundbook_distribution::DistributionError),

    #[error("Match {id} is {status}, not applicable")]
    MatchNotApplicable { id: String, status: MatchStatus },

    #[error("No applied payment found for NSF return {transaction_id}")]
    MissingReversalTarget { transaction_id: String },

    #[error("Payment {payment_id} was already reversed")]
    AlreadyReversed { payment_id: String },
}

impl ReconError {
    /// Classify into the retry taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReconError::Ledger(e) => e.kind(),
            ReconError::Distribution(_) => ErrorKind::Validation,
            ReconError::MatchNotApplicable { .. } | ReconError::AlreadyReversed { .. } => {
                ErrorKind::Conflict
            }
            ReconError::MissingReversalTarget { .. } => ErrorKind::Validation,
        }
    }

    /// True if the caller may retry the whole `apply` call
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }
}
