//! Event model
//!
//! One stream carries three kinds of events:
//! - provisioning records (deals, participants) from origination flows,
//! - flow records (ingests, matches, commits) that replay rebuilds
//!   state from - the reconciliation commit is journaled in full so
//!   replay never re-runs engine logic,
//! - outbound signals consumed by notification/export collaborators,
//!   no-ops on replay.

use chrono::{DateTime, Utc};
use fundbook_ledger::{Deal, DealMatch, Participant, ReconCommit, Transaction};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A journaled event
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    // === Provisioning & flow records ===
    DealCreated {
        deal: Deal,
    },
    ParticipantAdded {
        participant: Participant,
    },
    TransactionIngested {
        transaction: Transaction,
    },
    MatchRecorded {
        deal_match: DealMatch,
    },
    MatchConfirmed {
        match_id: String,
    },
    MatchRejected {
        match_id: String,
    },
    ReconciliationCommitted {
        commit: ReconCommit,
    },
    CommissionsPaid {
        deal_id: String,
        batch: u32,
        amount: Decimal,
    },

    // === Outbound signals (ignored by replay) ===
    MatchSuggested {
        match_id: String,
        transaction_id: String,
        deal_id: String,
        confidence: f64,
    },
    PaymentApplied {
        deal_id: String,
        transaction_id: String,
        payment_id: String,
        principal: Decimal,
        new_balance: Decimal,
    },
    DealPaidOff {
        deal_id: String,
        paid_off_at: DateTime<Utc>,
    },
    ApproachingPayoff {
        deal_id: String,
        fraction_paid: Decimal,
    },
    DealNsf {
        deal_id: String,
        transaction_id: String,
        nsf_count: u32,
    },
    DealReopened {
        deal_id: String,
        transaction_id: String,
    },
}

impl LedgerEvent {
    /// Outbound signals are informational; replay skips them
    pub fn is_signal(&self) -> bool {
        matches!(
            self,
            LedgerEvent::MatchSuggested { .. }
                | LedgerEvent::PaymentApplied { .. }
                | LedgerEvent::DealPaidOff { .. }
                | LedgerEvent::ApproachingPayoff { .. }
                | LedgerEvent::DealNsf { .. }
                | LedgerEvent::DealReopened { .. }
        )
    }

    /// Dotted event name for logs and downstream consumers
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::DealCreated { .. } => "deal.created",
            LedgerEvent::ParticipantAdded { .. } => "participant.added",
            LedgerEvent::TransactionIngested { .. } => "transaction.ingested",
            LedgerEvent::MatchRecorded { .. } => "match.recorded",
            LedgerEvent::MatchConfirmed { .. } => "match.confirmed",
            LedgerEvent::MatchRejected { .. } => "match.rejected",
            LedgerEvent::ReconciliationCommitted { .. } => "reconciliation.committed",
            LedgerEvent::CommissionsPaid { .. } => "commissions.paid",
            LedgerEvent::MatchSuggested { .. } => "match.suggested",
            LedgerEvent::PaymentApplied { .. } => "payment.applied",
            LedgerEvent::DealPaidOff { .. } => "deal.paid_off",
            LedgerEvent::ApproachingPayoff { .. } => "deal.approaching_payoff",
            LedgerEvent::DealNsf { .. } => "deal.nsf",
            LedgerEvent::DealReopened { .. } => "deal.reopened",
        }
    }
}

/// Journal line: an event plus its position in the stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Monotone, 1-based sequence number
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}
