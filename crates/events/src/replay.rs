//! Journal replay into a ledger store
//!
//! Replay applies flow records through the store's normal API in journal
//! order. Reconciliation commits are journaled in full, so replay never
//! re-runs matcher or reconciler logic; signal events are skipped.

use crate::error::EventError;
use crate::event::{EventEnvelope, LedgerEvent};
use fundbook_ledger::{LedgerStore, MatchStatus};
use tracing::debug;

/// Apply journaled events to a (typically fresh) store.
/// Returns the number of envelopes processed.
pub fn replay_into(store: &LedgerStore, envelopes: &[EventEnvelope]) -> Result<usize, EventError> {
    for envelope in envelopes {
        match &envelope.event {
            LedgerEvent::DealCreated { deal } => {
                store.insert_deal(deal.clone())?;
            }
            LedgerEvent::ParticipantAdded { participant } => {
                store.add_participant(participant.clone())?;
            }
            LedgerEvent::TransactionIngested { transaction } => {
                store.ingest_transaction(transaction.clone())?;
            }
            LedgerEvent::MatchRecorded { deal_match } => {
                store.record_match(deal_match.clone())?;
            }
            LedgerEvent::MatchConfirmed { match_id } => {
                store.decide_match(match_id, MatchStatus::Confirmed)?;
            }
            LedgerEvent::MatchRejected { match_id } => {
                store.decide_match(match_id, MatchStatus::Rejected)?;
            }
            LedgerEvent::ReconciliationCommitted { commit } => {
                store.commit_reconciliation(commit)?;
            }
            LedgerEvent::CommissionsPaid { deal_id, .. } => {
                store.mark_commissions_paid(deal_id)?;
            }
            signal => {
                debug!(event = signal.name(), "skipping signal during replay");
            }
        }
    }
    Ok(envelopes.len())
}
