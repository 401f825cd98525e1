//! Ledger store - transactional state with per-deal serialization
//!
//! All entities live behind one lock; a reconciliation commit is a
//! single critical section, so no partial state is ever observable.
//! Mutations against one deal are additionally serialized by a per-deal
//! mutex handed out by [`LedgerStore::deal_lock`], acquired with a
//! bounded wait by the reconciler. Reads (matcher, projections) take
//! the shared lock and may observe a slightly stale snapshot, which is
//! fine: the reconciler re-validates under lock before committing.

use crate::commission::{Commission, CommissionStatus};
use crate::deal::{Deal, DealId, DealStatus};
use crate::deal_match::{DealMatch, MatchId, MatchStatus};
use crate::entry::LedgerEntry;
use crate::error::LedgerError;
use crate::participant::Participant;
use crate::payment::Payment;
use crate::transaction::{SourceType, Transaction, TransactionId};
use chrono::{DateTime, Utc};
use fundbook_core::Amount;
use parking_lot::{Mutex, RwLock};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Outcome of an idempotent transaction ingest
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ingest {
    New(TransactionId),
    /// Redelivery: the transaction was already ingested under this id
    Duplicate(TransactionId),
}

/// The deal fields a reconciliation rewrites, computed under the
/// per-deal lock and applied atomically
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealDelta {
    pub deal_id: DealId,
    pub team_id: String,
    pub new_balance: Amount,
    pub status: DealStatus,
    pub nsf_count: u32,
    pub consecutive_underpaid: u32,
    pub approaching_payoff_flagged: bool,
    pub paid_off_at: Option<DateTime<Utc>>,
}

/// Broker commission delta accrued with a payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommissionAccrual {
    pub broker_id: String,
    pub commission_percentage: Decimal,
    pub delta: Decimal,
}

/// Everything one reconciliation commits, as one atomic unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconCommit {
    pub match_id: MatchId,
    pub payment: Payment,
    pub entries: Vec<LedgerEntry>,
    pub commission: Option<CommissionAccrual>,
    pub deal: DealDelta,
}

#[derive(Default)]
struct LedgerState {
    deals: HashMap<DealId, Deal>,
    transactions: HashMap<TransactionId, Transaction>,
    /// Idempotency index over (source_type, external_id)
    tx_index: HashMap<(SourceType, String), TransactionId>,
    matches: HashMap<MatchId, DealMatch>,
    /// Latest live match per transaction; cleared on rejection
    match_by_tx: HashMap<TransactionId, MatchId>,
    payments: Vec<Payment>,
    /// Guard against double-applying a transaction
    payment_by_tx: HashMap<TransactionId, usize>,
    entries: Vec<LedgerEntry>,
    participants: HashMap<DealId, Vec<Participant>>,
    commissions: Vec<Commission>,
}

/// Transactional in-memory ledger store
pub struct LedgerStore {
    state: RwLock<LedgerState>,
    deal_locks: Mutex<HashMap<DealId, Arc<Mutex<()>>>>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(LedgerState::default()),
            deal_locks: Mutex::new(HashMap::new()),
        }
    }

    // === Deals ===

    pub fn insert_deal(&self, deal: Deal) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        if state.deals.contains_key(&deal.id) {
            return Err(LedgerError::DuplicateDeal(deal.id));
        }
        state.deals.insert(deal.id.clone(), deal);
        Ok(())
    }

    pub fn deal(&self, deal_id: &str) -> Option<Deal> {
        self.state.read().deals.get(deal_id).cloned()
    }

    pub fn deals_for_team(&self, team_id: &str) -> Vec<Deal> {
        self.state
            .read()
            .deals
            .values()
            .filter(|d| d.team_id == team_id)
            .cloned()
            .collect()
    }

    /// Collectible deals of a merchant (for next-payment projections)
    pub fn collectible_deals_for_merchant(&self, merchant_id: &str) -> Vec<Deal> {
        self.state
            .read()
            .deals
            .values()
            .filter(|d| d.merchant_id == merchant_id && d.status.is_collectible())
            .cloned()
            .collect()
    }

    /// Collectible deals linked to a source account (matcher candidates)
    pub fn collectible_deals_for_account(&self, account_id: &str) -> Vec<Deal> {
        self.state
            .read()
            .deals
            .values()
            .filter(|d| d.status.is_collectible() && d.is_linked_to(account_id))
            .cloned()
            .collect()
    }

    // === Participants ===

    /// Insert a syndicator position, enforcing the ownership invariant:
    /// active percentages of a deal must not sum past 1.0.
    pub fn add_participant(&self, participant: Participant) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        if !state.deals.contains_key(&participant.deal_id) {
            return Err(LedgerError::UnknownDeal(participant.deal_id));
        }

        let existing: Decimal = state
            .participants
            .get(&participant.deal_id)
            .map(|ps| {
                ps.iter()
                    .filter(|p| p.is_active())
                    .map(|p| p.ownership_percentage)
                    .sum()
            })
            .unwrap_or(Decimal::ZERO);

        let total = existing + participant.ownership_percentage;
        if total > Decimal::ONE {
            return Err(LedgerError::OwnershipExceeded {
                deal_id: participant.deal_id,
                total,
            });
        }

        state
            .participants
            .entry(participant.deal_id.clone())
            .or_default()
            .push(participant);
        Ok(())
    }

    pub fn participants(&self, deal_id: &str) -> Vec<Participant> {
        self.state
            .read()
            .participants
            .get(deal_id)
            .cloned()
            .unwrap_or_default()
    }

    // === Transactions ===

    /// Idempotent ingest keyed on (source_type, external_id).
    /// Redelivery returns `Ingest::Duplicate` with the original id.
    pub fn ingest_transaction(&self, tx: Transaction) -> Result<Ingest, LedgerError> {
        let mut state = self.state.write();
        let key = tx.idempotency_key();
        if let Some(existing) = state.tx_index.get(&key) {
            return Ok(Ingest::Duplicate(existing.clone()));
        }
        let id = tx.id.clone();
        state.tx_index.insert(key, id.clone());
        state.transactions.insert(id.clone(), tx);
        Ok(Ingest::New(id))
    }

    pub fn transaction(&self, tx_id: &str) -> Option<Transaction> {
        self.state.read().transactions.get(tx_id).cloned()
    }

    /// Look a transaction up by its source external id, any source type.
    /// Used to resolve NSF return references.
    pub fn find_transaction_by_external(&self, external_id: &str) -> Option<Transaction> {
        let state = self.state.read();
        state
            .tx_index
            .iter()
            .find(|((_, ext), _)| ext == external_id)
            .and_then(|(_, id)| state.transactions.get(id))
            .cloned()
    }

    pub fn transactions_for_team(&self, team_id: &str) -> Vec<Transaction> {
        self.state
            .read()
            .transactions
            .values()
            .filter(|t| t.team_id == team_id)
            .cloned()
            .collect()
    }

    // === Matches ===

    pub fn record_match(&self, deal_match: DealMatch) -> Result<(), LedgerError> {
        let mut state = self.state.write();
        if !state.transactions.contains_key(&deal_match.transaction_id) {
            return Err(LedgerError::UnknownTransaction(deal_match.transaction_id));
        }
        if !state.deals.contains_key(&deal_match.deal_id) {
            return Err(LedgerError::UnknownDeal(deal_match.deal_id));
        }
        state
            .match_by_tx
            .insert(deal_match.transaction_id.clone(), deal_match.id.clone());
        state.matches.insert(deal_match.id.clone(), deal_match);
        Ok(())
    }

    pub fn get_match(&self, match_id: &str) -> Option<DealMatch> {
        self.state.read().matches.get(match_id).cloned()
    }

    /// All matches currently in the given status (discrepancy queue)
    pub fn matches_with_status(&self, status: MatchStatus) -> Vec<DealMatch> {
        self.state
            .read()
            .matches
            .values()
            .filter(|m| m.status == status)
            .cloned()
            .collect()
    }

    /// The live (non-rejected) match claiming a transaction, if any
    pub fn live_match_for_transaction(&self, tx_id: &str) -> Option<DealMatch> {
        let state = self.state.read();
        state
            .match_by_tx
            .get(tx_id)
            .and_then(|id| state.matches.get(id))
            .filter(|m| m.status.is_live())
            .cloned()
    }

    /// Apply a human/system decision to a match, validating the state
    /// machine. Rejection returns the transaction to the unmatched pool.
    pub fn decide_match(
        &self,
        match_id: &str,
        to: MatchStatus,
    ) -> Result<DealMatch, LedgerError> {
        let mut state = self.state.write();
        let m = state
            .matches
            .get_mut(match_id)
            .ok_or_else(|| LedgerError::UnknownMatch(match_id.to_string()))?;

        if !m.status.can_transition(to) {
            return Err(LedgerError::InvalidMatchTransition {
                id: m.id.clone(),
                status: m.status,
                to,
            });
        }

        m.status = to;
        m.decided_at = Some(Utc::now());
        let updated = m.clone();

        if to == MatchStatus::Rejected {
            state.match_by_tx.remove(&updated.transaction_id);
        }
        Ok(updated)
    }

    // === Payments & entries ===

    pub fn payment(&self, payment_id: &str) -> Option<Payment> {
        self.state
            .read()
            .payments
            .iter()
            .find(|p| p.id == payment_id)
            .cloned()
    }

    /// The payment row applied for a transaction, if any. This is the
    /// reconciler's idempotency check.
    pub fn payment_for_transaction(&self, tx_id: &str) -> Option<Payment> {
        let state = self.state.read();
        state
            .payment_by_tx
            .get(tx_id)
            .and_then(|&i| state.payments.get(i))
            .cloned()
    }

    pub fn payments_for_deal(&self, deal_id: &str) -> Vec<Payment> {
        self.state
            .read()
            .payments
            .iter()
            .filter(|p| p.deal_id == deal_id)
            .cloned()
            .collect()
    }

    pub fn entries_for_payment(&self, payment_id: &str) -> Vec<LedgerEntry> {
        self.state
            .read()
            .entries
            .iter()
            .filter(|e| e.payment_id == payment_id)
            .cloned()
            .collect()
    }

    // === Commissions ===

    pub fn commissions_for_deal(&self, deal_id: &str) -> Vec<Commission> {
        self.state
            .read()
            .commissions
            .iter()
            .filter(|c| c.deal_id == deal_id)
            .cloned()
            .collect()
    }

    /// Close out the deal's pending commission batch for payout export.
    /// Returns the rows marked paid.
    pub fn mark_commissions_paid(&self, deal_id: &str) -> Result<Vec<Commission>, LedgerError> {
        let mut state = self.state.write();
        if !state.deals.contains_key(deal_id) {
            return Err(LedgerError::UnknownDeal(deal_id.to_string()));
        }
        let mut paid = Vec::new();
        for row in state
            .commissions
            .iter_mut()
            .filter(|c| c.deal_id == deal_id && c.status == CommissionStatus::Pending)
        {
            row.mark_paid();
            paid.push(row.clone());
        }
        Ok(paid)
    }

    // === Locking & commit ===

    /// The serialization scope for mutations against one deal. Callers
    /// acquire it with a bounded wait before computing a commit, so two
    /// concurrent payments cannot both read a stale balance.
    pub fn deal_lock(&self, deal_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.deal_locks.lock();
        locks
            .entry(deal_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Apply a reconciliation as one critical section: payment row,
    /// distribution entries, commission accrual, deal delta and match
    /// confirmation all land together or not at all.
    ///
    /// Returns `false` (no-op) when the transaction was already applied,
    /// which makes commit safe under replay and caller retries.
    pub fn commit_reconciliation(&self, commit: &ReconCommit) -> Result<bool, LedgerError> {
        let mut state = self.state.write();

        if state
            .payment_by_tx
            .contains_key(&commit.payment.transaction_id)
        {
            return Ok(false);
        }

        // Validate everything before the first mutation; the mutations
        // below are infallible, which is what makes the commit atomic
        if !state.deals.contains_key(&commit.deal.deal_id) {
            return Err(LedgerError::UnknownDeal(commit.deal.deal_id.clone()));
        }
        if !state.matches.contains_key(&commit.match_id) {
            return Err(LedgerError::UnknownMatch(commit.match_id.clone()));
        }

        if let Some(m) = state.matches.get_mut(&commit.match_id) {
            m.status = MatchStatus::Confirmed;
            if m.decided_at.is_none() {
                m.decided_at = Some(Utc::now());
            }
        }

        let index = state.payments.len();
        state
            .payment_by_tx
            .insert(commit.payment.transaction_id.clone(), index);
        state.payments.push(commit.payment.clone());
        state.entries.extend(commit.entries.iter().cloned());

        if let Some(accrual) = &commit.commission {
            Self::accrue_commission(&mut state, &commit.deal.deal_id, accrual);
        }

        if let Some(deal) = state.deals.get_mut(&commit.deal.deal_id) {
            deal.current_balance = commit.deal.new_balance;
            deal.status = commit.deal.status;
            deal.nsf_count = commit.deal.nsf_count;
            deal.consecutive_underpaid = commit.deal.consecutive_underpaid;
            deal.approaching_payoff_flagged = commit.deal.approaching_payoff_flagged;
            deal.paid_off_at = commit.deal.paid_off_at;
        }

        Ok(true)
    }

    fn accrue_commission(state: &mut LedgerState, deal_id: &str, accrual: &CommissionAccrual) {
        if let Some(open) = state
            .commissions
            .iter_mut()
            .find(|c| c.deal_id == deal_id && c.status == CommissionStatus::Pending)
        {
            open.accrue(accrual.delta);
            return;
        }
        let next_batch = state
            .commissions
            .iter()
            .filter(|c| c.deal_id == deal_id)
            .map(|c| c.batch)
            .max()
            .map_or(1, |b| b + 1);
        let mut row = Commission::open(
            accrual.broker_id.clone(),
            deal_id.to_string(),
            accrual.commission_percentage,
            next_batch,
        );
        row.accrue(accrual.delta);
        state.commissions.push(row);
    }

    // === Audit helpers ===

    /// Sum of signed principal over a deal's payment rows. With balance
    /// conservation this always equals `payback_amount - current_balance`.
    pub fn net_principal_for_deal(&self, deal_id: &str) -> Decimal {
        self.state
            .read()
            .payments
            .iter()
            .filter(|p| p.deal_id == deal_id)
            .map(|p| p.principal)
            .sum()
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new()
    }
}
