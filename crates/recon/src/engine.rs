//! Payment application
//!
//! `apply` is the only path that moves money. It validates the match,
//! serializes on the deal's lock with a bounded wait, computes the full
//! commit (payment, anomalies, balance, distribution, commission) and
//! lands it in one critical section. Everything re-validates under the
//! lock, so matcher proposals may run against stale snapshots safely.

use crate::config::ReconConfig;
use crate::error::ReconError;
use chrono::Utc;
use fundbook_core::Amount;
use fundbook_distribution::{commission_for, distribute};
use fundbook_ledger::{
    Anomaly, CommissionAccrual, Deal, DealDelta, DealMatch, DealStatus, LedgerError, LedgerStore,
    Payment, PaymentKind, ReconCommit, Transaction, TransactionKind,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;

/// What one `apply` call did
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationResult {
    pub deal_id: String,
    pub transaction_id: String,
    pub payment_id: String,
    /// Signed principal credited against the balance
    pub applied_principal: Decimal,
    pub new_balance: Decimal,
    pub anomalies: Vec<Anomaly>,
    pub deal_closed: bool,
    /// True the first time the payoff fraction crosses the warning line
    pub approaching_payoff: bool,
    /// True when an NSF reversal reopened a paid-off deal
    pub reopened: bool,
}

/// Result plus the commit that produced it; `commit` is `None` when the
/// transaction had already been applied and the call was a no-op
#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub result: ReconciliationResult,
    pub commit: Option<ReconCommit>,
}

/// Applies accepted matches to the ledger
pub struct Reconciler {
    config: ReconConfig,
}

impl Reconciler {
    pub fn new(config: ReconConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReconConfig {
        &self.config
    }

    /// Apply a match in `auto` or `confirmed` status.
    ///
    /// Idempotent: if the transaction already has a payment row, the
    /// recorded outcome is returned unchanged. Any failure leaves the
    /// ledger exactly as it was; callers retry the whole call on
    /// transient errors.
    pub fn apply(&self, store: &LedgerStore, match_id: &str) -> Result<ApplyOutcome, ReconError> {
        let deal_match = store
            .get_match(match_id)
            .ok_or_else(|| LedgerError::UnknownMatch(match_id.to_string()))?;

        if !deal_match.status.is_applicable() {
            return Err(ReconError::MatchNotApplicable {
                id: deal_match.id,
                status: deal_match.status,
            });
        }

        let tx = store
            .transaction(&deal_match.transaction_id)
            .ok_or_else(|| LedgerError::UnknownTransaction(deal_match.transaction_id.clone()))?;

        // Fast idempotency path; rechecked under the lock below
        if let Some(payment) = store.payment_for_transaction(&tx.id) {
            return Ok(ApplyOutcome {
                result: Self::replayed(&payment),
                commit: None,
            });
        }

        let lock = store.deal_lock(&deal_match.deal_id);
        let _guard = lock
            .try_lock_for(self.config.lock_timeout())
            .ok_or_else(|| LedgerError::LockTimeout(deal_match.deal_id.clone()))?;

        if let Some(payment) = store.payment_for_transaction(&tx.id) {
            return Ok(ApplyOutcome {
                result: Self::replayed(&payment),
                commit: None,
            });
        }

        let deal = store
            .deal(&deal_match.deal_id)
            .ok_or_else(|| LedgerError::UnknownDeal(deal_match.deal_id.clone()))?;

        let (commit, result) = match tx.kind {
            TransactionKind::Payment => self.build_payment(&deal_match, &tx, &deal, store)?,
            TransactionKind::NsfReturn => self.build_reversal(&deal_match, &tx, &deal, store)?,
        };

        store.commit_reconciliation(&commit)?;
        info!(
            deal_id = %result.deal_id,
            principal = %result.applied_principal,
            balance = %result.new_balance,
            closed = result.deal_closed,
            "reconciliation committed"
        );

        Ok(ApplyOutcome {
            result,
            commit: Some(commit),
        })
    }

    fn build_payment(
        &self,
        deal_match: &DealMatch,
        tx: &Transaction,
        deal: &Deal,
        store: &LedgerStore,
    ) -> Result<(ReconCommit, ReconciliationResult), ReconError> {
        if deal.status.is_terminal() {
            return Err(ReconError::Ledger(LedgerError::DealTerminal {
                id: deal.id.clone(),
                status: deal.status,
            }));
        }

        let daily = deal.daily_payment.value();
        let actual = tx.amount.value();

        let mut anomalies = Vec::new();
        if daily > Decimal::ZERO {
            if actual < daily * (Decimal::ONE - self.config.underpay_tolerance) {
                anomalies.push(Anomaly::Underpaid {
                    expected: daily,
                    actual,
                });
            } else if actual > daily * (Decimal::ONE + self.config.overpay_tolerance) {
                anomalies.push(Anomaly::Overpaid {
                    expected: daily,
                    actual,
                });
            }
        }
        let underpaid = anomalies
            .iter()
            .any(|a| matches!(a, Anomaly::Underpaid { .. }));

        // Never credit past the outstanding balance
        let applied = tx.amount.min(deal.current_balance).value();
        let new_balance = deal.current_balance.value() - applied;
        let closed = new_balance.is_zero();

        let streak = if underpaid {
            deal.consecutive_underpaid + 1
        } else {
            0
        };
        let status = if closed {
            DealStatus::PaidOff
        } else if underpaid && streak >= self.config.late_after_underpayments {
            DealStatus::Late
        } else if !underpaid && deal.status == DealStatus::Late {
            DealStatus::Active
        } else {
            deal.status
        };

        let payback = deal.payback_amount.value();
        let fraction = if payback.is_zero() {
            Decimal::ZERO
        } else {
            (payback - new_balance) / payback
        };
        let approaching = !closed
            && !deal.approaching_payoff_flagged
            && fraction >= self.config.payoff_warning_fraction;

        let payment = Payment::applied(&tx.id, &deal.id, applied, new_balance, anomalies.clone());
        let participants = store.participants(&deal.id);
        let entries = distribute(&payment.id, &deal.id, &participants, applied, &deal.currency)?;
        let commission = self.commission_accrual(deal, applied);

        let payment_id = payment.id.clone();
        let commit = ReconCommit {
            match_id: deal_match.id.clone(),
            payment,
            entries,
            commission,
            deal: DealDelta {
                deal_id: deal.id.clone(),
                team_id: deal.team_id.clone(),
                // min() above keeps this non-negative
                new_balance: Amount::new_unchecked(new_balance),
                status,
                nsf_count: deal.nsf_count,
                consecutive_underpaid: streak,
                approaching_payoff_flagged: deal.approaching_payoff_flagged || approaching,
                paid_off_at: if closed {
                    Some(Utc::now())
                } else {
                    deal.paid_off_at
                },
            },
        };
        let result = ReconciliationResult {
            deal_id: deal.id.clone(),
            transaction_id: tx.id.clone(),
            payment_id,
            applied_principal: applied,
            new_balance,
            anomalies,
            deal_closed: closed,
            approaching_payoff: approaching,
            reopened: false,
        };
        Ok((commit, result))
    }

    /// Reverse a bounced payment. Reversals act against history and are
    /// valid on terminal deals; if the balance comes back above zero on
    /// a paid-off deal, the deal reopens (explicit business policy).
    fn build_reversal(
        &self,
        deal_match: &DealMatch,
        tx: &Transaction,
        deal: &Deal,
        store: &LedgerStore,
    ) -> Result<(ReconCommit, ReconciliationResult), ReconError> {
        let target = tx
            .related_external_id
            .as_deref()
            .and_then(|ext| store.find_transaction_by_external(ext))
            .and_then(|orig| store.payment_for_transaction(&orig.id))
            .filter(|p| p.kind == PaymentKind::Applied && p.deal_id == deal.id)
            .ok_or_else(|| ReconError::MissingReversalTarget {
                transaction_id: tx.id.clone(),
            })?;

        let already_reversed = store
            .payments_for_deal(&deal.id)
            .iter()
            .any(|p| p.reverses.as_deref() == Some(target.id.as_str()));
        if already_reversed {
            return Err(ReconError::AlreadyReversed {
                payment_id: target.id,
            });
        }

        let reversed = target.principal;
        let new_balance = deal.current_balance.value() + reversed;
        let reopened = deal.status == DealStatus::PaidOff && new_balance > Decimal::ZERO;

        let anomalies = vec![Anomaly::NsfReturn {
            reversed_payment_id: target.id.clone(),
        }];
        let payment = Payment::reversal(
            &tx.id,
            &deal.id,
            -reversed,
            new_balance,
            target.id.clone(),
            anomalies.clone(),
        );
        let participants = store.participants(&deal.id);
        let entries = distribute(&payment.id, &deal.id, &participants, -reversed, &deal.currency)?;
        let commission = self.commission_accrual(deal, -reversed);

        let payment_id = payment.id.clone();
        let commit = ReconCommit {
            match_id: deal_match.id.clone(),
            payment,
            entries,
            commission,
            deal: DealDelta {
                deal_id: deal.id.clone(),
                team_id: deal.team_id.clone(),
                // Reversing an applied payment cannot exceed the payback
                new_balance: Amount::new_unchecked(new_balance),
                status: if reopened {
                    DealStatus::Active
                } else {
                    deal.status
                },
                nsf_count: deal.nsf_count + 1,
                consecutive_underpaid: deal.consecutive_underpaid,
                approaching_payoff_flagged: deal.approaching_payoff_flagged,
                paid_off_at: if reopened { None } else { deal.paid_off_at },
            },
        };
        let result = ReconciliationResult {
            deal_id: deal.id.clone(),
            transaction_id: tx.id.clone(),
            payment_id,
            applied_principal: -reversed,
            new_balance,
            anomalies,
            deal_closed: false,
            approaching_payoff: false,
            reopened,
        };
        Ok((commit, result))
    }

    fn commission_accrual(&self, deal: &Deal, principal: Decimal) -> Option<CommissionAccrual> {
        let broker_id = deal.broker_id.as_ref()?;
        if deal.commission_percentage.is_zero() || principal.is_zero() {
            return None;
        }
        Some(CommissionAccrual {
            broker_id: broker_id.clone(),
            commission_percentage: deal.commission_percentage,
            delta: commission_for(principal, deal.commission_percentage, &deal.currency),
        })
    }

    /// Rebuild the outcome of an already-applied transaction
    fn replayed(payment: &Payment) -> ReconciliationResult {
        ReconciliationResult {
            deal_id: payment.deal_id.clone(),
            transaction_id: payment.transaction_id.clone(),
            payment_id: payment.id.clone(),
            applied_principal: payment.principal,
            new_balance: payment.resulting_balance,
            anomalies: payment.anomalies.clone(),
            deal_closed: payment.kind == PaymentKind::Applied
                && payment.resulting_balance.is_zero(),
            approaching_payoff: false,
            reopened: false,
        }
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ReconConfig::default())
    }
}
