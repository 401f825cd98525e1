//! Candidate proposal over a ledger snapshot

use crate::config::MatchConfig;
use crate::features::{self, MatchFeatures};
use chrono::NaiveDate;
use fundbook_core::calendar;
use fundbook_ledger::{Deal, LedgerStore, PaymentKind, Transaction, TransactionKind};
use std::cmp::Ordering;
use tracing::debug;

/// What to do with a candidate, decided by its confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Confidence at or above the auto threshold: apply without review
    Auto,
    /// Confidence in the suggestion band: queue for human confirmation
    Suggested,
}

/// A scored candidate deal for a transaction
#[derive(Debug, Clone)]
pub struct MatchCandidate {
    pub deal_id: String,
    pub confidence: f64,
    pub disposition: Disposition,
    pub features: MatchFeatures,
}

/// Proposes deal matches for inbound transactions.
///
/// Read-only and lock-free: proposals run against a possibly stale
/// snapshot, and the reconciler re-validates under lock before any
/// money moves.
pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Propose zero or more candidates, best first.
    ///
    /// Candidates are collectible deals linked to the transaction's
    /// source account. An empty vec is the normal result for stray
    /// transactions, not an error. Ties on confidence break toward the
    /// oldest deal, which has waited longest.
    pub fn propose(&self, tx: &Transaction, store: &LedgerStore) -> Vec<MatchCandidate> {
        // Already claimed by a live match: nothing to propose
        if store.live_match_for_transaction(&tx.id).is_some() {
            return Vec::new();
        }

        if tx.kind == TransactionKind::NsfReturn {
            return self.propose_reversal(tx, store);
        }

        let posted = tx.posted_at.date_naive();
        let mut scored: Vec<(MatchCandidate, chrono::DateTime<chrono::Utc>)> = store
            .collectible_deals_for_account(&tx.account_id)
            .into_iter()
            .filter(|deal| deal.team_id == tx.team_id)
            .filter_map(|deal| {
                let feats = self.features_for(tx, &deal, store, posted);
                let confidence = feats.score(&self.config);
                let disposition = if confidence >= self.config.auto_threshold {
                    Disposition::Auto
                } else if confidence >= self.config.suggest_threshold {
                    Disposition::Suggested
                } else {
                    return None;
                };
                debug!(deal_id = %deal.id, confidence, "scored candidate");
                Some((
                    MatchCandidate {
                        deal_id: deal.id.clone(),
                        confidence,
                        disposition,
                        features: feats,
                    },
                    deal.created_at,
                ))
            })
            .collect();

        scored.sort_by(|(a, a_created), (b, b_created)| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a_created.cmp(b_created))
        });

        scored.into_iter().map(|(candidate, _)| candidate).collect()
    }

    /// An NSF return deterministically targets the deal of the payment
    /// it reverses; no scoring involved.
    fn propose_reversal(&self, tx: &Transaction, store: &LedgerStore) -> Vec<MatchCandidate> {
        let Some(external_id) = tx.related_external_id.as_deref() else {
            return Vec::new();
        };
        let Some(original_tx) = store.find_transaction_by_external(external_id) else {
            return Vec::new();
        };
        let Some(payment) = store.payment_for_transaction(&original_tx.id) else {
            return Vec::new();
        };
        if payment.kind != PaymentKind::Applied || store.deal(&payment.deal_id).is_none() {
            return Vec::new();
        }

        vec![MatchCandidate {
            deal_id: payment.deal_id,
            confidence: 1.0,
            disposition: Disposition::Auto,
            features: MatchFeatures {
                amount_closeness: 1.0,
                date_proximity: 1.0,
                descriptor_similarity: 1.0,
            },
        }]
    }

    fn features_for(
        &self,
        tx: &Transaction,
        deal: &Deal,
        store: &LedgerStore,
        posted: NaiveDate,
    ) -> MatchFeatures {
        let expected = self.expected_next_payment(deal, store);
        let days_off = calendar::business_days_between(posted, expected);

        // Best similarity against the merchant name or any nickname of
        // the source account
        let mut names: Vec<&str> = vec![deal.merchant_name.as_str()];
        names.extend(
            deal.accounts
                .iter()
                .filter(|a| a.account_id == tx.account_id)
                .filter_map(|a| a.nickname.as_deref()),
        );
        let similarity = names
            .into_iter()
            .map(|name| features::descriptor_similarity(&tx.descriptor, &[name]))
            .fold(0.0_f64, f64::max);

        MatchFeatures {
            amount_closeness: features::amount_closeness(
                tx.amount.value(),
                deal.daily_payment.value(),
            ),
            date_proximity: features::date_proximity(days_off, self.config.grace_business_days),
            descriptor_similarity: similarity,
        }
    }

    /// The first business day strictly after the deal's last applied
    /// payment, falling back to its creation date.
    fn expected_next_payment(&self, deal: &Deal, store: &LedgerStore) -> NaiveDate {
        let last_applied = store
            .payments_for_deal(&deal.id)
            .into_iter()
            .filter(|p| p.kind == PaymentKind::Applied)
            .map(|p| p.applied_at)
            .max();
        let base = last_applied.unwrap_or(deal.created_at).date_naive();
        calendar::next_business_day(base)
    }
}

impl Default for Matcher {
    fn default() -> Self {
        Self::new(MatchConfig::default())
    }
}
