//! Application context - wires everything together
//!
//! Startup replays the journal into the in-memory store, the stats
//! counters and the SQLite projections, so every component sees the
//! same history. Every mutation is journaled; the journal is what
//! survives restarts.

use fundbook_events::{replay_into, EventEnvelope, EventError, EventJournal, EventReader, LedgerEvent};
use fundbook_ledger::{
    Commission, Deal, DealMatch, FeedRecord, Ingest, LedgerError, LedgerStore, MatchStatus,
    Participant, Transaction,
};
use fundbook_matcher::{Disposition, MatchConfig, Matcher};
use fundbook_projection::{
    next_payment, FeedFilter, FeedRow, NextPayment, ProjectionEngine, StatsConfig, StatsCounters,
    TeamStats,
};
use fundbook_recon::{ApplyOutcome, ReconConfig, ReconError, ReconciliationResult, Reconciler};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

/// Errors surfaced by context operations
#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("Reconciliation error: {0}")]
    Recon(#[from] ReconError),

    #[error("Event journal error: {0}")]
    Event(#[from] EventError),

    #[error("Projection error: {0}")]
    Projection(#[from] fundbook_projection::ProjectionError),
}

/// What happened to one inbound feed record
#[derive(Debug)]
pub enum IngestOutcome {
    /// Redelivery; nothing changed
    Duplicate { transaction_id: String },
    /// No candidate deal scored above the suggestion threshold
    Unmatched { transaction_id: String },
    /// Queued for human confirmation
    Suggested {
        transaction_id: String,
        match_id: String,
        deal_id: String,
        confidence: f64,
    },
    /// Auto-matched and applied in one pass
    AutoApplied { result: ReconciliationResult },
}

/// Application context - wires together all components
pub struct AppContext {
    pub store: Arc<LedgerStore>,
    pub matcher: Matcher,
    pub reconciler: Reconciler,
    pub stats_config: StatsConfig,
    pub projection: Option<ProjectionEngine>,
    stats: StatsCounters,
    journal: EventJournal,
    journal_path: PathBuf,
    projection_path: PathBuf,
}

impl AppContext {
    /// Create a new application context, replaying the journal
    pub async fn new(data_path: impl AsRef<Path>) -> Result<Self, anyhow::Error> {
        Self::with_configs(
            data_path,
            MatchConfig::default(),
            ReconConfig::default(),
            StatsConfig::default(),
        )
        .await
    }

    /// Create a context with explicit engine configurations
    pub async fn with_configs(
        data_path: impl AsRef<Path>,
        match_config: MatchConfig,
        recon_config: ReconConfig,
        stats_config: StatsConfig,
    ) -> Result<Self, anyhow::Error> {
        let data_path = data_path.as_ref();
        let journal_path = data_path.join("journal");
        let projection_path = data_path.join("projection.db");
        std::fs::create_dir_all(&journal_path)?;

        let journal = EventJournal::open(&journal_path)?;
        let store = Arc::new(LedgerStore::new());

        // Rebuild state from the journal
        let envelopes = EventReader::from_directory(&journal_path)?.read_all()?;
        replay_into(&store, &envelopes)?;

        let mut stats = StatsCounters::new();
        for envelope in &envelopes {
            stats.apply(envelope);
        }

        let projection = ProjectionEngine::new(&projection_path).await.ok();
        if let Some(ref projection) = projection {
            projection.replay(&envelopes).await.ok();
        }

        Ok(Self {
            store,
            matcher: Matcher::new(match_config),
            reconciler: Reconciler::new(recon_config),
            stats_config,
            projection,
            stats,
            journal,
            journal_path,
            projection_path,
        })
    }

    /// Journal an event and fold it into the live projections
    async fn record(&mut self, event: LedgerEvent) -> Result<EventEnvelope, ContextError> {
        let envelope = self.journal.append(event)?;
        self.stats.apply(&envelope);
        if let Some(ref projection) = self.projection {
            if let Err(e) = projection.apply(&envelope).await {
                warn!(error = %e, "projection update failed; will catch up on replay");
            }
        }
        Ok(envelope)
    }

    // === Provisioning (deal origination collaborators) ===

    pub async fn create_deal(&mut self, deal: Deal) -> Result<(), ContextError> {
        self.store.insert_deal(deal.clone())?;
        self.record(LedgerEvent::DealCreated { deal }).await?;
        Ok(())
    }

    pub async fn add_participant(&mut self, participant: Participant) -> Result<(), ContextError> {
        self.store.add_participant(participant.clone())?;
        self.record(LedgerEvent::ParticipantAdded { participant })
            .await?;
        Ok(())
    }

    // === Ingest consumer loop ===

    /// Process one inbound feed record: idempotent ingest, propose,
    /// then auto-apply or queue for review.
    pub async fn ingest(&mut self, record: FeedRecord) -> Result<IngestOutcome, ContextError> {
        let tx = Transaction::from_feed(record)?;
        match self.store.ingest_transaction(tx.clone())? {
            Ingest::Duplicate(transaction_id) => {
                return Ok(IngestOutcome::Duplicate { transaction_id });
            }
            Ingest::New(_) => {}
        }
        self.record(LedgerEvent::TransactionIngested {
            transaction: tx.clone(),
        })
        .await?;

        let candidates = self.matcher.propose(&tx, &self.store);
        let Some(best) = candidates.first() else {
            return Ok(IngestOutcome::Unmatched {
                transaction_id: tx.id,
            });
        };

        match best.disposition {
            Disposition::Auto => {
                let deal_match = DealMatch::new(
                    &tx.id,
                    &best.deal_id,
                    &tx.team_id,
                    best.confidence,
                    MatchStatus::Auto,
                );
                self.store.record_match(deal_match.clone())?;
                self.record(LedgerEvent::MatchRecorded {
                    deal_match: deal_match.clone(),
                })
                .await?;

                let outcome = self.reconciler.apply(&self.store, &deal_match.id)?;
                self.journal_reconciliation(&outcome).await?;
                Ok(IngestOutcome::AutoApplied {
                    result: outcome.result,
                })
            }
            Disposition::Suggested => {
                let deal_match = DealMatch::new(
                    &tx.id,
                    &best.deal_id,
                    &tx.team_id,
                    best.confidence,
                    MatchStatus::Suggested,
                );
                self.store.record_match(deal_match.clone())?;
                self.record(LedgerEvent::MatchRecorded {
                    deal_match: deal_match.clone(),
                })
                .await?;
                self.record(LedgerEvent::MatchSuggested {
                    match_id: deal_match.id.clone(),
                    transaction_id: tx.id.clone(),
                    deal_id: deal_match.deal_id.clone(),
                    confidence: deal_match.confidence,
                })
                .await?;
                Ok(IngestOutcome::Suggested {
                    transaction_id: tx.id,
                    match_id: deal_match.id,
                    deal_id: deal_match.deal_id,
                    confidence: deal_match.confidence,
                })
            }
        }
    }

    // === Match decisions ===

    /// Confirm a suggested match and apply it.
    ///
    /// Retryable: if a prior confirm already landed but the apply was
    /// interrupted, calling again just finishes the apply.
    pub async fn confirm_match(
        &mut self,
        match_id: &str,
    ) -> Result<ReconciliationResult, ContextError> {
        match self.store.decide_match(match_id, MatchStatus::Confirmed) {
            Ok(_) => {
                self.record(LedgerEvent::MatchConfirmed {
                    match_id: match_id.to_string(),
                })
                .await?;
            }
            Err(LedgerError::InvalidMatchTransition {
                status: MatchStatus::Confirmed,
                ..
            }) => {}
            Err(e) => return Err(e.into()),
        }

        let outcome = self.reconciler.apply(&self.store, match_id)?;
        self.journal_reconciliation(&outcome).await?;
        Ok(outcome.result)
    }

    /// Reject a suggested match; the transaction returns to the pool
    pub async fn reject_match(&mut self, match_id: &str) -> Result<(), ContextError> {
        self.store.decide_match(match_id, MatchStatus::Rejected)?;
        self.record(LedgerEvent::MatchRejected {
            match_id: match_id.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Journal a committed reconciliation and its outbound signals
    async fn journal_reconciliation(&mut self, outcome: &ApplyOutcome) -> Result<(), ContextError> {
        // Idempotent replays have nothing new to journal
        let Some(commit) = &outcome.commit else {
            return Ok(());
        };
        let result = &outcome.result;

        self.record(LedgerEvent::ReconciliationCommitted {
            commit: commit.clone(),
        })
        .await?;
        self.record(LedgerEvent::PaymentApplied {
            deal_id: result.deal_id.clone(),
            transaction_id: result.transaction_id.clone(),
            payment_id: result.payment_id.clone(),
            principal: result.applied_principal,
            new_balance: result.new_balance,
        })
        .await?;

        if let (true, Some(paid_off_at)) = (result.deal_closed, commit.deal.paid_off_at) {
            self.record(LedgerEvent::DealPaidOff {
                deal_id: result.deal_id.clone(),
                paid_off_at,
            })
            .await?;
        }
        if result.approaching_payoff {
            let fraction = self
                .store
                .deal(&result.deal_id)
                .map(|d| d.payoff_fraction())
                .unwrap_or(Decimal::ZERO);
            self.record(LedgerEvent::ApproachingPayoff {
                deal_id: result.deal_id.clone(),
                fraction_paid: fraction,
            })
            .await?;
        }
        if result
            .anomalies
            .iter()
            .any(|a| matches!(a, fundbook_ledger::Anomaly::NsfReturn { .. }))
        {
            self.record(LedgerEvent::DealNsf {
                deal_id: result.deal_id.clone(),
                transaction_id: result.transaction_id.clone(),
                nsf_count: commit.deal.nsf_count,
            })
            .await?;
        }
        if result.reopened {
            self.record(LedgerEvent::DealReopened {
                deal_id: result.deal_id.clone(),
                transaction_id: result.transaction_id.clone(),
            })
            .await?;
        }
        Ok(())
    }

    // === Payouts ===

    /// Close out a deal's pending commission batch for ACH export
    pub async fn pay_commissions(
        &mut self,
        deal_id: &str,
    ) -> Result<Vec<Commission>, ContextError> {
        let rows = self.store.mark_commissions_paid(deal_id)?;
        for row in &rows {
            self.record(LedgerEvent::CommissionsPaid {
                deal_id: deal_id.to_string(),
                batch: row.batch,
                amount: row.amount,
            })
            .await?;
        }
        Ok(rows)
    }

    // === Query surface ===

    /// Incremental stats (versioned counters)
    pub fn stats(&self, team_id: &str) -> TeamStats {
        self.stats.stats_for(team_id, &self.stats_config)
    }

    /// Read-time stats straight off the store; always equals `stats`
    pub fn stats_computed(&self, team_id: &str) -> TeamStats {
        TeamStats::compute(&self.store, team_id, &self.stats_config)
    }

    pub fn stats_version(&self) -> u64 {
        self.stats.version()
    }

    pub fn next_payment(&self, deal_id: &str, from: NaiveDate) -> Option<NextPayment> {
        next_payment(&self.store, deal_id, from)
    }

    pub fn deal_balance(&self, deal_id: &str) -> Option<Decimal> {
        self.store.deal(deal_id).map(|d| d.current_balance.value())
    }

    pub async fn feed(&self, filter: &FeedFilter) -> Result<Vec<FeedRow>, ContextError> {
        match &self.projection {
            Some(projection) => Ok(projection.feed().query(filter).await?),
            None => Ok(Vec::new()),
        }
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal_path
    }

    pub fn projection_path(&self) -> &Path {
        &self.projection_path
    }
}
