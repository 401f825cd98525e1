//! Payment feed - SQLite read model for dashboards
//!
//! One row per ingested transaction, kept current with its match state
//! from the journal. Queryable by match status, date range, accounts,
//! deals and minimum confidence. The table is disposable: `clear` +
//! replay rebuilds it from the journal at any time.

use crate::error::ProjectionError;
use chrono::{DateTime, Utc};
use fundbook_events::{EventEnvelope, LedgerEvent};
use fundbook_ledger::MatchStatus;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};

/// Dashboard filters; empty fields mean "no constraint"
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    pub team_id: Option<String>,
    pub match_status: Option<MatchStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
    pub account_ids: Vec<String>,
    pub deal_ids: Vec<String>,
    pub confidence_min: Option<f64>,
}

/// One feed line: a transaction and its current match state
#[derive(Debug, Clone, Serialize)]
pub struct FeedRow {
    pub transaction_id: String,
    pub team_id: String,
    pub account_id: String,
    pub deal_id: Option<String>,
    pub match_id: Option<String>,
    pub match_status: String,
    pub confidence: Option<f64>,
    pub amount: Decimal,
    pub currency: String,
    pub posted_at: DateTime<Utc>,
    pub descriptor: String,
}

/// SQLite-backed payment feed projection
pub struct PaymentFeed {
    pool: SqlitePool,
}

impl PaymentFeed {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Initialize the schema
    pub async fn init(&self) -> Result<(), ProjectionError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS feed (
                transaction_id TEXT PRIMARY KEY,
                team_id TEXT NOT NULL,
                account_id TEXT NOT NULL,
                deal_id TEXT,
                match_id TEXT,
                match_status TEXT NOT NULL DEFAULT 'unmatched',
                confidence REAL,
                amount TEXT NOT NULL,
                currency TEXT NOT NULL,
                posted_at TEXT NOT NULL,
                descriptor TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_feed_team_posted
            ON feed(team_id, posted_at)
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fold one journal envelope into the feed
    pub async fn apply(&self, envelope: &EventEnvelope) -> Result<(), ProjectionError> {
        match &envelope.event {
            LedgerEvent::TransactionIngested { transaction } => {
                sqlx::query(
                    r#"
                    INSERT OR REPLACE INTO feed
                        (transaction_id, team_id, account_id, match_status,
                         amount, currency, posted_at, descriptor)
                    VALUES (?, ?, ?, 'unmatched', ?, ?, ?, ?)
                    "#,
                )
                .bind(&transaction.id)
                .bind(&transaction.team_id)
                .bind(&transaction.account_id)
                .bind(transaction.amount.value().to_string())
                .bind(transaction.currency.code())
                .bind(transaction.posted_at)
                .bind(&transaction.descriptor)
                .execute(&self.pool)
                .await?;
            }
            LedgerEvent::MatchRecorded { deal_match } => {
                sqlx::query(
                    r#"
                    UPDATE feed
                    SET deal_id = ?, match_id = ?, match_status = ?, confidence = ?
                    WHERE transaction_id = ?
                    "#,
                )
                .bind(&deal_match.deal_id)
                .bind(&deal_match.id)
                .bind(deal_match.status.to_string())
                .bind(deal_match.confidence)
                .bind(&deal_match.transaction_id)
                .execute(&self.pool)
                .await?;
            }
            LedgerEvent::MatchConfirmed { match_id } => {
                sqlx::query("UPDATE feed SET match_status = 'confirmed' WHERE match_id = ?")
                    .bind(match_id)
                    .execute(&self.pool)
                    .await?;
            }
            LedgerEvent::MatchRejected { match_id } => {
                sqlx::query(
                    r#"
                    UPDATE feed
                    SET match_status = 'unmatched', deal_id = NULL,
                        match_id = NULL, confidence = NULL
                    WHERE match_id = ?
                    "#,
                )
                .bind(match_id)
                .execute(&self.pool)
                .await?;
            }
            LedgerEvent::ReconciliationCommitted { commit } => {
                sqlx::query("UPDATE feed SET match_status = 'confirmed' WHERE transaction_id = ?")
                    .bind(&commit.payment.transaction_id)
                    .execute(&self.pool)
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Query the feed with the dashboard's filters, newest first
    pub async fn query(&self, filter: &FeedFilter) -> Result<Vec<FeedRow>, ProjectionError> {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT transaction_id, team_id, account_id, deal_id, match_id, \
             match_status, confidence, amount, currency, posted_at, descriptor \
             FROM feed WHERE 1=1",
        );

        if let Some(team_id) = &filter.team_id {
            qb.push(" AND team_id = ").push_bind(team_id);
        }
        if let Some(status) = &filter.match_status {
            qb.push(" AND match_status = ").push_bind(status.to_string());
        }
        if let Some(from) = &filter.date_from {
            qb.push(" AND posted_at >= ").push_bind(*from);
        }
        if let Some(to) = &filter.date_to {
            qb.push(" AND posted_at <= ").push_bind(*to);
        }
        if !filter.account_ids.is_empty() {
            qb.push(" AND account_id IN (");
            {
                let mut separated = qb.separated(", ");
                for id in &filter.account_ids {
                    separated.push_bind(id);
                }
            }
            qb.push(")");
        }
        if !filter.deal_ids.is_empty() {
            qb.push(" AND deal_id IN (");
            {
                let mut separated = qb.separated(", ");
                for id in &filter.deal_ids {
                    separated.push_bind(id);
                }
            }
            qb.push(")");
        }
        if let Some(min) = filter.confidence_min {
            qb.push(" AND confidence >= ").push_bind(min);
        }
        qb.push(" ORDER BY posted_at DESC");

        let rows = qb.build().fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .map(|row| {
                let amount: String = row.get("amount");
                FeedRow {
                    transaction_id: row.get("transaction_id"),
                    team_id: row.get("team_id"),
                    account_id: row.get("account_id"),
                    deal_id: row.get("deal_id"),
                    match_id: row.get("match_id"),
                    match_status: row.get("match_status"),
                    confidence: row.get("confidence"),
                    amount: amount.parse().unwrap_or(Decimal::ZERO),
                    currency: row.get("currency"),
                    posted_at: row.get("posted_at"),
                    descriptor: row.get("descriptor"),
                }
            })
            .collect())
    }

    /// Drop all rows (for replay)
    pub async fn clear(&self) -> Result<(), ProjectionError> {
        sqlx::query("DELETE FROM feed").execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundbook_core::Currency;
    use fundbook_ledger::{DealMatch, FeedRecord, SourceType, Transaction, TransactionKind};

    fn envelope(sequence: u64, event: LedgerEvent) -> EventEnvelope {
        EventEnvelope {
            sequence,
            recorded_at: Utc::now(),
            event,
        }
    }

    fn transaction(external_id: &str, account_id: &str, minor: i64) -> Transaction {
        Transaction::from_feed(FeedRecord {
            external_id: external_id.to_string(),
            source_type: SourceType::BankSync,
            team_id: "team-1".to_string(),
            account_id: account_id.to_string(),
            amount_minor: minor,
            currency: Currency::Usd,
            posted_at: Utc::now(),
            descriptor: "ACH DEBIT".to_string(),
            kind: TransactionKind::Payment,
            related_external_id: None,
        })
        .unwrap()
    }

    async fn feed() -> PaymentFeed {
        // One connection: each new :memory: connection is a fresh db
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let feed = PaymentFeed::new(pool);
        feed.init().await.unwrap();
        feed
    }

    #[tokio::test]
    async fn test_ingest_then_match_then_confirm() {
        let feed = feed().await;
        let tx = transaction("tx-1", "acct-9", 50000);
        feed.apply(&envelope(
            1,
            LedgerEvent::TransactionIngested {
                transaction: tx.clone(),
            },
        ))
        .await
        .unwrap();

        let rows = feed.query(&FeedFilter::default()).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].match_status, "unmatched");
        assert_eq!(rows[0].amount, Decimal::new(50000, 2));

        let m = DealMatch::new(&tx.id, "deal-1", "team-1", 0.95, MatchStatus::Auto);
        feed.apply(&envelope(
            2,
            LedgerEvent::MatchRecorded {
                deal_match: m.clone(),
            },
        ))
        .await
        .unwrap();
        feed.apply(&envelope(
            3,
            LedgerEvent::MatchConfirmed {
                match_id: m.id.clone(),
            },
        ))
        .await
        .unwrap();

        let rows = feed.query(&FeedFilter::default()).await.unwrap();
        assert_eq!(rows[0].match_status, "confirmed");
        assert_eq!(rows[0].deal_id.as_deref(), Some("deal-1"));
        assert_eq!(rows[0].confidence, Some(0.95));
    }

    #[tokio::test]
    async fn test_rejection_clears_match_columns() {
        let feed = feed().await;
        let tx = transaction("tx-1", "acct-9", 50000);
        feed.apply(&envelope(
            1,
            LedgerEvent::TransactionIngested {
                transaction: tx.clone(),
            },
        ))
        .await
        .unwrap();
        let m = DealMatch::new(&tx.id, "deal-1", "team-1", 0.7, MatchStatus::Suggested);
        feed.apply(&envelope(
            2,
            LedgerEvent::MatchRecorded {
                deal_match: m.clone(),
            },
        ))
        .await
        .unwrap();
        feed.apply(&envelope(
            3,
            LedgerEvent::MatchRejected {
                match_id: m.id.clone(),
            },
        ))
        .await
        .unwrap();

        let rows = feed.query(&FeedFilter::default()).await.unwrap();
        assert_eq!(rows[0].match_status, "unmatched");
        assert!(rows[0].deal_id.is_none());
        assert!(rows[0].confidence.is_none());
    }

    #[tokio::test]
    async fn test_filters() {
        let feed = feed().await;
        for (i, account) in ["acct-1", "acct-2", "acct-2"].iter().enumerate() {
            let tx = transaction(&format!("tx-{}", i), account, 50000);
            feed.apply(&envelope(
                i as u64 + 1,
                LedgerEvent::TransactionIngested {
                    transaction: tx.clone(),
                },
            ))
            .await
            .unwrap();
            if i == 2 {
                let m = DealMatch::new(&tx.id, "deal-1", "team-1", 0.8, MatchStatus::Suggested);
                feed.apply(&envelope(
                    10,
                    LedgerEvent::MatchRecorded { deal_match: m },
                ))
                .await
                .unwrap();
            }
        }

        let by_account = feed
            .query(&FeedFilter {
                account_ids: vec!["acct-2".to_string()],
                ..FeedFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_account.len(), 2);

        let suggested = feed
            .query(&FeedFilter {
                match_status: Some(MatchStatus::Suggested),
                ..FeedFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(suggested.len(), 1);

        let confident = feed
            .query(&FeedFilter {
                confidence_min: Some(0.9),
                ..FeedFilter::default()
            })
            .await
            .unwrap();
        assert!(confident.is_empty());

        let by_deal = feed
            .query(&FeedFilter {
                deal_ids: vec!["deal-1".to_string()],
                ..FeedFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(by_deal.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_empties_feed() {
        let feed = feed().await;
        let tx = transaction("tx-1", "acct-9", 50000);
        feed.apply(&envelope(
            1,
            LedgerEvent::TransactionIngested { transaction: tx },
        ))
        .await
        .unwrap();
        feed.clear().await.unwrap();
        assert!(feed.query(&FeedFilter::default()).await.unwrap().is_empty());
    }
}
