//! Projection engine - coordinates replay and updates

use crate::error::ProjectionError;
use crate::feed::PaymentFeed;
use fundbook_events::EventEnvelope;
use sqlx::SqlitePool;
use std::path::Path;

/// Owns the SQLite read models and keeps them fed from the journal
pub struct ProjectionEngine {
    pub feed: PaymentFeed,
}

impl ProjectionEngine {
    /// Open (or create) the projection database
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, ProjectionError> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());
        let pool = SqlitePool::connect(&db_url).await?;

        let feed = PaymentFeed::new(pool);
        feed.init().await?;

        Ok(Self { feed })
    }

    /// Apply a single envelope
    pub async fn apply(&self, envelope: &EventEnvelope) -> Result<(), ProjectionError> {
        self.feed.apply(envelope).await
    }

    /// Rebuild everything from a journal snapshot
    pub async fn replay(&self, envelopes: &[EventEnvelope]) -> Result<usize, ProjectionError> {
        self.feed.clear().await?;
        for envelope in envelopes {
            self.feed.apply(envelope).await?;
        }
        Ok(envelopes.len())
    }

    pub fn feed(&self) -> &PaymentFeed {
        &self.feed
    }
}
