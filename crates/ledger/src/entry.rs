//! Ledger entries - per-payment proceeds and commission splits
//!
//! Produced by the distribution engine, committed by the reconciler in
//! the same atomic unit as the payment they derive from. Entries are
//! pending until picked up by the payout export.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who an entry pays
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "party", rename_all = "snake_case")]
pub enum EntryParty {
    Syndicator { syndicator_id: String },
    Broker { broker_id: String },
}

/// A single pending money movement derived from an applied payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: String,
    pub payment_id: String,
    pub deal_id: String,
    pub party: EntryParty,
    /// Signed: negative entries compensate reversed payments
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        payment_id: impl Into<String>,
        deal_id: impl Into<String>,
        party: EntryParty,
        amount: Decimal,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            payment_id: payment_id.into(),
            deal_id: deal_id.into(),
            party,
            amount,
            created_at: Utc::now(),
        }
    }
}
