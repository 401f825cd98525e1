//! Transaction - a raw bank/processor event
//!
//! Transactions arrive from at-least-once feeds and are never mutated.
//! The (source_type, external_id) pair is the idempotency key: redelivery
//! is detected at ingest and does not double-apply.

use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use fundbook_core::{Amount, Currency};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Internal transaction identifier
pub type TransactionId = String;

/// Where a transaction came from
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceType {
    BankSync,
    ProcessorWebhook,
    Manual,
}

/// Transaction semantics as reported by the source feed
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TransactionKind {
    #[default]
    Payment,
    /// A returned/bounced payment; reverses a previously applied payment
    NsfReturn,
}

/// A raw inbound transaction, stored verbatim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Idempotency key from the source system
    pub external_id: String,
    pub source_type: SourceType,
    pub team_id: String,
    pub account_id: String,
    pub amount: Amount,
    pub currency: Currency,
    pub posted_at: DateTime<Utc>,
    pub descriptor: String,
    pub kind: TransactionKind,
    /// For `nsf_return`: external id of the payment being returned
    pub related_external_id: Option<String>,
}

impl Transaction {
    /// Build from an inbound feed record, converting minor units.
    ///
    /// Rejects negative amounts and empty external ids before anything
    /// touches the store.
    pub fn from_feed(record: FeedRecord) -> Result<Self, LedgerError> {
        if record.external_id.trim().is_empty() {
            return Err(LedgerError::EmptyExternalId);
        }
        let value = record.currency.from_minor_units(record.amount_minor);
        let amount = Amount::new(value).map_err(|_| LedgerError::NegativeAmount(value))?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            external_id: record.external_id,
            source_type: record.source_type,
            team_id: record.team_id,
            account_id: record.account_id,
            amount,
            currency: record.currency,
            posted_at: record.posted_at,
            descriptor: record.descriptor,
            kind: record.kind,
            related_external_id: record.related_external_id,
        })
    }

    /// The de-duplication key for at-least-once delivery
    pub fn idempotency_key(&self) -> (SourceType, String) {
        (self.source_type, self.external_id.clone())
    }
}

/// Inbound wire shape: amounts in the currency's minor units (cents)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedRecord {
    pub external_id: String,
    pub source_type: SourceType,
    pub team_id: String,
    pub account_id: String,
    pub amount_minor: i64,
    #[serde(default)]
    pub currency: Currency,
    pub posted_at: DateTime<Utc>,
    pub descriptor: String,
    #[serde(default)]
    pub kind: TransactionKind,
    #[serde(default)]
    pub related_external_id: Option<String>,
}
