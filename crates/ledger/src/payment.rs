//! Payment - the immutable audit row for applied principal
//!
//! Rows are never mutated after insert. A bounced payment is superseded
//! by a compensating `Reversal` row with negative principal; history is
//! preserved in full.

use crate::anomaly::Anomaly;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Unique payment identifier
pub type PaymentId = String;

/// Whether the row credits or reverses principal
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentKind {
    Applied,
    Reversal,
}

/// One applied (or reversed) payment against a deal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub transaction_id: String,
    pub deal_id: String,
    pub kind: PaymentKind,
    /// Signed principal: positive for `Applied`, negative for `Reversal`
    pub principal: Decimal,
    pub applied_at: DateTime<Utc>,
    /// Deal balance immediately after this row
    pub resulting_balance: Decimal,
    /// For reversals: the payment row being compensated
    pub reverses: Option<PaymentId>,
    pub anomalies: Vec<Anomaly>,
}

impl Payment {
    /// Record applied principal
    pub fn applied(
        transaction_id: impl Into<String>,
        deal_id: impl Into<String>,
        principal: Decimal,
        resulting_balance: Decimal,
        anomalies: Vec<Anomaly>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.into(),
            deal_id: deal_id.into(),
            kind: PaymentKind::Applied,
            principal,
            applied_at: Utc::now(),
            resulting_balance,
            reverses: None,
            anomalies,
        }
    }

    /// Record a compensating reversal for a bounced payment
    pub fn reversal(
        transaction_id: impl Into<String>,
        deal_id: impl Into<String>,
        principal: Decimal,
        resulting_balance: Decimal,
        reverses: PaymentId,
        anomalies: Vec<Anomaly>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.into(),
            deal_id: deal_id.into(),
            kind: PaymentKind::Reversal,
            principal,
            applied_at: Utc::now(),
            resulting_balance,
            reverses: Some(reverses),
            anomalies,
        }
    }
}
