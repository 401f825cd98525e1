//! Commission - broker earnings accrued on collected principal
//!
//! One `pending` row per deal per payout batch, updated incrementally
//! per applied payment rather than one row per payment, to bound row
//! growth. A payout marks the open row `paid`; the next accrual opens
//! a new batch.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Commission row status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CommissionStatus {
    Pending,
    Paid,
    Cancelled,
}

/// Accrued broker commission for one deal and payout batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commission {
    pub id: String,
    pub broker_id: String,
    pub deal_id: String,
    pub commission_percentage: Decimal,
    /// Accrued amount; signed so reversals can net against the batch
    pub amount: Decimal,
    pub batch: u32,
    pub status: CommissionStatus,
    pub updated_at: DateTime<Utc>,
}

impl Commission {
    /// Open a new pending batch row
    pub fn open(
        broker_id: impl Into<String>,
        deal_id: impl Into<String>,
        commission_percentage: Decimal,
        batch: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            broker_id: broker_id.into(),
            deal_id: deal_id.into(),
            commission_percentage,
            amount: Decimal::ZERO,
            batch,
            status: CommissionStatus::Pending,
            updated_at: Utc::now(),
        }
    }

    /// Accrue a (possibly negative) commission delta into this batch
    pub fn accrue(&mut self, delta: Decimal) {
        self.amount += delta;
        self.updated_at = Utc::now();
    }

    /// Close out the batch on payout
    pub fn mark_paid(&mut self) {
        self.status = CommissionStatus::Paid;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_accrual_accumulates() {
        let mut row = Commission::open("broker-1", "deal-1", dec!(0.05), 1);
        row.accrue(dec!(25.00));
        row.accrue(dec!(25.00));
        assert_eq!(row.amount, dec!(50.00));
        assert_eq!(row.status, CommissionStatus::Pending);
    }

    #[test]
    fn test_reversal_nets_against_batch() {
        let mut row = Commission::open("broker-1", "deal-1", dec!(0.05), 1);
        row.accrue(dec!(25.00));
        row.accrue(dec!(-25.00));
        assert_eq!(row.amount, Decimal::ZERO);
    }

    #[test]
    fn test_mark_paid() {
        let mut row = Commission::open("broker-1", "deal-1", dec!(0.05), 1);
        row.accrue(dec!(10.00));
        row.mark_paid();
        assert_eq!(row.status, CommissionStatus::Paid);
    }
}
