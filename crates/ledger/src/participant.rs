//! Participant - a syndicator's position in a deal

use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use fundbook_core::Amount;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Participant position status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ParticipantStatus {
    Active,
    BoughtOut,
    Defaulted,
}

/// A fractional ownership stake in a deal's proceeds.
///
/// # Invariant
/// The sum of `ownership_percentage` over a deal's *active* participants
/// never exceeds 1.0; the store enforces this on insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub deal_id: String,
    pub syndicator_id: String,
    pub funding_share: Amount,
    /// Fraction of proceeds in [0, 1]
    pub ownership_percentage: Decimal,
    pub status: ParticipantStatus,
    pub created_at: DateTime<Utc>,
}

impl Participant {
    /// Create an active position; rejects percentages outside [0, 1]
    pub fn new(
        deal_id: impl Into<String>,
        syndicator_id: impl Into<String>,
        funding_share: Amount,
        ownership_percentage: Decimal,
    ) -> Result<Self, LedgerError> {
        if ownership_percentage < Decimal::ZERO || ownership_percentage > Decimal::ONE {
            return Err(LedgerError::InvalidOwnership(ownership_percentage));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            deal_id: deal_id.into(),
            syndicator_id: syndicator_id.into(),
            funding_share,
            ownership_percentage,
            status: ParticipantStatus::Active,
            created_at: Utc::now(),
        })
    }

    pub fn is_active(&self) -> bool {
        self.status == ParticipantStatus::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_valid_percentage() {
        let p = Participant::new("deal-1", "synd-1", Amount::ZERO, dec!(0.6)).unwrap();
        assert!(p.is_active());
        assert_eq!(p.ownership_percentage, dec!(0.6));
    }

    #[test]
    fn test_percentage_over_one_rejected() {
        let result = Participant::new("deal-1", "synd-1", Amount::ZERO, dec!(1.01));
        assert!(matches!(result, Err(LedgerError::InvalidOwnership(_))));
    }

    #[test]
    fn test_negative_percentage_rejected() {
        let result = Participant::new("deal-1", "synd-1", Amount::ZERO, dec!(-0.1));
        assert!(matches!(result, Err(LedgerError::InvalidOwnership(_))));
    }
}
