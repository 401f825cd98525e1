//! Match - pairing of a transaction with a deal
//!
//! State machine: `suggested -> {confirmed | rejected}` for the human
//! path, `auto -> confirmed` for the automatic path. `confirmed` is
//! terminal and triggers reconciliation; `rejected` returns the
//! transaction to the unmatched pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Unique match identifier
pub type MatchId = String;

/// Match lifecycle status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchStatus {
    /// No live candidate for the transaction
    Unmatched,
    /// Proposed, awaiting human confirmation
    Suggested,
    /// Proposed above the auto threshold, applied without a human step
    Auto,
    /// Accepted; the payment has been (or is being) applied
    Confirmed,
    /// Declined; the transaction is unmatched again
    Rejected,
}

impl MatchStatus {
    /// Whether a human/system decision may move this status to `to`
    pub fn can_transition(self, to: MatchStatus) -> bool {
        matches!(
            (self, to),
            (MatchStatus::Suggested, MatchStatus::Confirmed)
                | (MatchStatus::Suggested, MatchStatus::Rejected)
                | (MatchStatus::Auto, MatchStatus::Confirmed)
        )
    }

    /// Whether the reconciler may apply a match in this status
    pub fn is_applicable(&self) -> bool {
        matches!(self, MatchStatus::Auto | MatchStatus::Confirmed)
    }

    /// A live match claims its transaction; a rejected one does not
    pub fn is_live(&self) -> bool {
        !matches!(self, MatchStatus::Rejected | MatchStatus::Unmatched)
    }
}

/// A transaction-to-deal pairing with its confidence score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DealMatch {
    pub id: MatchId,
    pub transaction_id: String,
    pub deal_id: String,
    pub team_id: String,
    /// Matcher confidence in [0, 1]
    pub confidence: f64,
    pub status: MatchStatus,
    /// True when the match was proposed at or above the auto threshold
    pub auto: bool,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl DealMatch {
    /// Record a matcher proposal
    pub fn new(
        transaction_id: impl Into<String>,
        deal_id: impl Into<String>,
        team_id: impl Into<String>,
        confidence: f64,
        status: MatchStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.into(),
            deal_id: deal_id.into(),
            team_id: team_id.into(),
            confidence,
            status,
            auto: status == MatchStatus::Auto,
            created_at: Utc::now(),
            decided_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_transitions() {
        assert!(MatchStatus::Suggested.can_transition(MatchStatus::Confirmed));
        assert!(MatchStatus::Suggested.can_transition(MatchStatus::Rejected));
        assert!(!MatchStatus::Suggested.can_transition(MatchStatus::Auto));
    }

    #[test]
    fn test_auto_only_confirms() {
        assert!(MatchStatus::Auto.can_transition(MatchStatus::Confirmed));
        assert!(!MatchStatus::Auto.can_transition(MatchStatus::Rejected));
    }

    #[test]
    fn test_terminal_states_do_not_transition() {
        assert!(!MatchStatus::Confirmed.can_transition(MatchStatus::Rejected));
        assert!(!MatchStatus::Rejected.can_transition(MatchStatus::Confirmed));
    }

    #[test]
    fn test_applicable() {
        assert!(MatchStatus::Auto.is_applicable());
        assert!(MatchStatus::Confirmed.is_applicable());
        assert!(!MatchStatus::Suggested.is_applicable());
        assert!(!MatchStatus::Rejected.is_applicable());
    }

    #[test]
    fn test_auto_flag_set_from_status() {
        let auto = DealMatch::new("tx-1", "deal-1", "team-1", 0.95, MatchStatus::Auto);
        assert!(auto.auto);
        let suggested = DealMatch::new("tx-1", "deal-1", "team-1", 0.70, MatchStatus::Suggested);
        assert!(!suggested.auto);
    }
}
