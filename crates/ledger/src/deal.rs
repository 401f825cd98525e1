//! Deal - a merchant-cash-advance contract

use chrono::{DateTime, Utc};
use fundbook_core::{Amount, Currency};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// Unique deal identifier
pub type DealId = String;

/// Deal lifecycle status
///
/// `PaidOff`, `Defaulted` and `BoughtOut` are terminal for forward
/// payments; an NSF reversal may reopen `PaidOff` (see the reconciler).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DealStatus {
    Pending,
    Active,
    Late,
    PaidOff,
    Defaulted,
    BoughtOut,
}

impl DealStatus {
    /// Terminal states are one-way
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DealStatus::PaidOff | DealStatus::Defaulted | DealStatus::BoughtOut
        )
    }

    /// True if the deal is expected to receive daily payments
    pub fn is_collectible(&self) -> bool {
        matches!(self, DealStatus::Active | DealStatus::Late)
    }
}

/// A bank account linked to a deal's merchant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedAccount {
    pub account_id: String,
    /// Account nickname set by the merchant, used for descriptor matching
    pub nickname: Option<String>,
}

/// A revenue-financing deal with a fixed payback collected daily.
///
/// # Invariant
/// `current_balance == payback_amount - sum(applied principal of
/// non-reversed payments)` and is never negative. Only the reconciler
/// mutates a deal after origination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    pub id: DealId,
    pub team_id: String,
    pub merchant_id: String,
    pub merchant_name: String,
    pub broker_id: Option<String>,
    /// Broker commission rate on collected principal, zero when no broker
    pub commission_percentage: Decimal,
    pub accounts: Vec<LinkedAccount>,
    pub status: DealStatus,
    pub currency: Currency,
    pub funding_amount: Amount,
    pub payback_amount: Amount,
    pub daily_payment: Amount,
    pub current_balance: Amount,
    pub nsf_count: u32,
    /// Consecutive underpaid payments, reset by an on-target payment
    pub consecutive_underpaid: u32,
    /// Latched once the approaching-payoff signal has been emitted
    pub approaching_payoff_flagged: bool,
    pub created_at: DateTime<Utc>,
    pub paid_off_at: Option<DateTime<Utc>>,
}

impl Deal {
    /// Create a newly originated deal, collecting from day one.
    ///
    /// The opening balance equals the payback amount.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        team_id: impl Into<String>,
        merchant_id: impl Into<String>,
        merchant_name: impl Into<String>,
        currency: Currency,
        funding_amount: Amount,
        payback_amount: Amount,
        daily_payment: Amount,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            team_id: team_id.into(),
            merchant_id: merchant_id.into(),
            merchant_name: merchant_name.into(),
            broker_id: None,
            commission_percentage: Decimal::ZERO,
            accounts: Vec::new(),
            status: DealStatus::Active,
            currency,
            funding_amount,
            payback_amount,
            daily_payment,
            current_balance: payback_amount,
            nsf_count: 0,
            consecutive_underpaid: 0,
            approaching_payoff_flagged: false,
            created_at: Utc::now(),
            paid_off_at: None,
        }
    }

    /// Attach a broker and their commission rate
    pub fn with_broker(mut self, broker_id: impl Into<String>, percentage: Decimal) -> Self {
        self.broker_id = Some(broker_id.into());
        self.commission_percentage = percentage;
        self
    }

    /// Link a merchant bank account
    pub fn with_account(
        mut self,
        account_id: impl Into<String>,
        nickname: Option<String>,
    ) -> Self {
        self.accounts.push(LinkedAccount {
            account_id: account_id.into(),
            nickname,
        });
        self
    }

    /// True if the deal collects from the given account
    pub fn is_linked_to(&self, account_id: &str) -> bool {
        self.accounts.iter().any(|a| a.account_id == account_id)
    }

    /// Principal collected so far
    pub fn paid_to_date(&self) -> Decimal {
        self.payback_amount.value() - self.current_balance.value()
    }

    /// Fraction of the payback collected, in [0, 1]
    pub fn payoff_fraction(&self) -> Decimal {
        if self.payback_amount.is_zero() {
            Decimal::ZERO
        } else {
            self.paid_to_date() / self.payback_amount.value()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn amount(v: Decimal) -> Amount {
        Amount::new(v).unwrap()
    }

    fn deal() -> Deal {
        Deal::new(
            "team-1",
            "merch-1",
            "Blue Bottle Deli",
            Currency::Usd,
            amount(dec!(10000)),
            amount(dec!(14000)),
            amount(dec!(500)),
        )
    }

    #[test]
    fn test_new_deal_opens_at_payback() {
        let deal = deal();
        assert_eq!(deal.status, DealStatus::Active);
        assert_eq!(deal.current_balance, deal.payback_amount);
        assert_eq!(deal.paid_to_date(), Decimal::ZERO);
    }

    #[test]
    fn test_terminal_states() {
        assert!(DealStatus::PaidOff.is_terminal());
        assert!(DealStatus::Defaulted.is_terminal());
        assert!(DealStatus::BoughtOut.is_terminal());
        assert!(!DealStatus::Late.is_terminal());
    }

    #[test]
    fn test_collectible_states() {
        assert!(DealStatus::Active.is_collectible());
        assert!(DealStatus::Late.is_collectible());
        assert!(!DealStatus::Pending.is_collectible());
        assert!(!DealStatus::PaidOff.is_collectible());
    }

    #[test]
    fn test_account_link() {
        let deal = deal().with_account("acct-9", Some("Operating".to_string()));
        assert!(deal.is_linked_to("acct-9"));
        assert!(!deal.is_linked_to("acct-7"));
    }

    #[test]
    fn test_payoff_fraction() {
        let mut deal = deal();
        deal.current_balance = amount(dec!(1400));
        assert_eq!(deal.payoff_fraction(), dec!(0.9));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(DealStatus::PaidOff.to_string(), "paid_off");
        assert_eq!(DealStatus::Active.to_string(), "active");
    }
}
