//! Next-payment projections
//!
//! The expected debit for a merchant is the sum of daily payments over
//! their collectible deals, landing on the next business day. Weekends
//! are skipped; holiday calendars come from an external collaborator.

use chrono::NaiveDate;
use fundbook_core::calendar;
use fundbook_ledger::LedgerStore;
use rust_decimal::Decimal;
use serde::Serialize;

/// Projected next debit for a merchant
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NextPayment {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// Project the next payment for the merchant behind a deal.
///
/// Returns `None` when the deal is unknown or the merchant has no
/// collectible deals left.
pub fn next_payment(store: &LedgerStore, deal_id: &str, from: NaiveDate) -> Option<NextPayment> {
    let deal = store.deal(deal_id)?;
    let deals = store.collectible_deals_for_merchant(&deal.merchant_id);
    if deals.is_empty() {
        return None;
    }

    let amount: Decimal = deals.iter().map(|d| d.daily_payment.value()).sum();
    Some(NextPayment {
        date: calendar::next_business_day(from),
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundbook_core::{Amount, Currency};
    use fundbook_ledger::{Deal, DealStatus};
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn deal(store: &LedgerStore, daily: Decimal, status: DealStatus) -> Deal {
        let mut deal = Deal::new(
            "team-1",
            "merch-1",
            "Blue Bottle Deli",
            Currency::Usd,
            Amount::new(dec!(10000)).unwrap(),
            Amount::new(dec!(14000)).unwrap(),
            Amount::new(daily).unwrap(),
        );
        deal.status = status;
        store.insert_deal(deal.clone()).unwrap();
        deal
    }

    #[test]
    fn test_sums_collectible_deals_for_merchant() {
        let store = LedgerStore::new();
        let first = deal(&store, dec!(500), DealStatus::Active);
        deal(&store, dec!(250), DealStatus::Late);
        deal(&store, dec!(999), DealStatus::PaidOff);

        // Friday rolls to Monday
        let next = next_payment(&store, &first.id, date(2024, 5, 31)).unwrap();
        assert_eq!(next.date, date(2024, 6, 3));
        assert_eq!(next.amount, dec!(750));
    }

    #[test]
    fn test_no_collectible_deals() {
        let store = LedgerStore::new();
        let closed = deal(&store, dec!(500), DealStatus::PaidOff);
        assert!(next_payment(&store, &closed.id, date(2024, 6, 3)).is_none());
    }

    #[test]
    fn test_unknown_deal() {
        let store = LedgerStore::new();
        assert!(next_payment(&store, "missing", date(2024, 6, 3)).is_none());
    }
}
