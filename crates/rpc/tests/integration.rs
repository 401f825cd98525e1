//! Integration tests for Fundbook
//!
//! These drive the full pipeline: provisioning, feed ingest, matching,
//! reconciliation, distribution, stats and journal replay.

use chrono::Utc;
use fundbook_core::{Amount, Currency};
use fundbook_ledger::{
    Deal, DealStatus, FeedRecord, MatchStatus, Participant, SourceType, TransactionKind,
};
use fundbook_projection::FeedFilter;
use fundbook_rpc::{AppContext, IngestOutcome};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

fn amount(v: Decimal) -> Amount {
    Amount::new(v).unwrap()
}

fn sample_deal(payback: Decimal, daily: Decimal) -> Deal {
    Deal::new(
        "team-1",
        "merch-1",
        "Blue Bottle Deli",
        Currency::Usd,
        amount(payback / dec!(1.4)),
        amount(payback),
        amount(daily),
    )
    .with_account("acct-9", Some("Operating".to_string()))
}

fn feed_record(external_id: &str, minor: i64) -> FeedRecord {
    FeedRecord {
        external_id: external_id.to_string(),
        source_type: SourceType::BankSync,
        team_id: "team-1".to_string(),
        account_id: "acct-9".to_string(),
        amount_minor: minor,
        currency: Currency::Usd,
        posted_at: Utc::now(),
        descriptor: "ACH DEBIT BLUE BOTTLE DELI 0923".to_string(),
        kind: TransactionKind::Payment,
        related_external_id: None,
    }
}

fn nsf_record(external_id: &str, minor: i64, reverses: &str) -> FeedRecord {
    FeedRecord {
        kind: TransactionKind::NsfReturn,
        related_external_id: Some(reverses.to_string()),
        descriptor: "NSF RETURN".to_string(),
        ..feed_record(external_id, minor)
    }
}

/// Test: provision -> on-target payment auto-applies -> redelivery is a no-op
#[tokio::test]
async fn test_auto_match_and_idempotent_redelivery() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = AppContext::new(temp_dir.path()).await.unwrap();

    let deal = sample_deal(dec!(2000), dec!(500));
    let deal_id = deal.id.clone();
    ctx.create_deal(deal).await.unwrap();

    let outcome = ctx.ingest(feed_record("tx-1", 50000)).await.unwrap();
    let IngestOutcome::AutoApplied { result } = outcome else {
        panic!("expected auto apply, got {:?}", outcome);
    };
    assert_eq!(result.applied_principal, dec!(500));
    assert_eq!(result.new_balance, dec!(1500));
    assert!(result.anomalies.is_empty());
    assert_eq!(ctx.deal_balance(&deal_id), Some(dec!(1500)));

    // At-least-once delivery: the same external id arrives again
    let redelivered = ctx.ingest(feed_record("tx-1", 50000)).await.unwrap();
    assert!(matches!(redelivered, IngestOutcome::Duplicate { .. }));
    assert_eq!(ctx.deal_balance(&deal_id), Some(dec!(1500)));
    assert_eq!(ctx.store.payments_for_deal(&deal_id).len(), 1);
}

/// Test: balance conservation holds across mixed payments and reversals
#[tokio::test]
async fn test_balance_conservation() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = AppContext::new(temp_dir.path()).await.unwrap();

    let deal = sample_deal(dec!(5000), dec!(500));
    let deal_id = deal.id.clone();
    ctx.create_deal(deal).await.unwrap();

    ctx.ingest(feed_record("tx-1", 50000)).await.unwrap();
    ctx.ingest(feed_record("tx-2", 49000)).await.unwrap();
    ctx.ingest(nsf_record("tx-3", 50000, "tx-1")).await.unwrap();

    let deal = ctx.store.deal(&deal_id).unwrap();
    assert_eq!(
        deal.payback_amount.value() - deal.current_balance.value(),
        ctx.store.net_principal_for_deal(&deal_id),
    );
    assert_eq!(deal.current_balance.value(), dec!(4510));
    assert_eq!(deal.nsf_count, 1);
}

/// Test: suggested match queue, confirm path and reject path
#[tokio::test]
async fn test_suggest_confirm_and_reject() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = AppContext::new(temp_dir.path()).await.unwrap();

    let deal = sample_deal(dec!(2000), dec!(500));
    let deal_id = deal.id.clone();
    ctx.create_deal(deal).await.unwrap();

    // $300 against a $500 expected payment lands in the suggestion band
    let outcome = ctx.ingest(feed_record("tx-1", 30000)).await.unwrap();
    let IngestOutcome::Suggested { match_id, .. } = outcome else {
        panic!("expected suggestion, got {:?}", outcome);
    };
    assert_eq!(
        ctx.store.matches_with_status(MatchStatus::Suggested).len(),
        1
    );

    let result = ctx.confirm_match(&match_id).await.unwrap();
    assert_eq!(result.applied_principal, dec!(300));
    assert!(matches!(
        result.anomalies.as_slice(),
        [fundbook_ledger::Anomaly::Underpaid { .. }]
    ));
    assert_eq!(ctx.deal_balance(&deal_id), Some(dec!(1700)));

    // Another suggestion, rejected this time: transaction stays queryable
    let outcome = ctx.ingest(feed_record("tx-2", 30000)).await.unwrap();
    let IngestOutcome::Suggested { match_id, .. } = outcome else {
        panic!("expected suggestion, got {:?}", outcome);
    };
    ctx.reject_match(&match_id).await.unwrap();
    assert_eq!(ctx.deal_balance(&deal_id), Some(dec!(1700)));

    let stats = ctx.stats("team-1");
    assert_eq!(stats.manual_matched, 1);
    assert_eq!(stats.unmatched, 1);
}

/// Test: final payment closes the deal and distributions conserve
#[tokio::test]
async fn test_payoff_with_distribution() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = AppContext::new(temp_dir.path()).await.unwrap();

    let deal = sample_deal(dec!(1700.01), dec!(1700)).with_broker("broker-1", dec!(0.05));
    let deal_id = deal.id.clone();
    ctx.create_deal(deal).await.unwrap();
    ctx.add_participant(
        Participant::new(&deal_id, "synd-1", amount(dec!(600)), dec!(0.6)).unwrap(),
    )
    .await
    .unwrap();
    ctx.add_participant(
        Participant::new(&deal_id, "synd-2", amount(dec!(400)), dec!(0.4)).unwrap(),
    )
    .await
    .unwrap();

    let outcome = ctx.ingest(feed_record("tx-1", 170001)).await.unwrap();
    let IngestOutcome::AutoApplied { result } = outcome else {
        panic!("expected auto apply, got {:?}", outcome);
    };
    assert!(result.deal_closed);
    assert_eq!(result.applied_principal, dec!(1700.01));

    let deal = ctx.store.deal(&deal_id).unwrap();
    assert_eq!(deal.status, DealStatus::PaidOff);
    assert!(deal.paid_off_at.is_some());

    // Proceeds conserve the applied principal exactly
    let entries = ctx.store.entries_for_payment(&result.payment_id);
    let total: Decimal = entries.iter().map(|e| e.amount).sum();
    assert_eq!(total, dec!(1700.01));

    let commissions = ctx.store.commissions_for_deal(&deal_id);
    assert_eq!(commissions.len(), 1);
    assert_eq!(commissions[0].amount, dec!(85.00));

    let paid = ctx.pay_commissions(&deal_id).await.unwrap();
    assert_eq!(paid.len(), 1);
}

/// Test: a payment larger than the outstanding balance is clamped;
/// the excess is never credited
#[tokio::test]
async fn test_overpayment_clamps_at_payoff() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = AppContext::new(temp_dir.path()).await.unwrap();

    let deal = sample_deal(dec!(1700), dec!(1700));
    let deal_id = deal.id.clone();
    ctx.create_deal(deal).await.unwrap();

    let outcome = ctx.ingest(feed_record("tx-1", 175000)).await.unwrap();
    let IngestOutcome::AutoApplied { result } = outcome else {
        panic!("expected auto apply, got {:?}", outcome);
    };
    assert_eq!(result.applied_principal, dec!(1700));
    assert_eq!(result.new_balance, Decimal::ZERO);
    assert_eq!(ctx.deal_balance(&deal_id), Some(Decimal::ZERO));
}

/// Test: NSF return reverses a payment that closed the deal; policy
/// reopens the deal with the reversed principal owing again
#[tokio::test]
async fn test_nsf_reopens_paid_off_deal() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = AppContext::new(temp_dir.path()).await.unwrap();

    let deal = sample_deal(dec!(1000), dec!(500));
    let deal_id = deal.id.clone();
    ctx.create_deal(deal).await.unwrap();

    ctx.ingest(feed_record("tx-1", 50000)).await.unwrap();
    ctx.ingest(feed_record("tx-2", 50000)).await.unwrap();
    assert_eq!(
        ctx.store.deal(&deal_id).unwrap().status,
        DealStatus::PaidOff
    );

    let outcome = ctx.ingest(nsf_record("tx-3", 50000, "tx-1")).await.unwrap();
    let IngestOutcome::AutoApplied { result } = outcome else {
        panic!("expected auto apply, got {:?}", outcome);
    };
    assert!(result.reopened);

    let deal = ctx.store.deal(&deal_id).unwrap();
    assert_eq!(deal.status, DealStatus::Active);
    assert_eq!(deal.current_balance.value(), dec!(500));
    assert_eq!(deal.nsf_count, 1);
    // History preserved: 2 applied + 1 reversal
    assert_eq!(ctx.store.payments_for_deal(&deal_id).len(), 3);
}

/// Test: incremental stats always agree with read-time aggregation
#[tokio::test]
async fn test_stats_equivalence_through_full_flow() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = AppContext::new(temp_dir.path()).await.unwrap();

    let deal = sample_deal(dec!(5000), dec!(500));
    ctx.create_deal(deal).await.unwrap();
    assert_eq!(ctx.stats("team-1"), ctx.stats_computed("team-1"));

    ctx.ingest(feed_record("tx-1", 50000)).await.unwrap();
    assert_eq!(ctx.stats("team-1"), ctx.stats_computed("team-1"));

    let outcome = ctx.ingest(feed_record("tx-2", 30000)).await.unwrap();
    assert_eq!(ctx.stats("team-1"), ctx.stats_computed("team-1"));
    if let IngestOutcome::Suggested { match_id, .. } = outcome {
        ctx.confirm_match(&match_id).await.unwrap();
    }
    assert_eq!(ctx.stats("team-1"), ctx.stats_computed("team-1"));

    // Stray transaction on an unknown account stays unmatched
    let mut stray = feed_record("tx-3", 12300);
    stray.account_id = "acct-unknown".to_string();
    ctx.ingest(stray).await.unwrap();
    assert_eq!(ctx.stats("team-1"), ctx.stats_computed("team-1"));

    let stats = ctx.stats("team-1");
    assert_eq!(stats.total_transactions, 3);
    assert_eq!(stats.auto_matched, 1);
    assert_eq!(stats.manual_matched, 1);
    assert_eq!(stats.unmatched, 1);
}

/// Test: restart replays the journal and rebuilds identical state
#[tokio::test]
async fn test_restart_rebuilds_state() {
    let temp_dir = TempDir::new().unwrap();
    let deal_id;
    let stats_before;

    {
        let mut ctx = AppContext::new(temp_dir.path()).await.unwrap();
        let deal = sample_deal(dec!(2000), dec!(500));
        deal_id = deal.id.clone();
        ctx.create_deal(deal).await.unwrap();
        ctx.add_participant(
            Participant::new(&deal_id, "synd-1", amount(dec!(500)), dec!(0.5)).unwrap(),
        )
        .await
        .unwrap();
        ctx.ingest(feed_record("tx-1", 50000)).await.unwrap();
        ctx.ingest(feed_record("tx-2", 30000)).await.unwrap();
        stats_before = ctx.stats("team-1");
    }

    let ctx = AppContext::new(temp_dir.path()).await.unwrap();
    assert_eq!(ctx.deal_balance(&deal_id), Some(dec!(1500)));
    assert_eq!(ctx.store.payments_for_deal(&deal_id).len(), 1);
    assert_eq!(ctx.stats("team-1"), stats_before);
    assert_eq!(ctx.stats("team-1"), ctx.stats_computed("team-1"));
    assert_eq!(ctx.store.participants(&deal_id).len(), 1);
}

/// Test: the feed projection tracks ingest and match state
#[tokio::test]
async fn test_feed_projection_query() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = AppContext::new(temp_dir.path()).await.unwrap();

    let deal = sample_deal(dec!(2000), dec!(500));
    let deal_id = deal.id.clone();
    ctx.create_deal(deal).await.unwrap();

    ctx.ingest(feed_record("tx-1", 50000)).await.unwrap();
    let mut stray = feed_record("tx-2", 12300);
    stray.account_id = "acct-unknown".to_string();
    stray.descriptor = "WIRE UNKNOWN".to_string();
    ctx.ingest(stray).await.unwrap();

    let all = ctx.feed(&FeedFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let confirmed = ctx
        .feed(&FeedFilter {
            match_status: Some(MatchStatus::Confirmed),
            ..FeedFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0].deal_id.as_deref(), Some(deal_id.as_str()));

    let unmatched = ctx
        .feed(&FeedFilter {
            match_status: Some(MatchStatus::Unmatched),
            ..FeedFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(unmatched.len(), 1);
}

/// Test: ownership invariant rejected at the context boundary too
#[tokio::test]
async fn test_ownership_invariant_via_context() {
    let temp_dir = TempDir::new().unwrap();
    let mut ctx = AppContext::new(temp_dir.path()).await.unwrap();

    let deal = sample_deal(dec!(2000), dec!(500));
    let deal_id = deal.id.clone();
    ctx.create_deal(deal).await.unwrap();

    ctx.add_participant(
        Participant::new(&deal_id, "synd-1", amount(dec!(700)), dec!(0.7)).unwrap(),
    )
    .await
    .unwrap();
    let result = ctx
        .add_participant(
            Participant::new(&deal_id, "synd-2", amount(dec!(400)), dec!(0.4)).unwrap(),
        )
        .await;
    assert!(result.is_err());
}
