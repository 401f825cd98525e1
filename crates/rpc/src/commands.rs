//! CLI command implementations

use crate::context::{AppContext, IngestOutcome};
use chrono::Utc;
use fundbook_core::{Amount, Currency};
use fundbook_ledger::{Deal, FeedRecord, MatchStatus, Participant};
use fundbook_projection::FeedFilter;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Create and register a deal
#[allow(clippy::too_many_arguments)]
pub async fn create_deal(
    ctx: &mut AppContext,
    team: &str,
    merchant_id: &str,
    merchant_name: &str,
    funding: Decimal,
    payback: Decimal,
    daily: Decimal,
    currency: &str,
    accounts: &[String],
    broker: Option<(&str, Decimal)>,
) -> anyhow::Result<()> {
    let currency: Currency = currency.parse()?;
    let mut deal = Deal::new(
        team,
        merchant_id,
        merchant_name,
        currency,
        Amount::new(funding)?,
        Amount::new(payback)?,
        Amount::new(daily)?,
    );
    for account in accounts {
        deal = deal.with_account(account, None);
    }
    if let Some((broker_id, percentage)) = broker {
        deal = deal.with_broker(broker_id, percentage);
    }

    let deal_id = deal.id.clone();
    ctx.create_deal(deal).await?;
    println!("✅ Created deal {}", deal_id);
    println!("   Payback {} collected at {}/day", payback, daily);
    Ok(())
}

/// Add a syndicator position to a deal
pub async fn add_participant(
    ctx: &mut AppContext,
    deal_id: &str,
    syndicator_id: &str,
    funding_share: Decimal,
    ownership: Decimal,
) -> anyhow::Result<()> {
    let participant =
        Participant::new(deal_id, syndicator_id, Amount::new(funding_share)?, ownership)?;
    ctx.add_participant(participant).await?;
    println!("✅ Added {} at {} ownership", syndicator_id, ownership);
    Ok(())
}

/// Ingest a JSONL file of feed records through the matcher pipeline
pub async fn ingest(ctx: &mut AppContext, file: &Path) -> anyhow::Result<()> {
    let reader = BufReader::new(File::open(file)?);

    let mut applied = 0;
    let mut suggested = 0;
    let mut unmatched = 0;
    let mut duplicates = 0;

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: FeedRecord = serde_json::from_str(&line)?;
        match ctx.ingest(record).await? {
            IngestOutcome::AutoApplied { result } => {
                applied += 1;
                println!(
                    "✅ Applied {} to deal {} (balance {})",
                    result.applied_principal, result.deal_id, result.new_balance
                );
                for anomaly in &result.anomalies {
                    println!("   ⚠️  {}", anomaly);
                }
                if result.deal_closed {
                    println!("   🎉 Deal paid off");
                }
            }
            IngestOutcome::Suggested {
                match_id,
                deal_id,
                confidence,
                ..
            } => {
                suggested += 1;
                println!(
                    "❓ Suggested match {} -> deal {} ({:.2})",
                    match_id, deal_id, confidence
                );
            }
            IngestOutcome::Unmatched { transaction_id } => {
                unmatched += 1;
                println!("⏳ Unmatched transaction {}", transaction_id);
            }
            IngestOutcome::Duplicate { transaction_id } => {
                duplicates += 1;
                println!("🔁 Duplicate delivery of {}", transaction_id);
            }
        }
    }

    println!(
        "Done: {} applied, {} suggested, {} unmatched, {} duplicates",
        applied, suggested, unmatched, duplicates
    );
    Ok(())
}

/// List matches awaiting human review
pub fn matches(ctx: &AppContext) -> anyhow::Result<()> {
    let pending = ctx.store.matches_with_status(MatchStatus::Suggested);
    if pending.is_empty() {
        println!("No suggested matches waiting");
        return Ok(());
    }
    for m in pending {
        println!(
            "{}  tx {} -> deal {}  confidence {:.2}",
            m.id, m.transaction_id, m.deal_id, m.confidence
        );
    }
    Ok(())
}

/// Confirm a suggested match
pub async fn confirm(ctx: &mut AppContext, match_id: &str) -> anyhow::Result<()> {
    let result = ctx.confirm_match(match_id).await?;
    println!(
        "✅ Applied {} to deal {} (balance {})",
        result.applied_principal, result.deal_id, result.new_balance
    );
    Ok(())
}

/// Reject a suggested match
pub async fn reject(ctx: &mut AppContext, match_id: &str) -> anyhow::Result<()> {
    ctx.reject_match(match_id).await?;
    println!("✅ Rejected match {}", match_id);
    Ok(())
}

/// Print reconciliation stats for a team
pub fn stats(ctx: &AppContext, team_id: &str) -> anyhow::Result<()> {
    let stats = ctx.stats(team_id);
    println!("Team {}", team_id);
    println!("  transactions:   {}", stats.total_transactions);
    println!("  auto matched:   {}", stats.auto_matched);
    println!("  manual matched: {}", stats.manual_matched);
    println!("  suggested:      {}", stats.suggested);
    println!("  unmatched:      {}", stats.unmatched);
    println!("  match rate:     {:.1}%", stats.match_rate * 100.0);
    println!("  recovery rate:  {:.1}%", stats.recovery_rate * 100.0);
    println!(
        "  est. time saved: {:.1} min (estimate only)",
        stats.est_time_saved_minutes
    );
    Ok(())
}

/// Query the payment feed
pub async fn feed(ctx: &AppContext, filter: FeedFilter) -> anyhow::Result<()> {
    let rows = ctx.feed(&filter).await?;
    if rows.is_empty() {
        println!("No matching feed rows");
        return Ok(());
    }
    for row in rows {
        println!(
            "{}  {}  {} {}  {}  {}",
            row.posted_at.format("%Y-%m-%d"),
            row.transaction_id,
            row.amount,
            row.currency,
            row.match_status,
            row.deal_id.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

/// Project the next payment for a deal's merchant
pub fn next_payment(ctx: &AppContext, deal_id: &str) -> anyhow::Result<()> {
    match ctx.next_payment(deal_id, Utc::now().date_naive()) {
        Some(next) => println!("Next payment {} on {}", next.amount, next.date),
        None => println!("No collectible deals for this merchant"),
    }
    Ok(())
}

/// Print a deal's outstanding balance
pub fn balance(ctx: &AppContext, deal_id: &str) -> anyhow::Result<()> {
    match ctx.deal_balance(deal_id) {
        Some(balance) => println!("Deal {} balance: {}", deal_id, balance),
        None => println!("Unknown deal {}", deal_id),
    }
    Ok(())
}

/// Mark a deal's pending commissions paid (ACH export hand-off)
pub async fn pay_commissions(ctx: &mut AppContext, deal_id: &str) -> anyhow::Result<()> {
    let rows = ctx.pay_commissions(deal_id).await?;
    if rows.is_empty() {
        println!("No pending commissions for deal {}", deal_id);
        return Ok(());
    }
    for row in rows {
        println!(
            "✅ Paid batch {} to {}: {}",
            row.batch, row.broker_id, row.amount
        );
    }
    Ok(())
}
