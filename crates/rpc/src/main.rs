//! Fundbook CLI - Main entry point

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use fundbook_ledger::MatchStatus;
use fundbook_projection::FeedFilter;
use fundbook_rpc::{commands, AppContext};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fundbook")]
#[command(about = "Fundbook - deal ledger and reconciliation engine", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a newly originated deal
    CreateDeal {
        /// Owning team ID
        #[arg(long)]
        team: String,
        /// Merchant ID
        #[arg(long)]
        merchant: String,
        /// Merchant display name (used for descriptor matching)
        #[arg(long)]
        merchant_name: String,
        /// Funded amount
        #[arg(long)]
        funding: Decimal,
        /// Total payback amount
        #[arg(long)]
        payback: Decimal,
        /// Expected daily payment
        #[arg(long)]
        daily: Decimal,
        /// Currency code
        #[arg(long, default_value = "USD")]
        currency: String,
        /// Linked bank account IDs (repeatable)
        #[arg(long = "account")]
        accounts: Vec<String>,
        /// Broker ID earning commission
        #[arg(long)]
        broker: Option<String>,
        /// Broker commission rate, e.g. 0.05
        #[arg(long, default_value = "0")]
        commission: Decimal,
    },

    /// Add a syndicator position to a deal
    AddParticipant {
        deal_id: String,
        syndicator_id: String,
        /// Capital contributed by the syndicator
        #[arg(long, default_value = "0")]
        funding_share: Decimal,
        /// Ownership fraction in [0, 1]
        #[arg(long)]
        ownership: Decimal,
    },

    /// Ingest a JSONL file of inbound feed records
    Ingest {
        /// Path to the feed file
        file: PathBuf,
    },

    /// List matches waiting for human review
    Matches,

    /// Confirm a suggested match and apply the payment
    Confirm { match_id: String },

    /// Reject a suggested match
    Reject { match_id: String },

    /// Show reconciliation stats for a team
    Stats { team_id: String },

    /// Query the payment feed
    Feed {
        /// Filter by team
        #[arg(long)]
        team: Option<String>,
        /// Filter by match status (unmatched, suggested, auto, confirmed)
        #[arg(long)]
        status: Option<MatchStatus>,
        /// Only transactions posted at or after this instant (RFC 3339)
        #[arg(long)]
        from: Option<DateTime<Utc>>,
        /// Only transactions posted at or before this instant (RFC 3339)
        #[arg(long)]
        to: Option<DateTime<Utc>>,
        /// Filter by account ID (repeatable)
        #[arg(long = "account")]
        accounts: Vec<String>,
        /// Filter by deal ID (repeatable)
        #[arg(long = "deal")]
        deals: Vec<String>,
        /// Minimum match confidence
        #[arg(long)]
        confidence_min: Option<f64>,
    },

    /// Project the next payment for a deal's merchant
    NextPayment { deal_id: String },

    /// Show a deal's outstanding balance
    Balance { deal_id: String },

    /// Mark a deal's pending commission batch paid
    PayCommissions { deal_id: String },

    /// Rebuild projections from the journal
    Replay {
        /// Drop the projection database before replaying
        #[arg(long)]
        reset: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut ctx = AppContext::new(&cli.data).await?;

    match cli.command {
        Commands::CreateDeal {
            team,
            merchant,
            merchant_name,
            funding,
            payback,
            daily,
            currency,
            accounts,
            broker,
            commission,
        } => {
            let broker = broker.as_deref().map(|b| (b, commission));
            commands::create_deal(
                &mut ctx,
                &team,
                &merchant,
                &merchant_name,
                funding,
                payback,
                daily,
                &currency,
                &accounts,
                broker,
            )
            .await?;
        }

        Commands::AddParticipant {
            deal_id,
            syndicator_id,
            funding_share,
            ownership,
        } => {
            commands::add_participant(&mut ctx, &deal_id, &syndicator_id, funding_share, ownership)
                .await?;
        }

        Commands::Ingest { file } => {
            commands::ingest(&mut ctx, &file).await?;
        }

        Commands::Matches => {
            commands::matches(&ctx)?;
        }

        Commands::Confirm { match_id } => {
            commands::confirm(&mut ctx, &match_id).await?;
        }

        Commands::Reject { match_id } => {
            commands::reject(&mut ctx, &match_id).await?;
        }

        Commands::Stats { team_id } => {
            commands::stats(&ctx, &team_id)?;
        }

        Commands::Feed {
            team,
            status,
            from,
            to,
            accounts,
            deals,
            confidence_min,
        } => {
            commands::feed(
                &ctx,
                FeedFilter {
                    team_id: team,
                    match_status: status,
                    date_from: from,
                    date_to: to,
                    account_ids: accounts,
                    deal_ids: deals,
                    confidence_min,
                },
            )
            .await?;
        }

        Commands::NextPayment { deal_id } => {
            commands::next_payment(&ctx, &deal_id)?;
        }

        Commands::Balance { deal_id } => {
            commands::balance(&ctx, &deal_id)?;
        }

        Commands::PayCommissions { deal_id } => {
            commands::pay_commissions(&mut ctx, &deal_id).await?;
        }

        Commands::Replay { reset } => {
            let projection_path = ctx.projection_path().to_path_buf();
            let data_path = cli.data.clone();

            // Drop the context to release the SQLite connection
            drop(ctx);

            if reset && projection_path.exists() {
                std::fs::remove_file(&projection_path)?;
                println!("🗑️  Dropped {}", projection_path.display());
            }

            let _ctx = AppContext::new(&data_path).await?;
            println!("✅ Projections rebuilt from journal");
        }
    }

    Ok(())
}
