//! Referral Admin
//!
//! Operator CLI for the referral graph. Runs migrations, checks referrer
//! keys and chains, and prints program and referral summaries as JSON.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use core_config::{Environment, FromEnv};
use domain_referrals::{PgUserDirectory, ReferralPolicy, ReferralService, UserId};
use eyre::Result;
use serde_json::json;
use tracing::info;

mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "referral-admin")]
#[command(about = "Inspect and maintain the referral graph")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,

    /// Resolve a referral key to an acceptable referrer id
    Validate {
        /// Referral key of the candidate referrer
        #[arg(short, long)]
        key: String,

        /// Id of the user being referred, if it already exists
        #[arg(short, long)]
        user: Option<i64>,
    },

    /// Check whether linking two users would create a cycle
    Cycle {
        /// Prospective referrer
        #[arg(long)]
        referrer: i64,

        /// Prospective referral
        #[arg(long)]
        referral: i64,

        /// Hop limit for the walk. Defaults to REFERRAL_MAX_CHAIN_DEPTH.
        #[arg(short, long)]
        max_depth: Option<usize>,
    },

    /// Show whether a user is still inside the referral program window
    Program {
        #[arg(short, long)]
        user: i64,
    },

    /// List direct referrals of a user
    Referrals {
        #[arg(short, long)]
        user: i64,
    },

    /// Show referral totals for a user
    Stats {
        #[arg(short, long)]
        user: i64,
    },

    /// Check database connectivity
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let config = Config::from_env()?;
    let environment = Environment::from_env();
    init_tracing(&environment);

    let cli = Cli::parse();

    info!("Connecting to database...");
    let db =
        database::postgres::connect_from_config_with_retry(config.database.clone(), None).await?;

    let policy = ReferralPolicy::from(config.referral.clone());
    let service = ReferralService::with_policy(PgUserDirectory::new(db.clone()), policy);

    match cli.command {
        Commands::Migrate => {
            database::postgres::run_migrations::<migration::Migrator>(&db, "referral-admin")
                .await?;
        }

        Commands::Validate { key, user } => {
            let referrer_id = service
                .validate_referrer(Some(key.as_str()), user.map(UserId::from))
                .await?;
            print_json(&json!({ "key": key, "referrer_id": referrer_id }))?;
        }

        Commands::Cycle {
            referrer,
            referral,
            max_depth,
        } => {
            let max_depth = max_depth.unwrap_or(policy.max_chain_depth);
            let cycle = service
                .has_cycle_within(UserId(referrer), UserId(referral), max_depth)
                .await?;
            print_json(&json!({
                "referrer_id": referrer,
                "referral_id": referral,
                "max_depth": max_depth,
                "cycle": cycle,
            }))?;
        }

        Commands::Program { user } => {
            let user_id = UserId(user);
            let active = service.is_program_active(user_id).await?;
            let referrer_id = service.get_referrer_id(user_id).await?;
            print_json(&json!({
                "user_id": user_id,
                "referrer_id": referrer_id,
                "program_years": policy.program_years,
                "program_active": active,
            }))?;
        }

        Commands::Referrals { user } => {
            let referrals = service.get_referrals(UserId(user)).await?;
            print_json(&serde_json::to_value(&referrals)?)?;
        }

        Commands::Stats { user } => {
            let stats = service.referral_stats(UserId(user)).await?;
            print_json(&serde_json::to_value(&stats)?)?;
        }

        Commands::Health => {
            let status = database::postgres::check_health_detailed(&db).await;
            print_json(&json!({
                "healthy": status.healthy,
                "message": status.message,
                "response_time_ms": status.response_time_ms,
            }))?;
            if !status.healthy {
                eyre::bail!("Database is unhealthy");
            }
        }
    }

    Ok(())
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
