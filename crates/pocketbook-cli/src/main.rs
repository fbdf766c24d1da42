//! PocketBook CLI - personal finance assistant
//!
//! Usage:
//!   pocketbook chat                      Chat with the assistant
//!   pocketbook add "lunch 450" --save    Log from free text
//!   pocketbook insights                  Spending insights
//!   pocketbook health                    Financial health score
//!   pocketbook simulate --amount 25000   Can I afford it?

mod cli;
mod commands;
mod store;


use anyhow::{Context, Result};
use clap::Parser;
use pocketbook_core::{ClassifierClient, Clock, SystemClock};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (warn keeps chat output clean)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let store = store::FileGateway::open(&cli.data)?;
    let today = SystemClock.today();

    match cli.command {
        Commands::Chat => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::cmd_chat(store, &config).await
        }
        Commands::Add {
            text,
            reminder,
            save,
        } => {
            let config = commands::load_config(cli.config.as_deref())?;
            let classifier = ClassifierClient::from_config(&config)
                .context("Failed to set up the classifier")?;
            commands::cmd_add(&store, &classifier, SystemClock.now(), &text, reminder, save).await
        }
        Commands::Insights => commands::cmd_insights(&store.snapshot(), today),
        Commands::Health => commands::cmd_health(&store.snapshot(), today),
        Commands::Subscriptions => commands::cmd_subscriptions(&store.snapshot()),
        Commands::Budgets => commands::cmd_budgets(&store.snapshot(), today),
        Commands::Trends => commands::cmd_trends(&store.snapshot(), today),
        Commands::Simulate {
            amount,
            recurring,
            title,
        } => commands::cmd_simulate(&store.snapshot(), today, amount, recurring, title),
        Commands::CompleteReminder {
            id,
            log_transaction,
        } => commands::cmd_complete_reminder(&store, &id, log_transaction, today).await,
    }
}
