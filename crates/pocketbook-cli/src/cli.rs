//! CLI argument definitions using clap
//!
//! The command implementations live in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// PocketBook - chat with your finances
#[derive(Parser)]
#[command(name = "pocketbook")]
#[command(about = "Personal finance assistant over a local snapshot", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Snapshot file holding transactions, reminders and budgets (JSON)
    #[arg(long, default_value = "pocketbook.json", global = true)]
    pub data: PathBuf,

    /// Config file (defaults to the user config directory, then built-ins)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive chat
    ///
    /// Type messages to the assistant. Staged cards are confirmed with
    /// /confirm N, /edit N, /delete N or /sub N K (K-th subscription).
    /// /clear starts over, /quit exits.
    Chat,

    /// Read a transaction (or reminder) from free text
    ///
    /// Prints what was understood; nothing is written without --save.
    Add {
        /// e.g. "paid 450 for lunch yesterday"
        text: String,

        /// Read a reminder instead of a transaction
        #[arg(long)]
        reminder: bool,

        /// Record the result in the snapshot
        #[arg(long)]
        save: bool,
    },

    /// Month-over-month insights and a savings tip
    Insights,

    /// Financial health score
    Health,

    /// Detect recurring subscriptions
    Subscriptions,

    /// Budget utilisation this month
    Budgets,

    /// This month against the monthly average
    Trends,

    /// Check whether a purchase or new monthly cost is affordable
    Simulate {
        /// Amount in rupees
        #[arg(short, long)]
        amount: f64,

        /// Treat the amount as a new monthly cost instead of a one-time purchase
        #[arg(long)]
        recurring: bool,

        /// What the money is for
        #[arg(long)]
        title: Option<String>,
    },

    /// Mark a reminder done (spawns the next one for recurring reminders)
    CompleteReminder {
        /// Reminder ID
        id: String,

        /// Also log the matching transaction
        #[arg(long)]
        log_transaction: bool,
    },
}
