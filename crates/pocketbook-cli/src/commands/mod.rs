//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `add` - smart input from free text
//! - `chat` - interactive chat REPL and transcript rendering
//! - `reports` - insights, health, subscriptions, budgets, trends, simulate
//! - `reminders` - reminder completion

pub mod add;
pub mod chat;
pub mod reminders;
pub mod reports;

use std::path::Path;

use anyhow::{Context, Result};
use pocketbook_core::Config;

// Re-export command functions for main.rs
pub use add::*;
pub use chat::*;
pub use reminders::*;
pub use reports::*;

/// Load layered config: explicit file or user override, then environment
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("Failed to load config")
}

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
