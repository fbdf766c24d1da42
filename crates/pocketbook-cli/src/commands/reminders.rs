//! Reminder command implementations

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use pocketbook_core::format::format_inr_whole;
use pocketbook_core::reminders::apply_reminder_completion;

use crate::store::FileGateway;

pub async fn cmd_complete_reminder(
    store: &FileGateway,
    id: &str,
    log_transaction: bool,
    today: NaiveDate,
) -> Result<()> {
    let reminder = store
        .snapshot()
        .reminder(id)
        .cloned()
        .ok_or_else(|| anyhow!("Reminder not found: {}", id))?;

    if reminder.completed {
        println!("Reminder '{}' is already completed.", reminder.title);
        return Ok(());
    }

    let outcome = apply_reminder_completion(store, &reminder, log_transaction, today)
        .await
        .context("Failed to complete reminder")?;

    println!("✅ Completed: {}", reminder.title);
    if let Some(next) = &outcome.next {
        println!(
            "   🔁 Next {} reminder due {}",
            next.recurrence.as_str(),
            next.date
        );
    }
    if let Some(tx) = &outcome.logged {
        println!(
            "   💸 Logged {} {} ({})",
            tx.kind,
            format_inr_whole(tx.amount),
            tx.id
        );
    }

    Ok(())
}
