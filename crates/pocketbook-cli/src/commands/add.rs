//! Smart input: free text to a transaction or reminder

use anyhow::{bail, Context, Result};
use chrono::{DateTime, FixedOffset};
use pocketbook_core::chat::actions::{reminder_from_draft, transaction_from_draft};
use pocketbook_core::format::format_inr;
use pocketbook_core::{IntentClassifier, MutationGateway};

use crate::store::FileGateway;

/// Extract a record from `text`; prints the draft and writes it only with `save`
pub async fn cmd_add(
    store: &FileGateway,
    classifier: &dyn IntentClassifier,
    now: DateTime<FixedOffset>,
    text: &str,
    reminder: bool,
    save: bool,
) -> Result<()> {
    let text = text.trim();
    if text.is_empty() {
        bail!("Nothing to add: describe the transaction or reminder");
    }
    let today = now.date_naive();

    if reminder {
        let draft = classifier
            .extract_reminder(text, now)
            .await
            .context("Failed to read a reminder from that text")?;
        let data = reminder_from_draft(&draft, today);
        println!(
            "⏰ {} {} · {} · {} · repeats {}",
            data.kind.as_str(),
            format_inr(data.amount, 2),
            data.title,
            data.date,
            data.recurrence.as_str()
        );
        if save {
            let saved = store.create_reminder(data).await?;
            println!("✅ Saved reminder {}", saved.id);
        }
    } else {
        let draft = classifier
            .extract_transaction(text, now)
            .await
            .context("Failed to read a transaction from that text")?;
        let data = transaction_from_draft(&draft, today);
        println!(
            "💸 {} {} · {} · {} · {}",
            data.kind,
            format_inr(data.amount, 2),
            data.category,
            data.description,
            data.date
        );
        if save {
            let saved = store.create_transaction(data).await?;
            println!("✅ Saved transaction {}", saved.id);
        }
    }

    if !save {
        println!("   (preview only, add --save to record it)");
    }
    Ok(())
}
