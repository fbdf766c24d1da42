//! Reminder completion and recurrence
//!
//! Completing a recurring reminder marks the original done and spawns its
//! successor. The original is never touched again by recurrence logic.

use chrono::{Duration, Months, NaiveDate};
use tracing::info;

use crate::error::Result;
use crate::gateway::MutationGateway;
use crate::models::{NewReminder, NewTransaction, RecordChanges, Recurrence, Reminder, Transaction};

impl Recurrence {
    /// Next occurrence after `date`, or `None` for one-off reminders
    ///
    /// Month arithmetic clamps to the last day (Jan 31 -> Feb 29 in 2024).
    pub fn advance(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::None => None,
            Self::Daily => date.checked_add_signed(Duration::days(1)),
            Self::Weekly => date.checked_add_signed(Duration::days(7)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
        }
    }
}

/// Result of completing one reminder
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    /// The original, with only `completed` flipped
    pub completed: Reminder,
    /// Next instance for recurring reminders
    pub next: Option<NewReminder>,
}

/// Pure completion: no store access
pub fn complete_reminder(reminder: &Reminder) -> Completion {
    let mut completed = reminder.clone();
    completed.completed = true;

    let next = reminder
        .recurrence
        .advance(reminder.date)
        .map(|date| NewReminder {
            title: reminder.title.clone(),
            amount: reminder.amount,
            kind: reminder.kind,
            date,
            time: reminder.time.clone(),
            recurrence: reminder.recurrence,
            completed: false,
            tags: reminder.tags.clone(),
        });

    Completion { completed, next }
}

/// What [`apply_reminder_completion`] wrote
#[derive(Debug, Clone, Default)]
pub struct CompletionOutcome {
    pub next: Option<Reminder>,
    pub logged: Option<Transaction>,
}

/// Complete a reminder through the gateway
///
/// Marks the original completed, creates the successor for recurring
/// reminders, and optionally logs the matching transaction (collect is
/// income, pay is an expense) dated `today`.
pub async fn apply_reminder_completion<G>(
    gateway: &G,
    reminder: &Reminder,
    log_transaction: bool,
    today: NaiveDate,
) -> Result<CompletionOutcome>
where
    G: MutationGateway + ?Sized,
{
    let completion = complete_reminder(reminder);

    gateway
        .update_reminder(&reminder.id, &RecordChanges::completed(true))
        .await?;

    let next = match completion.next {
        Some(draft) => Some(gateway.create_reminder(draft).await?),
        None => None,
    };

    let logged = if log_transaction {
        let tx = gateway
            .create_transaction(NewTransaction {
                amount: reminder.amount(),
                kind: reminder.kind.transaction_type(),
                category: crate::models::DEFAULT_CATEGORY.to_string(),
                description: reminder.title.clone(),
                date: today,
                tags: reminder.tags.clone(),
            })
            .await?;
        Some(tx)
    } else {
        None
    };

    info!(
        id = %reminder.id,
        recurrence = reminder.recurrence.as_str(),
        spawned = next.is_some(),
        logged = logged.is_some(),
        "Completed reminder"
    );

    Ok(CompletionOutcome { next, logged })
}
