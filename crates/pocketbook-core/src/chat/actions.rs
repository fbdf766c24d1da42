//! Confirm handlers
//!
//! Staged cards only mutate data when confirmed. A successful confirm
//! resolves the card in place; a failure publishes an error toast and leaves
//! the card untouched so it can be retried.

use chrono::NaiveDate;
use tracing::{error, info, warn};

use crate::ai::types::{ActionCardIntent, CardAction, ReminderDraft, TransactionDraft};
use crate::error::{Error, Result};
use crate::gateway::MutationGateway;
use crate::insights::{SubscriptionCandidate, SubscriptionFrequency};
use crate::models::{
    NewReminder, NewTransaction, RecordChanges, RecordKind, Recurrence, ReminderType,
    DEFAULT_CATEGORY,
};

use super::dispatch::LastAction;
use super::events::ToastLevel;
use super::message::{CategoryProposal, MessageBody, StagedDelete, StagedEdit};
use super::session::ChatSession;

pub const SAVED: &str = "✅ Saved successfully!";
pub const UPDATED: &str = "✅ Updated successfully!";
pub const DELETED: &str = "✅ Deleted successfully!";

const DEFAULT_TRANSACTION_DESCRIPTION: &str = "AI Transaction";
const DEFAULT_REMINDER_TITLE: &str = "AI Reminder";
const SUBSCRIPTION_TAG: &str = "Subscription";

pub fn transaction_from_draft(draft: &TransactionDraft, today: NaiveDate) -> NewTransaction {
    NewTransaction {
        amount: draft.amount,
        kind: draft.transaction_type,
        category: draft
            .category
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        description: draft
            .description
            .clone()
            .unwrap_or_else(|| DEFAULT_TRANSACTION_DESCRIPTION.to_string()),
        date: draft.date.unwrap_or(today),
        tags: draft.tags.clone(),
    }
}

pub fn reminder_from_draft(draft: &ReminderDraft, today: NaiveDate) -> NewReminder {
    NewReminder {
        title: draft
            .title
            .clone()
            .unwrap_or_else(|| DEFAULT_REMINDER_TITLE.to_string()),
        amount: draft.amount,
        kind: ReminderType::from(draft.transaction_type),
        date: draft.date.unwrap_or(today),
        time: draft.time.clone(),
        recurrence: draft.recurrence,
        completed: false,
        tags: draft.tags.clone(),
    }
}

/// Transaction logged by an action card; payload fields win over the card's
pub fn transaction_from_card(card: &ActionCardIntent, today: NaiveDate) -> NewTransaction {
    let payload = &card.payload;
    NewTransaction {
        amount: card_amount(card),
        kind: card.transaction_type(),
        category: payload
            .category
            .clone()
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        description: payload
            .description
            .clone()
            .or_else(|| non_empty(&card.title))
            .unwrap_or_else(|| DEFAULT_TRANSACTION_DESCRIPTION.to_string()),
        date: payload.date.unwrap_or(today),
        tags: payload.tags.clone(),
    }
}

pub fn reminder_from_card(card: &ActionCardIntent, today: NaiveDate) -> NewReminder {
    let payload = &card.payload;
    NewReminder {
        title: payload
            .title
            .clone()
            .or_else(|| non_empty(&card.title))
            .unwrap_or_else(|| DEFAULT_REMINDER_TITLE.to_string()),
        amount: card_amount(card),
        kind: ReminderType::from(card.transaction_type()),
        date: payload.date.unwrap_or(today),
        time: None,
        recurrence: payload.recurrence,
        completed: false,
        tags: payload.tags.clone(),
    }
}

/// Recurring bill for a detected subscription, due on its next expected date
pub fn reminder_from_subscription(candidate: &SubscriptionCandidate) -> NewReminder {
    NewReminder {
        title: candidate.name.clone(),
        amount: candidate.amount,
        kind: ReminderType::Pay,
        date: candidate.next_due_date,
        time: None,
        recurrence: match candidate.frequency {
            SubscriptionFrequency::Monthly => Recurrence::Monthly,
            SubscriptionFrequency::Yearly => Recurrence::Yearly,
        },
        completed: false,
        tags: vec![SUBSCRIPTION_TAG.to_string()],
    }
}

fn card_amount(card: &ActionCardIntent) -> f64 {
    if card.payload.amount > 0.0 {
        card.payload.amount
    } else {
        card.amount
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn kind_label(kind: RecordKind) -> &'static str {
    match kind {
        RecordKind::Transaction => "Transaction",
        RecordKind::Reminder => "Reminder",
    }
}

impl ChatSession {
    fn gateway(&self) -> &dyn MutationGateway {
        self.inner.gateway.as_ref()
    }

    /// Payload of an unresolved card
    fn staged(&self, message_id: &str) -> Result<MessageBody> {
        let state = self.state();
        let message = state
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .ok_or_else(|| Error::NotFound(format!("message {}", message_id)))?;
        if message.saved || !message.body.is_confirmable() {
            return Err(Error::InvalidData(format!(
                "message {} has nothing to confirm",
                message_id
            )));
        }
        Ok(message.body.clone())
    }

    /// Resolve the card; a no-op when the conversation was closed meanwhile
    fn resolve(&self, message_id: &str, content: &str, last_action: Option<LastAction>) {
        let mut state = self.state();
        if let Some(last) = last_action {
            state.last_action = Some(last);
        }
        if let Some(message) = state.message_mut(message_id) {
            message.resolve(content);
        }
    }

    fn fail(&self, error: Error, toast: &str) -> Error {
        error!(error = %error, "{}", toast);
        self.inner.bus.toast(ToastLevel::Error, toast);
        error
    }

    /// Confirm a staged transaction, reminder, action card or category cleanup
    pub async fn confirm_action(&self, message_id: &str) -> Result<()> {
        let today = self.inner.clock.today();
        let created = match self.staged(message_id)? {
            MessageBody::ConfirmationTransaction(draft) => {
                self.create_transaction(transaction_from_draft(&draft, today))
                    .await
            }
            MessageBody::ConfirmationReminder(draft) => {
                self.create_reminder(reminder_from_draft(&draft, today))
                    .await
            }
            MessageBody::ActionCard(card) => match card.action {
                CardAction::LogTransaction => {
                    self.create_transaction(transaction_from_card(&card, today))
                        .await
                }
                CardAction::LogReminder => {
                    self.create_reminder(reminder_from_card(&card, today))
                        .await
                }
            },
            MessageBody::CategoryCleanup { proposals } => {
                return self.apply_cleanup(message_id, &proposals).await
            }
            other => {
                return Err(Error::InvalidData(format!(
                    "{} cards are confirmed elsewhere",
                    other.type_name()
                )))
            }
        };

        match created {
            Ok(last) => {
                info!(kind = %last.kind, id = %last.id, "Saved staged record");
                self.resolve(message_id, SAVED, Some(last));
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Failed to save.")),
        }
    }

    async fn create_transaction(&self, data: NewTransaction) -> Result<LastAction> {
        let tx = self.gateway().create_transaction(data).await?;
        Ok(LastAction {
            kind: RecordKind::Transaction,
            id: tx.id,
        })
    }

    async fn create_reminder(&self, data: NewReminder) -> Result<LastAction> {
        let reminder = self.gateway().create_reminder(data).await?;
        Ok(LastAction {
            kind: RecordKind::Reminder,
            id: reminder.id,
        })
    }

    async fn apply_cleanup(&self, message_id: &str, proposals: &[CategoryProposal]) -> Result<()> {
        let mut updated = 0usize;
        let mut last_error = None;
        for proposal in proposals {
            let changes = RecordChanges::category(proposal.new_category.as_str());
            match self.gateway().update_transaction(&proposal.id, &changes).await {
                Ok(()) => updated += 1,
                Err(e) => {
                    warn!(id = %proposal.id, error = %e, "Failed to recategorise transaction");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if updated == 0 => Err(self.fail(e, "Failed to update categories.")),
            _ => {
                info!(updated, "Applied category cleanup");
                self.resolve(
                    message_id,
                    &format!("✅ Updated {} transactions!", updated),
                    None,
                );
                Ok(())
            }
        }
    }

    /// Apply a staged edit
    pub async fn confirm_edit(&self, message_id: &str) -> Result<()> {
        let StagedEdit { item, changes } = match self.staged(message_id)? {
            MessageBody::EditConfirm(staged) => staged,
            other => {
                return Err(Error::InvalidData(format!(
                    "expected an edit card, found {}",
                    other.type_name()
                )))
            }
        };

        let kind = item.kind();
        let result = match kind {
            RecordKind::Transaction => self.gateway().update_transaction(item.id(), &changes).await,
            RecordKind::Reminder => self.gateway().update_reminder(item.id(), &changes).await,
        };

        match result {
            Ok(()) => {
                info!(%kind, id = item.id(), "Applied edit");
                self.resolve(
                    message_id,
                    UPDATED,
                    Some(LastAction {
                        kind,
                        id: item.id().to_string(),
                    }),
                );
                self.inner.bus.toast(
                    ToastLevel::Success,
                    format!("{} updated successfully!", kind_label(kind)),
                );
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Failed to update")),
        }
    }

    /// Apply a staged delete
    pub async fn confirm_delete(&self, message_id: &str) -> Result<()> {
        let StagedDelete { item } = match self.staged(message_id)? {
            MessageBody::DeleteConfirm(staged) => staged,
            other => {
                return Err(Error::InvalidData(format!(
                    "expected a delete card, found {}",
                    other.type_name()
                )))
            }
        };

        let kind = item.kind();
        let result = match kind {
            RecordKind::Transaction => self.gateway().delete_transaction(item.id()).await,
            RecordKind::Reminder => self.gateway().delete_reminder(item.id()).await,
        };

        match result {
            Ok(()) => {
                info!(%kind, id = item.id(), "Deleted record");
                {
                    let mut state = self.state();
                    let points_here = state
                        .last_action
                        .as_ref()
                        .map_or(false, |last| last.kind == kind && last.id == item.id());
                    if points_here {
                        state.last_action = None;
                    }
                }
                self.resolve(message_id, DELETED, None);
                self.inner.bus.toast(
                    ToastLevel::Success,
                    format!("{} deleted", kind_label(kind)),
                );
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Failed to delete")),
        }
    }

    /// Add a recurring reminder for one candidate of a subscription card
    ///
    /// The card stays as it is so other candidates can be added too.
    pub async fn confirm_subscription(&self, message_id: &str, index: usize) -> Result<()> {
        let candidate = match self.staged(message_id)? {
            MessageBody::Subscription { mut candidates } if index < candidates.len() => {
                candidates.swap_remove(index)
            }
            MessageBody::Subscription { .. } => {
                return Err(Error::NotFound(format!(
                    "subscription {} in message {}",
                    index, message_id
                )))
            }
            other => {
                return Err(Error::InvalidData(format!(
                    "expected a subscription card, found {}",
                    other.type_name()
                )))
            }
        };

        match self
            .create_reminder(reminder_from_subscription(&candidate))
            .await
        {
            Ok(last) => {
                info!(name = %candidate.name, id = %last.id, "Added subscription reminder");
                self.state().last_action = Some(last);
                self.inner.bus.toast(ToastLevel::Success, "Reminder added!");
                Ok(())
            }
            Err(e) => Err(self.fail(e, "Failed to add reminder.")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::ai::types::{ActionPayload, CategorySuggestion};
    use crate::ai::MockClassifier;
    use crate::chat::events::{ChatBus, ChatEvent};
    use crate::config::ChatConfig;
    use crate::gateway::InMemoryGateway;
    use crate::models::{FinancialSnapshot, Transaction, TransactionType};
    use crate::time::{self, FixedClock};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn setup() -> (ChatSession, MockClassifier, InMemoryGateway) {
        let mock = MockClassifier::new();
        let gateway = InMemoryGateway::default();
        let session = ChatSession::new(
            Arc::new(mock.clone()),
            Arc::new(gateway.clone()),
            Arc::new(FixedClock::on(date(2024, 3, 20))),
            ChatBus::default(),
            ChatConfig::default(),
        );
        (session, mock, gateway)
    }

    fn tx(id: &str, description: &str, category: &str, amount: f64, on: NaiveDate) -> Transaction {
        Transaction {
            id: id.into(),
            amount,
            kind: TransactionType::Expense,
            category: category.into(),
            description: description.into(),
            date: time::ist_midnight(on),
            tags: vec![],
        }
    }

    const COFFEE: &str = r#"{"type": "transaction", "transactionType": "expense", "amount": 250,
        "category": "Food", "description": "Coffee", "tags": [], "nextPrompts": ["Show food spending"]}"#;

    #[test]
    fn test_draft_defaults() {
        let today = date(2024, 3, 20);
        let tx = transaction_from_draft(&TransactionDraft::default(), today);
        assert_eq!(tx.description, "AI Transaction");
        assert_eq!(tx.category, "Other");
        assert_eq!(tx.date, today);

        let draft = ReminderDraft {
            transaction_type: TransactionType::Income,
            ..ReminderDraft::default()
        };
        let reminder = reminder_from_draft(&draft, today);
        assert_eq!(reminder.title, "AI Reminder");
        assert_eq!(reminder.kind, ReminderType::Collect);
    }

    #[test]
    fn test_card_payload_wins() {
        let card = ActionCardIntent {
            title: "Log salary".into(),
            amount: 10.0,
            action_type: Some("income".into()),
            payload: ActionPayload {
                amount: 50000.0,
                category: Some("Salary".into()),
                ..ActionPayload::default()
            },
            ..ActionCardIntent::default()
        };
        let tx = transaction_from_card(&card, date(2024, 3, 20));
        assert_eq!(tx.amount, 50000.0);
        assert_eq!(tx.kind, TransactionType::Income);
        assert_eq!(tx.description, "Log salary");
    }

    #[tokio::test]
    async fn test_confirm_transaction_resolves_card() {
        let (session, mock, gateway) = setup();
        mock.push_response(COFFEE);

        let card = session
            .send_message("coffee 250", &FinancialSnapshot::default())
            .await
            .unwrap();
        assert_eq!(card.content, "I've prepared a transaction.");
        assert_eq!(card.next_prompts, vec!["Show food spending"]);

        session.confirm_action(&card.id).await.unwrap();

        let saved = gateway.snapshot().transactions;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].description, "Coffee");
        assert_eq!(saved[0].local_date(), date(2024, 3, 20));

        let resolved = session.message(&card.id).unwrap();
        assert_eq!(resolved.content, SAVED);
        assert_eq!(resolved.body, MessageBody::Text);
        assert!(resolved.saved);
        assert_eq!(
            session.last_action(),
            Some(LastAction {
                kind: RecordKind::Transaction,
                id: saved[0].id.clone()
            })
        );

        // Already resolved
        assert!(session.confirm_action(&card.id).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_confirm_keeps_card() {
        let (session, mock, gateway) = setup();
        let mut events = session.subscribe();
        mock.push_response(COFFEE);
        let card = session
            .send_message("coffee 250", &FinancialSnapshot::default())
            .await
            .unwrap();

        gateway.fail_next(1);
        assert!(session.confirm_action(&card.id).await.is_err());
        assert_eq!(
            events.recv().await.unwrap(),
            ChatEvent::Toast {
                level: ToastLevel::Error,
                message: "Failed to save.".into()
            }
        );
        let still_staged = session.message(&card.id).unwrap();
        assert!(matches!(still_staged.body, MessageBody::ConfirmationTransaction(_)));
        assert!(!still_staged.saved);

        // Retry succeeds
        session.confirm_action(&card.id).await.unwrap();
        assert_eq!(gateway.snapshot().transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_edit_last_then_delete() {
        let (session, mock, gateway) = setup();
        mock.push_response(COFFEE);
        let card = session
            .send_message("coffee 250", &FinancialSnapshot::default())
            .await
            .unwrap();
        session.confirm_action(&card.id).await.unwrap();

        mock.push_response(r#"{"type": "edit", "target": "last", "changes": {"amount": 300}}"#);
        let edit = session
            .send_message("actually it was 300", &gateway.snapshot())
            .await
            .unwrap();
        assert_eq!(edit.content, "Found this transaction. Confirm the changes:");
        session.confirm_edit(&edit.id).await.unwrap();
        assert_eq!(gateway.snapshot().transactions[0].amount, 300.0);
        assert_eq!(session.message(&edit.id).unwrap().content, UPDATED);

        mock.push_response(r#"{"type": "delete", "target": "last"}"#);
        let delete = session
            .send_message("delete that", &gateway.snapshot())
            .await
            .unwrap();
        session.confirm_delete(&delete.id).await.unwrap();
        assert!(gateway.snapshot().transactions.is_empty());
        assert_eq!(session.last_action(), None);
    }

    #[tokio::test]
    async fn test_confirm_unknown_message() {
        let (session, _, _) = setup();
        assert!(matches!(
            session.confirm_action("msg-404").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_subscription_reminder_keeps_card() {
        let (session, mock, gateway) = setup();
        mock.push_response(r#"{"type": "subscription"}"#);
        let snap = FinancialSnapshot::new(
            vec![
                tx("t1", "Netflix", "Entertainment", 649.0, date(2024, 1, 1)),
                tx("t2", "Netflix", "Entertainment", 649.0, date(2024, 1, 31)),
                tx("t3", "Netflix", "Entertainment", 649.0, date(2024, 3, 1)),
            ],
            vec![],
            vec![],
        );

        let card = session.send_message("any subscriptions?", &snap).await.unwrap();
        session.confirm_subscription(&card.id, 0).await.unwrap();

        let reminders = gateway.snapshot().reminders;
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].title, "Netflix");
        assert_eq!(reminders[0].recurrence, Recurrence::Monthly);
        assert_eq!(reminders[0].date, date(2024, 3, 31));
        assert_eq!(reminders[0].tags, vec!["Subscription"]);
        assert!(matches!(
            session.message(&card.id).unwrap().body,
            MessageBody::Subscription { .. }
        ));

        assert!(matches!(
            session.confirm_subscription(&card.id, 5).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cleanup_confirm_counts_updates() {
        let snap = FinancialSnapshot::new(
            vec![
                tx("t1", "Uber ride", "Other", 180.0, date(2024, 3, 2)),
                tx("t2", "Groceries", "", 900.0, date(2024, 3, 3)),
            ],
            vec![],
            vec![],
        );
        let mock = MockClassifier::new();
        let gateway = InMemoryGateway::new(snap.clone());
        let session = ChatSession::new(
            Arc::new(mock.clone()),
            Arc::new(gateway.clone()),
            Arc::new(FixedClock::on(date(2024, 3, 20))),
            ChatBus::default(),
            ChatConfig::default(),
        );
        mock.set_suggestions(vec![
            CategorySuggestion {
                id: "t1".into(),
                category: "Transport".into(),
            },
            CategorySuggestion {
                id: "t2".into(),
                category: "Groceries".into(),
            },
        ]);

        let card = session
            .send_message("clean up my categories", &snap)
            .await
            .unwrap();
        assert!(matches!(card.body, MessageBody::CategoryCleanup { .. }));

        session.confirm_action(&card.id).await.unwrap();
        assert_eq!(
            session.message(&card.id).unwrap().content,
            "✅ Updated 2 transactions!"
        );
        let categories: Vec<String> = gateway
            .snapshot()
            .transactions
            .into_iter()
            .map(|t| t.category)
            .collect();
        assert_eq!(categories, vec!["Transport", "Groceries"]);
    }
}
