//! Conversation messages and their widget payloads

use serde::Serialize;

use crate::ai::types::{ActionCardIntent, ChartIntent, ReminderDraft, TransactionDraft};
use crate::insights::{BudgetStatus, HealthScore, Insight, SimulationResult, SubscriptionCandidate};
use crate::models::{Record, RecordChanges};
use crate::query::BreakdownItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Error notices raised by the session itself
    System,
}

/// A staged edit awaiting confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedEdit {
    pub item: Record,
    pub changes: RecordChanges,
}

/// A staged delete awaiting confirmation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StagedDelete {
    pub item: Record,
}

/// One proposed recategorisation in a cleanup card
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryProposal {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub current_category: String,
    pub new_category: String,
}

/// Widget shape and payload of a message
///
/// Serialized as `{"type": ..., "data": ...}`. Confirmable cards turn back
/// into `Text` once resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum MessageBody {
    Text,
    QueryBreakdown {
        items: Vec<BreakdownItem>,
        count: usize,
        #[serde(rename = "grandTotal")]
        grand_total: f64,
    },
    QueryStats {
        items: Vec<Record>,
        count: usize,
    },
    ConfirmationTransaction(TransactionDraft),
    ConfirmationReminder(ReminderDraft),
    Insight {
        insights: Vec<Insight>,
    },
    Budget {
        budgets: Vec<BudgetStatus>,
    },
    EditConfirm(StagedEdit),
    DeleteConfirm(StagedDelete),
    Subscription {
        candidates: Vec<SubscriptionCandidate>,
    },
    CategoryCleanup {
        proposals: Vec<CategoryProposal>,
    },
    ScenarioSimulation(SimulationResult),
    Chart(ChartIntent),
    ActionCard(ActionCardIntent),
    #[serde(rename = "health_score")]
    HealthScore(HealthScore),
}

impl MessageBody {
    pub fn type_name(&self) -> &'static str {
        match self {
            MessageBody::Text => "text",
            MessageBody::QueryBreakdown { .. } => "query-breakdown",
            MessageBody::QueryStats { .. } => "query-stats",
            MessageBody::ConfirmationTransaction(_) => "confirmation-transaction",
            MessageBody::ConfirmationReminder(_) => "confirmation-reminder",
            MessageBody::Insight { .. } => "insight",
            MessageBody::Budget { .. } => "budget",
            MessageBody::EditConfirm(_) => "edit-confirm",
            MessageBody::DeleteConfirm(_) => "delete-confirm",
            MessageBody::Subscription { .. } => "subscription",
            MessageBody::CategoryCleanup { .. } => "category-cleanup",
            MessageBody::ScenarioSimulation(_) => "scenario-simulation",
            MessageBody::Chart(_) => "chart",
            MessageBody::ActionCard(_) => "action-card",
            MessageBody::HealthScore(_) => "health_score",
        }
    }

    /// Whether the card offers a confirm control
    pub fn is_confirmable(&self) -> bool {
        matches!(
            self,
            MessageBody::ConfirmationTransaction(_)
                | MessageBody::ConfirmationReminder(_)
                | MessageBody::EditConfirm(_)
                | MessageBody::DeleteConfirm(_)
                | MessageBody::CategoryCleanup { .. }
                | MessageBody::ActionCard(_)
                | MessageBody::Subscription { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(flatten)]
    pub body: MessageBody,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub next_prompts: Vec<String>,
    pub saved: bool,
}

impl Message {
    /// Resolve a confirmed card in place: plain text, no payload
    pub(crate) fn resolve(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.body = MessageBody::Text;
        self.saved = true;
    }
}

/// An outgoing message before the session assigns its id
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub role: Role,
    pub content: String,
    pub body: MessageBody,
    pub next_prompts: Vec<String>,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self::widget(content, MessageBody::Text)
    }

    pub fn widget(content: impl Into<String>, body: MessageBody) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            body,
            next_prompts: Vec::new(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            ..Self::text(content)
        }
    }

    pub fn with_prompts(mut self, prompts: Vec<String>) -> Self {
        self.next_prompts = prompts;
        self
    }
}
