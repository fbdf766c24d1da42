//! Intent classifier types
//!
//! The classifier answers every turn with one JSON object tagged by `type`.
//! [`Intent`] is the closed set of shapes it may return; every field is
//! parsed leniently so a sloppy model answer still lands in a variant.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::de;
use crate::insights::ScenarioType;
use crate::models::{BudgetPeriod, RecordChanges, Recurrence, Transaction, TransactionType};

/// Every `type` value the classifier may return
pub const INTENT_TYPES: [&str; 16] = [
    "transaction",
    "reminder",
    "query",
    "edit",
    "delete",
    "insight",
    "budget_check",
    "budget_set",
    "subscription",
    "cleanup_categories",
    "scenario_simulation",
    "chart",
    "action-card",
    "health_score",
    "greeting",
    "unknown",
];

/// A classified user turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Intent {
    #[serde(rename = "transaction")]
    Transaction(TransactionDraft),
    #[serde(rename = "reminder")]
    Reminder(ReminderDraft),
    #[serde(rename = "query")]
    Query(QueryIntent),
    #[serde(rename = "edit")]
    Edit(EditIntent),
    #[serde(rename = "delete")]
    Delete(DeleteIntent),
    #[serde(rename = "insight")]
    Insight(InsightIntent),
    #[serde(rename = "budget_check")]
    BudgetCheck(BudgetCheckIntent),
    #[serde(rename = "budget_set")]
    BudgetSet(BudgetSetIntent),
    #[serde(rename = "subscription")]
    Subscription,
    #[serde(rename = "cleanup_categories")]
    CleanupCategories,
    #[serde(rename = "scenario_simulation")]
    ScenarioSimulation(ScenarioIntent),
    #[serde(rename = "chart")]
    Chart(ChartIntent),
    #[serde(rename = "action-card")]
    ActionCard(ActionCardIntent),
    #[serde(rename = "health_score")]
    HealthScore,
    #[serde(rename = "greeting")]
    Greeting(MessageIntent),
    #[serde(rename = "unknown")]
    Unknown(MessageIntent),
}

impl Intent {
    /// Wire name of the variant
    pub fn type_name(&self) -> &'static str {
        match self {
            Intent::Transaction(_) => "transaction",
            Intent::Reminder(_) => "reminder",
            Intent::Query(_) => "query",
            Intent::Edit(_) => "edit",
            Intent::Delete(_) => "delete",
            Intent::Insight(_) => "insight",
            Intent::BudgetCheck(_) => "budget_check",
            Intent::BudgetSet(_) => "budget_set",
            Intent::Subscription => "subscription",
            Intent::CleanupCategories => "cleanup_categories",
            Intent::ScenarioSimulation(_) => "scenario_simulation",
            Intent::Chart(_) => "chart",
            Intent::ActionCard(_) => "action-card",
            Intent::HealthScore => "health_score",
            Intent::Greeting(_) => "greeting",
            Intent::Unknown(_) => "unknown",
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Intent::Unknown(MessageIntent {
            message: Some(message.into()),
        })
    }
}

/// Classifier output: the intent plus suggested follow-up prompts
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedIntent {
    pub intent: Intent,
    pub next_prompts: Vec<String>,
}

impl ClassifiedIntent {
    pub fn new(intent: Intent) -> Self {
        Self {
            intent,
            next_prompts: Vec::new(),
        }
    }
}

/// Staged transaction, also the smart-input extraction result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub transaction_type: TransactionType,
    #[serde(default, deserialize_with = "de::amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub tags: Vec<String>,
}

/// Staged reminder, also the smart-input extraction result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDraft {
    #[serde(default, deserialize_with = "de::optional_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "de::amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub transaction_type: TransactionType,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub recurrence: Recurrence,
    #[serde(default, deserialize_with = "de::string_list")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryEntity {
    #[default]
    Transaction,
    Reminder,
}

impl QueryEntity {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryEntity::Transaction => "transaction",
            QueryEntity::Reminder => "reminder",
        }
    }
}

impl FromStr for QueryEntity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transaction" | "transactions" => Ok(QueryEntity::Transaction),
            "reminder" | "reminders" => Ok(QueryEntity::Reminder),
            _ => Err(format!("Unknown query entity: {}", s)),
        }
    }
}

/// Aggregation applied to the filtered records
///
/// Anything unrecognised (including "compare") is treated as `List`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryOperation {
    Sum,
    Count,
    #[default]
    List,
    Average,
    Breakdown,
}

impl QueryOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryOperation::Sum => "sum",
            QueryOperation::Count => "count",
            QueryOperation::List => "list",
            QueryOperation::Average => "average",
            QueryOperation::Breakdown => "breakdown",
        }
    }
}

impl fmt::Display for QueryOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for QueryOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sum" | "total" => Ok(QueryOperation::Sum),
            "count" => Ok(QueryOperation::Count),
            "list" => Ok(QueryOperation::List),
            "average" | "avg" => Ok(QueryOperation::Average),
            "breakdown" => Ok(QueryOperation::Breakdown),
            _ => Err(format!("Unknown query operation: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilters {
    /// "income" / "expense" (reminders map these to collect / pay)
    #[serde(rename = "type", default, deserialize_with = "de::optional_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub search: Option<String>,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryIntent {
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub entity: QueryEntity,
    #[serde(default, deserialize_with = "de::null_default")]
    pub filters: QueryFilters,
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub operation: QueryOperation,
    /// Breakdown grouping: "date" groups by day, anything else by category
    #[serde(default, deserialize_with = "de::optional_string")]
    pub field: Option<String>,
    #[serde(default, deserialize_with = "de::optional_amount")]
    pub limit: Option<f64>,
}

impl QueryIntent {
    /// Requested row limit for list results
    pub fn limit_or(&self, default: usize) -> usize {
        match self.limit {
            Some(n) if n >= 1.0 => n as usize,
            _ => default,
        }
    }

    pub fn groups_by_date(&self) -> bool {
        self.field.as_deref() == Some("date")
    }
}

/// What an edit or delete refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Target {
    #[default]
    Transaction,
    Reminder,
    /// The record most recently acted on in this session
    Last,
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "transaction" => Ok(Target::Transaction),
            "reminder" => Ok(Target::Reminder),
            "last" | "previous" | "recent" => Ok(Target::Last),
            _ => Err(format!("Unknown target: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    #[serde(default, deserialize_with = "de::optional_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::optional_amount")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditIntent {
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub target: Target,
    #[serde(default, deserialize_with = "de::null_default")]
    pub search_criteria: SearchCriteria,
    #[serde(default, deserialize_with = "de::null_default")]
    pub changes: RecordChanges,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteIntent {
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub target: Target,
    #[serde(default, deserialize_with = "de::null_default")]
    pub search_criteria: SearchCriteria,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightIntent {
    #[serde(default, deserialize_with = "de::optional_string")]
    pub focus: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetCheckIntent {
    #[serde(default, deserialize_with = "de::optional_string")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetSetIntent {
    #[serde(default, deserialize_with = "de::string")]
    pub category: String,
    #[serde(default, deserialize_with = "de::amount")]
    pub limit: f64,
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub period: BudgetPeriod,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenarioIntent {
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub scenario_type: ScenarioType,
    #[serde(default, deserialize_with = "de::amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    #[serde(default, deserialize_with = "de::string")]
    pub name: String,
    #[serde(default, deserialize_with = "de::amount")]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartIntent {
    #[serde(default, deserialize_with = "de::string")]
    pub title: String,
    #[serde(default, deserialize_with = "de::null_default")]
    pub chart_data: Vec<ChartPoint>,
}

/// What confirming an action card creates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardAction {
    #[default]
    LogTransaction,
    LogReminder,
}

impl FromStr for CardAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "log_transaction" => Ok(CardAction::LogTransaction),
            "log_reminder" => Ok(CardAction::LogReminder),
            _ => Err(format!("Unknown card action: {}", s)),
        }
    }
}

/// Record data carried by an action card
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionPayload {
    #[serde(default, deserialize_with = "de::amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "de::optional_date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub recurrence: Recurrence,
    #[serde(default, deserialize_with = "de::string_list")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCardIntent {
    #[serde(default, deserialize_with = "de::string")]
    pub title: String,
    #[serde(default, deserialize_with = "de::string")]
    pub description: String,
    #[serde(default, deserialize_with = "de::amount")]
    pub amount: f64,
    /// "income", "expense" or "neutral"
    #[serde(default, deserialize_with = "de::optional_string")]
    pub action_type: Option<String>,
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub action: CardAction,
    #[serde(default, deserialize_with = "de::null_default")]
    pub payload: ActionPayload,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub confirm_text: Option<String>,
    #[serde(default, deserialize_with = "de::optional_string")]
    pub cancel_text: Option<String>,
}

impl ActionCardIntent {
    /// Direction of money for the record this card creates
    pub fn transaction_type(&self) -> TransactionType {
        self.action_type
            .as_deref()
            .and_then(|t| t.parse().ok())
            .unwrap_or_default()
    }
}

/// Free-text reply for greeting and unknown intents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MessageIntent {
    #[serde(default, deserialize_with = "de::optional_string")]
    pub message: Option<String>,
}

/// Speaker of a history turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One entry of the rolling conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurn {
    pub role: TurnRole,
    pub content: String,
}

impl HistoryTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// Data summary sent along with each classification
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierContext {
    /// Most recent transactions, newest first as supplied by the host
    pub recent: Vec<Transaction>,
    /// Distinct categories across the snapshot
    pub categories: Vec<String>,
}

/// One classification call
#[derive(Debug, Clone)]
pub struct ClassifierRequest {
    pub text: String,
    /// Prior turns, oldest first; the current text is not included
    pub history: Vec<HistoryTurn>,
    pub context: ClassifierContext,
    /// Local IST time used to resolve relative dates
    pub now: DateTime<FixedOffset>,
}

/// Transaction sent for category suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorizationItem {
    pub id: String,
    pub description: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySuggestion {
    #[serde(deserialize_with = "de::string")]
    pub id: String,
    #[serde(deserialize_with = "de::string")]
    pub category: String,
}

/// Categories the model may choose from when suggesting
pub const SUGGESTED_CATEGORIES: [&str; 10] = [
    "Food",
    "Transport",
    "Utilities",
    "Entertainment",
    "Health",
    "Shopping",
    "Housing",
    "Education",
    "Personal",
    "Savings",
];
