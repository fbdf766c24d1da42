//! Domain models for PocketBook
//!
//! These mirror the records the host's document store holds. The core never
//! persists them; it receives a [`FinancialSnapshot`] per computation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::de;
use crate::time;

/// Category used when a record has none
pub const DEFAULT_CATEGORY: &str = "Other";

/// Direction of money for a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    #[default]
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A logged income or expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(default, deserialize_with = "de::amount")]
    pub amount: f64,
    #[serde(rename = "type", default)]
    pub kind: TransactionType,
    #[serde(default = "default_category", deserialize_with = "de::string")]
    pub category: String,
    #[serde(default, deserialize_with = "de::string")]
    pub description: String,
    #[serde(with = "de::timestamp")]
    pub date: DateTime<Utc>,
    #[serde(default, deserialize_with = "de::string_list")]
    pub tags: Vec<String>,
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

impl Transaction {
    /// Amount safe for aggregation (never NaN or infinite)
    pub fn amount(&self) -> f64 {
        de::sanitize(self.amount)
    }

    /// Category, with blanks reported as "Other"
    pub fn category(&self) -> &str {
        if self.category.trim().is_empty() {
            DEFAULT_CATEGORY
        } else {
            &self.category
        }
    }

    /// Whether the category is missing or the catch-all
    pub fn is_uncategorized(&self) -> bool {
        self.category() == DEFAULT_CATEGORY
    }

    /// Calendar date in IST
    pub fn local_date(&self) -> NaiveDate {
        time::ist_date(&self.date)
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }
}

/// Whether a reminder is a bill to pay or money to collect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderType {
    #[default]
    Pay,
    Collect,
}

impl ReminderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pay => "pay",
            Self::Collect => "collect",
        }
    }

    /// Collecting is income, paying is an expense
    pub fn transaction_type(&self) -> TransactionType {
        match self {
            Self::Pay => TransactionType::Expense,
            Self::Collect => TransactionType::Income,
        }
    }
}

impl From<TransactionType> for ReminderType {
    fn from(kind: TransactionType) -> Self {
        match kind {
            TransactionType::Income => Self::Collect,
            TransactionType::Expense => Self::Pay,
        }
    }
}

/// How often a reminder repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn is_recurring(&self) -> bool {
        *self != Self::None
    }
}

impl std::str::FromStr for Recurrence {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" | "annual" | "annually" => Ok(Self::Yearly),
            _ => Err(format!("Unknown recurrence: {}", s)),
        }
    }
}

/// A bill reminder or expected collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    #[serde(default, deserialize_with = "de::string")]
    pub title: String,
    #[serde(default, deserialize_with = "de::amount")]
    pub amount: f64,
    #[serde(rename = "type", default)]
    pub kind: ReminderType,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub recurrence: Recurrence,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "de::string_list")]
    pub tags: Vec<String>,
}

impl Reminder {
    pub fn amount(&self) -> f64 {
        de::sanitize(self.amount)
    }

    /// Incomplete and due strictly before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.date < today
    }
}

/// Budget period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetPeriod {
    #[default]
    Monthly,
    Weekly,
}

impl BudgetPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
        }
    }
}

impl std::str::FromStr for BudgetPeriod {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "monthly" | "month" => Ok(Self::Monthly),
            "weekly" | "week" => Ok(Self::Weekly),
            _ => Err(format!("Unknown budget period: {}", s)),
        }
    }
}

/// Spending limit for one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "de::string")]
    pub category: String,
    #[serde(default, deserialize_with = "de::amount")]
    pub limit: f64,
    #[serde(default, deserialize_with = "de::parse_or_default")]
    pub period: BudgetPeriod,
}

impl Budget {
    pub fn new(category: impl Into<String>, limit: f64, period: BudgetPeriod) -> Self {
        Self {
            id: None,
            category: category.into(),
            limit,
            period,
        }
    }

    /// Stable document id derived from the category ("Eating Out" -> "eating-out")
    pub fn document_id(&self) -> String {
        self.id.clone().unwrap_or_else(|| {
            self.category
                .to_lowercase()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join("-")
        })
    }
}

/// A transaction to be created through the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewTransaction {
    /// Materialize with an id assigned by the store
    pub fn into_transaction(self, id: impl Into<String>) -> Transaction {
        Transaction {
            id: id.into(),
            amount: self.amount,
            kind: self.kind,
            category: self.category,
            description: self.description,
            date: time::ist_midnight(self.date),
            tags: self.tags,
        }
    }
}

/// A reminder to be created through the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReminder {
    pub title: String,
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: ReminderType,
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    pub recurrence: Recurrence,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewReminder {
    pub fn into_reminder(self, id: impl Into<String>) -> Reminder {
        Reminder {
            id: id.into(),
            title: self.title,
            amount: self.amount,
            kind: self.kind,
            date: self.date,
            time: self.time,
            recurrence: self.recurrence,
            completed: self.completed,
            tags: self.tags,
        }
    }
}

/// Partial update applied to a transaction or reminder
///
/// `description` renames a transaction; `title` renames a reminder. When only
/// one is supplied it is applied to whichever record kind is being edited.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordChanges {
    #[serde(
        default,
        deserialize_with = "de::optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub amount: Option<f64>,
    #[serde(
        default,
        deserialize_with = "de::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<String>,
    #[serde(
        default,
        deserialize_with = "de::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "de::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,
    #[serde(
        default,
        deserialize_with = "de::optional_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl RecordChanges {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Only a category change (category cleanup)
    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Self::default()
        }
    }

    /// Only a completion flag change
    pub fn completed(completed: bool) -> Self {
        Self {
            completed: Some(completed),
            ..Self::default()
        }
    }

    pub fn apply_to_transaction(&self, tx: &mut Transaction) {
        if let Some(amount) = self.amount {
            tx.amount = de::sanitize(amount);
        }
        if let Some(description) = self.description.as_ref().or(self.title.as_ref()) {
            tx.description = description.clone();
        }
        if let Some(ref category) = self.category {
            tx.category = category.clone();
        }
        if let Some(date) = self.date {
            tx.date = time::ist_midnight(date);
        }
        if let Some(ref tags) = self.tags {
            tx.tags = tags.clone();
        }
    }

    pub fn apply_to_reminder(&self, reminder: &mut Reminder) {
        if let Some(amount) = self.amount {
            reminder.amount = de::sanitize(amount);
        }
        if let Some(title) = self.title.as_ref().or(self.description.as_ref()) {
            reminder.title = title.clone();
        }
        if let Some(date) = self.date {
            reminder.date = date;
        }
        if let Some(ref tags) = self.tags {
            reminder.tags = tags.clone();
        }
        if let Some(completed) = self.completed {
            reminder.completed = completed;
        }
    }
}

/// Which collection a record lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Transaction,
    Reminder,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::Reminder => "reminder",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Either kind of stored record, serialized as the record itself
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Transaction(Transaction),
    Reminder(Reminder),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Record::Transaction(_) => RecordKind::Transaction,
            Record::Reminder(_) => RecordKind::Reminder,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Transaction(t) => &t.id,
            Record::Reminder(r) => &r.id,
        }
    }

    pub fn amount(&self) -> f64 {
        match self {
            Record::Transaction(t) => t.amount(),
            Record::Reminder(r) => r.amount(),
        }
    }

    /// Calendar date in IST (reminders carry a plain date)
    pub fn date(&self) -> NaiveDate {
        match self {
            Record::Transaction(t) => t.local_date(),
            Record::Reminder(r) => r.date,
        }
    }

    /// Description of a transaction, title of a reminder
    pub fn label(&self) -> &str {
        match self {
            Record::Transaction(t) => &t.description,
            Record::Reminder(r) => &r.title,
        }
    }
}

/// In-memory copy of the user's records handed to the core by the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSnapshot {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
    #[serde(default)]
    pub budgets: Vec<Budget>,
}

impl FinancialSnapshot {
    pub fn new(
        transactions: Vec<Transaction>,
        reminders: Vec<Reminder>,
        budgets: Vec<Budget>,
    ) -> Self {
        Self {
            transactions,
            reminders,
            budgets,
        }
    }

    pub fn transaction(&self, id: &str) -> Option<&Transaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    pub fn reminder(&self, id: &str) -> Option<&Reminder> {
        self.reminders.iter().find(|r| r.id == id)
    }

    /// Distinct non-empty categories, in first-seen order
    pub fn categories(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for tx in &self.transactions {
            let cat = tx.category.trim();
            if !cat.is_empty() && !seen.iter().any(|c| c == cat) {
                seen.push(cat.to_string());
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transaction_defaults() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": "t1",
            "type": "expense",
            "date": "2024-03-01"
        }))
        .unwrap();
        assert_eq!(tx.amount, 0.0);
        assert_eq!(tx.category(), "Other");
        assert!(tx.is_uncategorized());
        assert_eq!(tx.local_date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn test_transaction_null_fields() {
        let tx: Transaction = serde_json::from_value(json!({
            "id": "t1",
            "amount": "abc",
            "type": "income",
            "category": null,
            "description": null,
            "date": "2024-03-01T10:00:00+05:30",
            "tags": null
        }))
        .unwrap();
        assert_eq!(tx.amount(), 0.0);
        assert_eq!(tx.category(), "Other");
        assert!(tx.description.is_empty());
        assert!(tx.is_income());
    }

    #[test]
    fn test_nan_amount_is_sanitized() {
        let mut tx: Transaction = serde_json::from_value(json!({
            "id": "t1", "amount": 5, "type": "expense", "date": "2024-03-01"
        }))
        .unwrap();
        tx.amount = f64::NAN;
        assert_eq!(tx.amount(), 0.0);
    }

    #[test]
    fn test_unknown_recurrence_is_none() {
        let r: Reminder = serde_json::from_value(json!({
            "id": "r1",
            "title": "Rent",
            "amount": 1000,
            "type": "pay",
            "date": "2024-01-15",
            "recurrence": "fortnightly"
        }))
        .unwrap();
        assert_eq!(r.recurrence, Recurrence::None);
        assert!(!r.completed);
    }

    #[test]
    fn test_recurrence_parses_case_insensitively() {
        let r: Reminder = serde_json::from_value(json!({
            "id": "r1", "title": "Rent", "type": "pay",
            "date": "2024-01-15", "recurrence": "Monthly"
        }))
        .unwrap();
        assert_eq!(r.recurrence, Recurrence::Monthly);
        assert_eq!(serde_json::to_value(&r).unwrap()["recurrence"], "monthly");

        let r: Reminder = serde_json::from_value(json!({
            "id": "r2", "title": "Gym", "date": "2024-01-15", "recurrence": null
        }))
        .unwrap();
        assert_eq!(r.recurrence, Recurrence::None);
    }

    #[test]
    fn test_unknown_budget_period_is_monthly() {
        let budget: Budget = serde_json::from_value(json!({
            "category": "Food", "limit": 5000, "period": "quarterly"
        }))
        .unwrap();
        assert_eq!(budget.period, BudgetPeriod::Monthly);

        let budget: Budget = serde_json::from_value(json!({
            "category": "Food", "limit": 500, "period": "weekly"
        }))
        .unwrap();
        assert_eq!(budget.period, BudgetPeriod::Weekly);
        assert_eq!(serde_json::to_value(&budget).unwrap()["period"], "weekly");
    }

    #[test]
    fn test_reminder_overdue() {
        let r = Reminder {
            id: "r1".into(),
            title: "Rent".into(),
            amount: 1000.0,
            kind: ReminderType::Pay,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            time: None,
            recurrence: Recurrence::None,
            completed: false,
            tags: vec![],
        };
        assert!(r.is_overdue(NaiveDate::from_ymd_opt(2024, 1, 16).unwrap()));
        assert!(!r.is_overdue(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
    }

    #[test]
    fn test_budget_document_id() {
        let budget = Budget::new("Eating Out", 5000.0, BudgetPeriod::Monthly);
        assert_eq!(budget.document_id(), "eating-out");
    }

    #[test]
    fn test_changes_apply_to_reminder_uses_description_as_title() {
        let mut r = Reminder {
            id: "r1".into(),
            title: "Rent".into(),
            amount: 1000.0,
            kind: ReminderType::Pay,
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            time: None,
            recurrence: Recurrence::Monthly,
            completed: false,
            tags: vec![],
        };
        let changes = RecordChanges {
            description: Some("House rent".into()),
            amount: Some(1200.0),
            ..RecordChanges::default()
        };
        changes.apply_to_reminder(&mut r);
        assert_eq!(r.title, "House rent");
        assert_eq!(r.amount, 1200.0);
    }

    #[test]
    fn test_snapshot_categories_distinct() {
        let snapshot: FinancialSnapshot = serde_json::from_value(json!({
            "transactions": [
                {"id": "1", "amount": 1, "type": "expense", "category": "Food", "date": "2024-01-01"},
                {"id": "2", "amount": 1, "type": "expense", "category": "Food", "date": "2024-01-02"},
                {"id": "3", "amount": 1, "type": "expense", "category": "", "date": "2024-01-03"},
                {"id": "4", "amount": 1, "type": "income", "category": "Salary", "date": "2024-01-04"}
            ]
        }))
        .unwrap();
        assert_eq!(snapshot.categories(), vec!["Food", "Salary"]);
    }
}
