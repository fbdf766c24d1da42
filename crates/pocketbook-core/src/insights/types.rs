//! Result types for the metrics engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tone of an insight card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Warning,
    Success,
    Info,
    Tip,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Warning => "warning",
            InsightKind::Success => "success",
            InsightKind::Info => "info",
            InsightKind::Tip => "tip",
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "warning" => Ok(InsightKind::Warning),
            "success" => Ok(InsightKind::Success),
            "info" => Ok(InsightKind::Info),
            "tip" => Ok(InsightKind::Tip),
            _ => Err(format!("Unknown insight kind: {}", s)),
        }
    }
}

/// One insight card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<f64>,
}

impl Insight {
    pub fn new(kind: InsightKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            value: None,
            change: None,
        }
    }

    pub fn with_value(mut self, value: f64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_change(mut self, change: f64) -> Self {
        self.change = Some(change);
        self
    }
}

/// Current month against the historical monthly average
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendStatus {
    High,
    Low,
}

impl TrendStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendStatus::High => "high",
            TrendStatus::Low => "low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub average: f64,
    pub current: f64,
    pub status: TrendStatus,
    pub difference: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionFrequency {
    Monthly,
    Yearly,
}

impl SubscriptionFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionFrequency::Monthly => "Monthly",
            SubscriptionFrequency::Yearly => "Yearly",
        }
    }
}

impl fmt::Display for SubscriptionFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recurring expense inferred from repeated description and amount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCandidate {
    pub name: String,
    pub amount: f64,
    pub frequency: SubscriptionFrequency,
    /// Mean gap between occurrences, rounded to whole days
    pub avg_gap: i64,
    pub next_due_date: NaiveDate,
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetState {
    Safe,
    Warning,
    Over,
}

impl BudgetState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetState::Safe => "safe",
            BudgetState::Warning => "warning",
            BudgetState::Over => "over",
        }
    }

    /// Classify a utilisation percentage
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 100.0 {
            BudgetState::Over
        } else if percentage >= 80.0 {
            BudgetState::Warning
        } else {
            BudgetState::Safe
        }
    }
}

/// This month's spend against one budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub category: String,
    pub limit: f64,
    pub spent: f64,
    pub percentage: f64,
    pub status: BudgetState,
}

impl BudgetStatus {
    pub fn remaining(&self) -> f64 {
        self.limit - self.spent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    #[default]
    OneTime,
    Recurring,
}

impl ScenarioType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioType::OneTime => "one_time",
            ScenarioType::Recurring => "recurring",
        }
    }
}

impl FromStr for ScenarioType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "one_time" | "one-time" | "onetime" => Ok(ScenarioType::OneTime),
            "recurring" | "monthly" => Ok(ScenarioType::Recurring),
            _ => Err(format!("Unknown scenario type: {}", s)),
        }
    }
}

/// A hypothetical purchase or commitment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(rename = "type")]
    pub kind: ScenarioType,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub can_afford: bool,
    pub remaining_savings: f64,
    /// Months to rebuild savings after a one-time purchase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_to_recover: Option<u32>,
    pub yearly_impact: f64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    #[serde(rename = "Needs Attention")]
    NeedsAttention,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "Excellent",
            HealthStatus::Good => "Good",
            HealthStatus::Fair => "Fair",
            HealthStatus::NeedsAttention => "Needs Attention",
        }
    }

    pub fn from_score(score: u32) -> Self {
        match score {
            80.. => HealthStatus::Excellent,
            60..=79 => HealthStatus::Good,
            40..=59 => HealthStatus::Fair,
            _ => HealthStatus::NeedsAttention,
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One scored component of the health score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthFactor {
    pub score: u32,
    /// Maximum points this factor can contribute
    pub impact: u32,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthFactors {
    pub savings: HealthFactor,
    pub budget: HealthFactor,
    pub bills: HealthFactor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    pub score: u32,
    pub status: HealthStatus,
    pub factors: HealthFactors,
}
