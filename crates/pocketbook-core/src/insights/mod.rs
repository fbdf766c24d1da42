//! Metrics Engine - pure financial analysis over a snapshot
//!
//! Every function here is side-effect free and takes the reference date (and,
//! where output is randomised, the RNG) explicitly, so results are
//! reproducible in tests.
//!
//! ## Functions
//!
//! - **generate_insights** - month-over-month cards plus a rotating tip
//! - **analyze_trends** - this month against the historical monthly average
//! - **detect_subscriptions** - recurring expenses by description and amount
//! - **analyze_budget_status** - per-category utilisation this month
//! - **simulate_financial_scenario** - affordability of a purchase or new cost
//! - **calculate_health_score** - 0-100 composite score
//! - **get_smart_suggestions** - contextual follow-up prompts
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pocketbook_core::insights::{calculate_health_score, generate_insights};
//!
//! let today = clock.today();
//! let health = calculate_health_score(&snap.transactions, &snap.budgets, &snap.reminders, today);
//! let cards = generate_insights(&snap.transactions, today, &mut rand::thread_rng());
//! ```

pub mod budget;
pub mod engine;
pub mod health;
pub mod simulation;
pub mod subscriptions;
pub mod suggestions;
pub mod types;

pub use budget::analyze_budget_status;
pub use engine::{analyze_trends, generate_insights, trend_insight, TIPS};
pub use health::calculate_health_score;
pub use simulation::{simulate_financial_scenario, simulate_with_cash_flow, CashFlow};
pub use subscriptions::detect_subscriptions;
pub use suggestions::get_smart_suggestions;
pub use types::{
    BudgetState, BudgetStatus, HealthFactor, HealthFactors, HealthScore, HealthStatus, Insight,
    InsightKind, Scenario, ScenarioType, SimulationResult, SubscriptionCandidate,
    SubscriptionFrequency, TrendAnalysis, TrendStatus,
};
