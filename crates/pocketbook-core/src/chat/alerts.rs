//! Proactive budget alert
//!
//! At most once per calendar day per session, a budget sitting between 90%
//! and 100% utilised triggers an unprompted warning.

use chrono::NaiveDate;

use crate::format::format_inr_whole;
use crate::insights::{BudgetStatus, Insight, InsightKind};

use super::message::{MessageBody, Reply};

/// Follow-up prompts attached to every budget alert
pub const ALERT_PROMPTS: [&str; 3] = ["How can I save money?", "Adjust budget", "Show spending details"];

/// Suppression state: the date an alert was last shown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BudgetAlertState {
    pub last_shown: Option<NaiveDate>,
}

impl BudgetAlertState {
    pub fn shown_on(&self, today: NaiveDate) -> bool {
        self.last_shown == Some(today)
    }

    pub fn mark_shown(&mut self, today: NaiveDate) {
        self.last_shown = Some(today);
    }
}

/// First budget at 90-99% utilisation
pub fn critical_budget(statuses: &[BudgetStatus]) -> Option<&BudgetStatus> {
    statuses
        .iter()
        .find(|b| b.percentage >= 90.0 && b.percentage < 100.0)
}

/// The warning message for a near-exhausted budget
pub fn budget_alert(status: &BudgetStatus) -> Reply {
    let remaining = status.remaining();
    let insight = Insight::new(
        InsightKind::Warning,
        "Budget Alert",
        format!(
            "You have only {} left for {}.",
            format_inr_whole(remaining),
            status.category
        ),
    )
    .with_value(remaining);

    Reply::widget(
        format!(
            "⚠️ Heads up! You've used {}% of your {} budget with plenty of month left.",
            status.percentage.round() as i64,
            status.category
        ),
        MessageBody::Insight {
            insights: vec![insight],
        },
    )
    .with_prompts(ALERT_PROMPTS.iter().map(|s| s.to_string()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::BudgetState;

    fn status(category: &str, spent: f64, limit: f64) -> BudgetStatus {
        let percentage = spent / limit * 100.0;
        BudgetStatus {
            category: category.into(),
            limit,
            spent,
            percentage,
            status: BudgetState::from_percentage(percentage),
        }
    }

    #[test]
    fn test_critical_window() {
        let statuses = vec![
            status("Food", 8000.0, 10000.0),
            status("Rent", 10000.0, 10000.0),
            status("Travel", 4600.0, 5000.0),
        ];
        assert_eq!(critical_budget(&statuses).unwrap().category, "Travel");
        assert!(critical_budget(&statuses[..2]).is_none());
    }

    #[test]
    fn test_alert_content() {
        let reply = budget_alert(&status("Food", 9200.0, 10000.0));
        assert_eq!(
            reply.content,
            "⚠️ Heads up! You've used 92% of your Food budget with plenty of month left."
        );
        match reply.body {
            MessageBody::Insight { insights } => {
                assert_eq!(insights[0].title, "Budget Alert");
                assert_eq!(insights[0].message, "You have only ₹800 left for Food.");
            }
            other => panic!("unexpected body {:?}", other),
        }
        assert_eq!(reply.next_prompts.len(), 3);
    }

    #[test]
    fn test_once_per_day() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 20).unwrap();
        let mut state = BudgetAlertState::default();
        assert!(!state.shown_on(today));
        state.mark_shown(today);
        assert!(state.shown_on(today));
        assert!(!state.shown_on(today.succ_opt().unwrap()));
    }
}
