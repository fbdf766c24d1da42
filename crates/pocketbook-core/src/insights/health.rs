//! Composite financial health score
//!
//! Three factors: savings (40 points), budget adherence (30) and bill
//! timeliness (30). Each is scored independently and floored at zero.

use chrono::NaiveDate;

use super::budget::analyze_budget_status;
use super::engine::totals_between;
use super::types::{BudgetState, HealthFactor, HealthFactors, HealthScore, HealthStatus};
use crate::models::{Budget, Reminder, Transaction};
use crate::time;

pub const SAVINGS_IMPACT: u32 = 40;
pub const BUDGET_IMPACT: u32 = 30;
pub const BILLS_IMPACT: u32 = 30;

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}

fn savings_factor(transactions: &[Transaction], today: NaiveDate) -> HealthFactor {
    let totals = totals_between(transactions, time::month_bounds(today));

    let (score, message) = match totals.savings_rate() {
        Some(rate) if rate >= 20.0 => (40, "Excellent savings rate (>20%)."),
        Some(rate) if rate >= 10.0 => (30, "Good savings rate (10-20%)."),
        Some(rate) if rate > 0.0 => (20, "Positive savings, but aiming for 20% is ideal."),
        Some(_) => (0, "Spending exceeds income this month."),
        None if totals.expense > 0.0 => (0, "Spending recorded with no income yet."),
        None => (20, "No activity this month yet."),
    };

    HealthFactor {
        score,
        impact: SAVINGS_IMPACT,
        message: message.to_string(),
    }
}

fn budget_factor(budgets: &[Budget], transactions: &[Transaction], today: NaiveDate) -> HealthFactor {
    if budgets.is_empty() {
        return HealthFactor {
            score: BUDGET_IMPACT,
            impact: BUDGET_IMPACT,
            message: "No budgets set.".to_string(),
        };
    }

    let statuses = analyze_budget_status(budgets, transactions, today);
    let over = statuses.iter().filter(|s| s.status == BudgetState::Over).count();
    let warning = statuses
        .iter()
        .filter(|s| s.status == BudgetState::Warning)
        .count();

    // Over and warning penalties stack; the message names the worse state
    let penalty = (over * 10 + warning * 5) as u32;
    let message = if over > 0 {
        format!("Over budget in {}.", plural(over, "category", "categories"))
    } else if warning > 0 {
        format!("{} nearing limit.", plural(warning, "category", "categories"))
    } else {
        "All budgets are on track.".to_string()
    };

    HealthFactor {
        score: BUDGET_IMPACT.saturating_sub(penalty),
        impact: BUDGET_IMPACT,
        message,
    }
}

fn bills_factor(reminders: &[Reminder], today: NaiveDate) -> HealthFactor {
    let overdue = reminders.iter().filter(|r| r.is_overdue(today)).count();
    if overdue == 0 {
        return HealthFactor {
            score: BILLS_IMPACT,
            impact: BILLS_IMPACT,
            message: "No overdue bills.".to_string(),
        };
    }

    HealthFactor {
        score: BILLS_IMPACT.saturating_sub((overdue * 10) as u32),
        impact: BILLS_IMPACT,
        message: format!(
            "You have {} overdue {}.",
            overdue,
            if overdue == 1 { "bill" } else { "bills" }
        ),
    }
}

/// Score overall financial health on a 0-100 scale
pub fn calculate_health_score(
    transactions: &[Transaction],
    budgets: &[Budget],
    reminders: &[Reminder],
    today: NaiveDate,
) -> HealthScore {
    let savings = savings_factor(transactions, today);
    let budget = budget_factor(budgets, transactions, today);
    let bills = bills_factor(reminders, today);

    let score = (savings.score + budget.score + bills.score).min(100);

    HealthScore {
        score,
        status: HealthStatus::from_score(score),
        factors: HealthFactors {
            savings,
            budget,
            bills,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetPeriod, Recurrence, ReminderType, TransactionType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(kind: TransactionType, category: &str, amount: f64, on: NaiveDate) -> Transaction {
        Transaction {
            id: format!("{}-{}", category, amount),
            amount,
            kind,
            category: category.into(),
            description: String::new(),
            date: time::ist_midnight(on),
            tags: vec![],
        }
    }

    fn bill(due: NaiveDate, completed: bool) -> Reminder {
        Reminder {
            id: format!("bill-{}", due),
            title: "Electricity".into(),
            amount: 1000.0,
            kind: ReminderType::Pay,
            date: due,
            time: None,
            recurrence: Recurrence::None,
            completed,
            tags: vec![],
        }
    }

    #[test]
    fn test_one_overdue_bill_costs_ten_points() {
        let today = date(2024, 3, 20);
        let health = calculate_health_score(&[], &[], &[bill(date(2024, 3, 18), false)], today);

        assert_eq!(health.factors.bills.score, 20);
        assert_eq!(health.factors.bills.message, "You have 1 overdue bill.");
        assert_eq!(health.factors.budget.score, 30);
        assert_eq!(health.factors.budget.message, "No budgets set.");
        assert_eq!(health.factors.savings.score, 20);
        assert_eq!(health.factors.savings.message, "No activity this month yet.");
        assert_eq!(health.score, 70);
        assert_eq!(health.status, HealthStatus::Good);
    }

    #[test]
    fn test_due_today_and_completed_not_overdue() {
        let today = date(2024, 3, 20);
        let health = calculate_health_score(
            &[],
            &[],
            &[bill(today, false), bill(date(2024, 3, 1), true)],
            today,
        );
        assert_eq!(health.factors.bills.score, 30);
        assert_eq!(health.factors.bills.message, "No overdue bills.");
    }

    #[test]
    fn test_bills_floor_at_zero() {
        let today = date(2024, 3, 20);
        let reminders: Vec<_> = (1..=5).map(|d| bill(date(2024, 3, d), false)).collect();
        let health = calculate_health_score(&[], &[], &reminders, today);
        assert_eq!(health.factors.bills.score, 0);
        assert_eq!(health.factors.bills.message, "You have 5 overdue bills.");
    }

    #[test]
    fn test_savings_tiers() {
        let today = date(2024, 3, 20);
        let cases = [
            (750.0, 40, "Excellent savings rate (>20%)."),
            (850.0, 30, "Good savings rate (10-20%)."),
            (950.0, 20, "Positive savings, but aiming for 20% is ideal."),
            (1200.0, 0, "Spending exceeds income this month."),
        ];
        for (spent, score, message) in cases {
            let txs = vec![
                tx(TransactionType::Income, "Salary", 1000.0, date(2024, 3, 1)),
                tx(TransactionType::Expense, "Food", spent, date(2024, 3, 2)),
            ];
            let health = calculate_health_score(&txs, &[], &[], today);
            assert_eq!(health.factors.savings.score, score, "spent {}", spent);
            assert_eq!(health.factors.savings.message, message);
        }

        let only_spend = vec![tx(TransactionType::Expense, "Food", 10.0, date(2024, 3, 2))];
        let health = calculate_health_score(&only_spend, &[], &[], today);
        assert_eq!(health.factors.savings.score, 0);
        assert_eq!(health.factors.savings.message, "Spending recorded with no income yet.");
    }

    #[test]
    fn test_budget_penalties() {
        let today = date(2024, 3, 20);
        let budgets = vec![
            Budget::new("Food", 100.0, BudgetPeriod::Monthly),
            Budget::new("Travel", 100.0, BudgetPeriod::Monthly),
            Budget::new("Fun", 100.0, BudgetPeriod::Monthly),
        ];
        let txs = vec![
            tx(TransactionType::Expense, "Food", 150.0, date(2024, 3, 2)),
            tx(TransactionType::Expense, "Travel", 85.0, date(2024, 3, 2)),
        ];
        let health = calculate_health_score(&txs, &budgets, &[], today);
        assert_eq!(health.factors.budget.score, 15);
        assert_eq!(health.factors.budget.message, "Over budget in 1 category.");

        let calm = vec![tx(TransactionType::Expense, "Travel", 85.0, date(2024, 3, 2))];
        let health = calculate_health_score(&calm, &budgets, &[], today);
        assert_eq!(health.factors.budget.score, 25);
        assert_eq!(health.factors.budget.message, "1 category nearing limit.");
    }

    #[test]
    fn test_status_boundaries() {
        assert_eq!(HealthStatus::from_score(100), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(80), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_score(79), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(60), HealthStatus::Good);
        assert_eq!(HealthStatus::from_score(59), HealthStatus::Fair);
        assert_eq!(HealthStatus::from_score(40), HealthStatus::Fair);
        assert_eq!(HealthStatus::from_score(39), HealthStatus::NeedsAttention);
        assert_eq!(HealthStatus::from_score(0), HealthStatus::NeedsAttention);
    }

    /// Salary of 1,00,000 with `rent` spent, plus `over` categories at 150%,
    /// `warning` categories at 85% and `overdue` unpaid bills
    fn scored(rent: f64, over: usize, warning: usize, overdue: usize) -> HealthScore {
        let today = date(2024, 3, 20);
        let mut txs = vec![
            tx(TransactionType::Income, "Salary", 100_000.0, date(2024, 3, 1)),
            tx(TransactionType::Expense, "Rent", rent, date(2024, 3, 2)),
        ];
        let mut budgets = Vec::new();
        for i in 0..over {
            let category = format!("Over{}", i);
            budgets.push(Budget::new(category.as_str(), 100.0, BudgetPeriod::Monthly));
            txs.push(tx(TransactionType::Expense, &category, 150.0, date(2024, 3, 3)));
        }
        for i in 0..warning {
            let category = format!("Warn{}", i);
            budgets.push(Budget::new(category.as_str(), 100.0, BudgetPeriod::Monthly));
            txs.push(tx(TransactionType::Expense, &category, 85.0, date(2024, 3, 3)));
        }
        let bills: Vec<_> = (1..=overdue as u32)
            .map(|d| bill(date(2024, 3, d), false))
            .collect();
        calculate_health_score(&txs, &budgets, &bills, today)
    }

    #[test]
    fn test_status_at_reachable_boundaries() {
        let cases = [
            ((10_000.0, 0, 0, 2), 80, HealthStatus::Excellent),
            ((10_000.0, 0, 1, 2), 75, HealthStatus::Good),
            ((10_000.0, 1, 0, 3), 60, HealthStatus::Good),
            ((10_000.0, 1, 1, 3), 55, HealthStatus::Fair),
            ((10_000.0, 2, 2, 3), 40, HealthStatus::Fair),
            ((85_000.0, 2, 1, 3), 35, HealthStatus::NeedsAttention),
        ];
        for ((rent, over, warning, overdue), score, status) in cases {
            let health = scored(rent, over, warning, overdue);
            assert_eq!(health.score, score, "over {} warning {} overdue {}", over, warning, overdue);
            assert_eq!(health.status, status, "score {}", score);
        }
    }

    #[test]
    fn test_combined_penalties_floor_at_zero() {
        let health = scored(120_000.0, 4, 3, 5);

        assert_eq!(health.factors.savings.score, 0);
        assert_eq!(health.factors.budget.score, 0);
        assert_eq!(health.factors.budget.message, "Over budget in 4 categories.");
        assert_eq!(health.factors.bills.score, 0);
        assert_eq!(health.factors.bills.message, "You have 5 overdue bills.");
        assert_eq!(health.score, 0);
        assert_eq!(health.status, HealthStatus::NeedsAttention);

        let health = scored(10_000.0, 0, 0, 0);
        assert_eq!(health.score, 100);
        assert_eq!(health.status, HealthStatus::Excellent);
    }

    #[test]
    fn test_score_within_bounds_for_garbage_amounts() {
        let today = date(2024, 3, 20);
        let mut txs = vec![
            tx(TransactionType::Income, "Salary", f64::NAN, date(2024, 3, 1)),
            tx(TransactionType::Expense, "Food", f64::INFINITY, date(2024, 3, 2)),
        ];
        txs.push(tx(TransactionType::Expense, "Food", 20.0, date(2024, 3, 3)));
        let budgets = vec![Budget::new("Food", f64::NAN, BudgetPeriod::Monthly)];
        let health = calculate_health_score(&txs, &budgets, &[], today);
        assert!(health.score <= 100);
        assert_eq!(health.factors.savings.message, "Spending recorded with no income yet.");
    }
}
