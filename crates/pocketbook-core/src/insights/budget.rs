//! Budget utilisation for the current month

use chrono::NaiveDate;

use super::engine::in_range;
use super::types::{BudgetState, BudgetStatus};
use crate::models::{Budget, Transaction};
use crate::time;

/// Compare this month's expenses with each budget
///
/// Categories match case-insensitively. Weekly budgets are still measured
/// against the calendar month containing `today`.
pub fn analyze_budget_status(
    budgets: &[Budget],
    transactions: &[Transaction],
    today: NaiveDate,
) -> Vec<BudgetStatus> {
    let month = time::month_bounds(today);

    budgets
        .iter()
        .map(|budget| {
            let category = budget.category.to_lowercase();
            let spent: f64 = transactions
                .iter()
                .filter(|t| {
                    t.is_expense()
                        && in_range(t, month)
                        && t.category.to_lowercase() == category
                })
                .map(Transaction::amount)
                .sum();

            let limit = crate::de::sanitize(budget.limit);
            let percentage = if limit > 0.0 {
                spent / limit * 100.0
            } else {
                0.0
            };

            BudgetStatus {
                category: budget.category.clone(),
                limit,
                spent,
                percentage,
                status: BudgetState::from_percentage(percentage),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetPeriod, TransactionType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn expense(category: &str, amount: f64, on: NaiveDate) -> Transaction {
        Transaction {
            id: format!("{}-{}", category, amount),
            amount,
            kind: TransactionType::Expense,
            category: category.into(),
            description: String::new(),
            date: time::ist_midnight(on),
            tags: vec![],
        }
    }

    #[test]
    fn test_states_by_percentage() {
        let today = date(2024, 3, 20);
        let budgets = vec![
            Budget::new("food", 1000.0, BudgetPeriod::Monthly),
            Budget::new("Travel", 1000.0, BudgetPeriod::Monthly),
            Budget::new("Shopping", 1000.0, BudgetPeriod::Weekly),
        ];
        let txs = vec![
            expense("Food", 1000.0, date(2024, 3, 2)),
            expense("Travel", 800.0, date(2024, 3, 3)),
            expense("Shopping", 200.0, date(2024, 3, 4)),
            // Last month does not count
            expense("Shopping", 5000.0, date(2024, 2, 4)),
        ];

        let statuses = analyze_budget_status(&budgets, &txs, today);
        assert_eq!(statuses[0].status, BudgetState::Over);
        assert_eq!(statuses[0].category, "food");
        assert_eq!(statuses[1].status, BudgetState::Warning);
        assert_eq!(statuses[2].status, BudgetState::Safe);
        assert_eq!(statuses[2].spent, 200.0);
        assert_eq!(statuses[2].percentage, 20.0);
    }

    #[test]
    fn test_zero_limit_is_zero_percent() {
        let statuses = analyze_budget_status(
            &[Budget::new("Food", 0.0, BudgetPeriod::Monthly)],
            &[expense("Food", 50.0, date(2024, 3, 1))],
            date(2024, 3, 5),
        );
        assert_eq!(statuses[0].percentage, 0.0);
        assert_eq!(statuses[0].status, BudgetState::Safe);
    }
}
