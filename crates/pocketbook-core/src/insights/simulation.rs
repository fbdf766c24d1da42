//! "Can I afford it?" scenario simulation
//!
//! The model is deliberately flat: a three-month trailing average of income
//! and expense, adjusted by the full amount of every pending reminder, and an
//! all-time income minus expense balance. No compounding, no time weighting.

use chrono::{Months, NaiveDate};

use super::types::{Scenario, ScenarioType, SimulationResult};
use crate::format::{format_inr, format_inr_whole};
use crate::models::{Reminder, ReminderType, Transaction};

/// Monthly cash-flow inputs behind a simulation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CashFlow {
    pub avg_income: f64,
    pub avg_expense: f64,
    pub pending_pay: f64,
    pub pending_collect: f64,
    pub estimated_balance: f64,
}

impl CashFlow {
    pub fn compute(transactions: &[Transaction], reminders: &[Reminder], today: NaiveDate) -> Self {
        let since = today.checked_sub_months(Months::new(3)).unwrap_or(today);

        let (mut recent_income, mut recent_expense) = (0.0, 0.0);
        let (mut total_income, mut total_expense) = (0.0, 0.0);
        for tx in transactions {
            let amount = tx.amount();
            let recent = tx.local_date() >= since;
            if tx.is_income() {
                total_income += amount;
                if recent {
                    recent_income += amount;
                }
            } else {
                total_expense += amount;
                if recent {
                    recent_expense += amount;
                }
            }
        }

        let (mut pending_pay, mut pending_collect) = (0.0, 0.0);
        for r in reminders.iter().filter(|r| !r.completed) {
            match r.kind {
                ReminderType::Pay => pending_pay += r.amount(),
                ReminderType::Collect => pending_collect += r.amount(),
            }
        }

        Self {
            avg_income: recent_income / 3.0,
            avg_expense: recent_expense / 3.0,
            pending_pay,
            pending_collect,
            estimated_balance: total_income - total_expense,
        }
    }

    /// Projected monthly savings after upcoming bills and collections
    pub fn adjusted_monthly_net(&self) -> f64 {
        (self.avg_income + self.pending_collect) - (self.avg_expense + self.pending_pay)
    }
}

/// Project the effect of a purchase or new recurring cost
pub fn simulate_financial_scenario(
    transactions: &[Transaction],
    scenario: &Scenario,
    reminders: &[Reminder],
    today: NaiveDate,
) -> SimulationResult {
    let flow = CashFlow::compute(transactions, reminders, today);
    simulate_with_cash_flow(&flow, scenario)
}

pub fn simulate_with_cash_flow(flow: &CashFlow, scenario: &Scenario) -> SimulationResult {
    let amount = crate::de::sanitize(scenario.amount);
    let net = flow.adjusted_monthly_net();

    match scenario.kind {
        ScenarioType::OneTime => {
            let remaining = flow.estimated_balance - amount;
            let can_afford = remaining >= 0.0;
            let mut time_to_recover = None;

            let message = if !can_afford {
                format!(
                    "This purchase would put your balance in the negative by {}. It's best to save up first.",
                    format_inr(remaining.abs(), 2)
                )
            } else if net > 0.0 {
                let months = (amount / net).ceil().max(0.0) as u32;
                time_to_recover = Some(months);
                format!(
                    "You can afford this! Based on your current run-rate (adjusting for upcoming bills), it will take about {} month{} to recover this amount into your savings.",
                    months,
                    if months == 1 { "" } else { "s" }
                )
            } else {
                "You have enough funds now, but your upcoming bills and recent spending indicate a negative cash flow. Recovering this amount might be hard.".to_string()
            };

            SimulationResult {
                can_afford,
                remaining_savings: remaining,
                time_to_recover,
                yearly_impact: amount,
                message,
            }
        }
        ScenarioType::Recurring => {
            let new_net = net - amount;
            let can_afford = new_net >= 0.0;
            let message = if can_afford {
                format!(
                    "You can fit this into your monthly budget. Accounting for upcoming bills, your estimated monthly savings will reduce to roughly {}.",
                    format_inr_whole(new_net)
                )
            } else {
                format!(
                    "Careful! This recurring expense exceeds your average monthly savings margin. You'd be overspending by {} monthly.",
                    format_inr_whole(new_net.abs())
                )
            };

            SimulationResult {
                can_afford,
                remaining_savings: flow.estimated_balance,
                time_to_recover: None,
                yearly_impact: amount * 12.0,
                message,
            }
        }
    }
}
