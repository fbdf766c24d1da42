//! Month-over-month insights and spending trends

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;

use super::types::{Insight, InsightKind, TrendAnalysis, TrendStatus};
use crate::format::format_inr;
use crate::models::Transaction;
use crate::time;

/// Rotating tips; exactly one is appended to every insight list
pub const TIPS: [&str; 5] = [
    "Try the 50/30/20 rule: 50% needs, 30% wants, 20% savings.",
    "Review subscriptions monthly to cut unused services.",
    "Set category budgets to stay on track.",
    "Use quick actions to log frequent expenses faster.",
    "Schedule reminders for recurring bills to avoid late fees.",
];

/// Income and expense totals for a period
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PeriodTotals {
    pub income: f64,
    pub expense: f64,
}

impl PeriodTotals {
    /// Savings rate in percent, `None` without income
    pub fn savings_rate(&self) -> Option<f64> {
        (self.income > 0.0).then(|| (self.income - self.expense) / self.income * 100.0)
    }
}

/// Whether a transaction's IST date falls in the inclusive range
pub(crate) fn in_range(tx: &Transaction, (start, end): (NaiveDate, NaiveDate)) -> bool {
    let d = tx.local_date();
    d >= start && d <= end
}

pub(crate) fn totals_between<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
    range: (NaiveDate, NaiveDate),
) -> PeriodTotals {
    transactions
        .into_iter()
        .filter(|t| in_range(t, range))
        .fold(PeriodTotals::default(), |mut acc, t| {
            if t.is_income() {
                acc.income += t.amount();
            } else {
                acc.expense += t.amount();
            }
            acc
        })
}

/// Whole-number percentage text
pub(crate) fn pct(value: f64) -> String {
    format!("{:.0}", value.round())
}

/// Generate insight cards for the month containing `today`
///
/// Fewer than three transactions yields a single "Getting Started" card.
/// Otherwise cards follow a fixed order: month-over-month spending, savings
/// rate, dominant category, then one tip picked with `rng`.
pub fn generate_insights<R: Rng + ?Sized>(
    transactions: &[Transaction],
    today: NaiveDate,
    rng: &mut R,
) -> Vec<Insight> {
    if transactions.len() < 3 {
        return vec![Insight::new(
            InsightKind::Info,
            "Getting Started",
            "Add more transactions to see personalized insights!",
        )];
    }

    let this_month = time::month_bounds(today);
    let this = totals_between(transactions, this_month);
    let last = totals_between(transactions, time::previous_month_bounds(today));

    let mut insights = Vec::new();

    if last.expense > 0.0 {
        let change = (this.expense - last.expense) / last.expense * 100.0;
        if change > 15.0 {
            insights.push(
                Insight::new(
                    InsightKind::Warning,
                    "Spending Up",
                    format!(
                        "You've spent {}% more this month compared to last month.",
                        pct(change.abs())
                    ),
                )
                .with_value(this.expense)
                .with_change(change),
            );
        } else if change < -10.0 {
            insights.push(
                Insight::new(
                    InsightKind::Success,
                    "Great Savings!",
                    format!(
                        "You've reduced spending by {}% compared to last month.",
                        pct(change.abs())
                    ),
                )
                .with_value(this.expense)
                .with_change(change),
            );
        }
    }

    if let Some(rate) = this.savings_rate() {
        if rate >= 20.0 {
            insights.push(
                Insight::new(
                    InsightKind::Success,
                    "Healthy Savings",
                    format!("You're saving {}% of your income this month!", pct(rate)),
                )
                .with_value(rate),
            );
        } else if (0.0..10.0).contains(&rate) {
            insights.push(
                Insight::new(
                    InsightKind::Warning,
                    "Low Savings",
                    format!(
                        "Your savings rate is {}%. Consider cutting non-essential expenses.",
                        pct(rate)
                    ),
                )
                .with_value(rate),
            );
        } else if rate < 0.0 {
            insights.push(Insight::new(
                InsightKind::Warning,
                "Spending Exceeds Income",
                format!(
                    "You've spent {} more than your income!",
                    format_inr((this.income - this.expense).abs(), 2)
                ),
            ));
        }
    }

    if this.expense > 0.0 {
        if let Some((category, spent)) = top_category(transactions, this_month) {
            let share = spent / this.expense * 100.0;
            if share > 40.0 {
                insights.push(
                    Insight::new(
                        InsightKind::Info,
                        format!("{} Dominates", category),
                        format!("{} accounts for {}% of your spending.", category, pct(share)),
                    )
                    .with_value(spent),
                );
            }
        }
    }

    let tip = TIPS.choose(rng).copied().unwrap_or(TIPS[0]);
    insights.push(Insight::new(InsightKind::Tip, "💡 Tip", tip));

    insights
}

/// Largest expense category in the range; first seen wins ties
fn top_category(
    transactions: &[Transaction],
    range: (NaiveDate, NaiveDate),
) -> Option<(String, f64)> {
    let mut order: Vec<(String, f64)> = Vec::new();
    for tx in transactions
        .iter()
        .filter(|t| t.is_expense() && in_range(t, range))
    {
        match order.iter_mut().find(|(c, _)| c == tx.category()) {
            Some((_, total)) => *total += tx.amount(),
            None => order.push((tx.category().to_string(), tx.amount())),
        }
    }
    order
        .into_iter()
        .fold(None, |best: Option<(String, f64)>, (cat, total)| match best {
            Some((_, best_total)) if best_total >= total => best,
            _ => Some((cat, total)),
        })
}

/// Compare this month's expenses with the average of every earlier month
///
/// With no earlier months the average is 0, so any spending this month reads
/// as "high".
pub fn analyze_trends(transactions: &[Transaction], today: NaiveDate) -> TrendAnalysis {
    let mut monthly: BTreeMap<(i32, u32), f64> = BTreeMap::new();
    for tx in transactions.iter().filter(|t| t.is_expense()) {
        *monthly.entry(time::month_key(tx.local_date())).or_default() += tx.amount();
    }

    let current_key = time::month_key(today);
    let current = monthly.get(&current_key).copied().unwrap_or(0.0);

    let (total, count) = monthly
        .iter()
        .filter(|(key, _)| **key != current_key)
        .fold((0.0, 0usize), |(sum, n), (_, v)| (sum + v, n + 1));
    let average = if count > 0 { total / count as f64 } else { 0.0 };

    TrendAnalysis {
        average,
        current,
        status: if current > average {
            TrendStatus::High
        } else {
            TrendStatus::Low
        },
        difference: (current - average).abs(),
    }
}

/// The "Spending Trend" card shown ahead of other insights
pub fn trend_insight(trend: &TrendAnalysis) -> Option<Insight> {
    if trend.difference <= 0.0 {
        return None;
    }
    let (kind, direction) = match trend.status {
        TrendStatus::High => (InsightKind::Warning, "higher"),
        TrendStatus::Low => (InsightKind::Success, "lower"),
    };
    Some(
        Insight::new(
            kind,
            "Spending Trend",
            format!(
                "Your spending is {} than your monthly average by {}.",
                direction,
                format_inr(trend.difference, 0)
            ),
        )
        .with_value(trend.current),
    )
}
