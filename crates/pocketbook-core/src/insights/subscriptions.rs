//! Recurring-expense detection
//!
//! Expenses are grouped by the first two words of their description plus the
//! exact amount, so fixed-price services group together while variable
//! spending at the same merchant does not.

use std::collections::HashMap;

use chrono::Duration;

use super::types::{SubscriptionCandidate, SubscriptionFrequency};
use crate::models::Transaction;

const SECONDS_PER_DAY: f64 = 86_400.0;

fn group_key(tx: &Transaction) -> (String, u64) {
    let prefix = tx
        .description
        .to_lowercase()
        .split_whitespace()
        .take(2)
        .collect::<Vec<_>>()
        .join(" ");
    (prefix, tx.amount().to_bits())
}

fn classify_gap(avg_gap: f64) -> Option<SubscriptionFrequency> {
    if (28.0..=32.0).contains(&avg_gap) {
        Some(SubscriptionFrequency::Monthly)
    } else if (360.0..=370.0).contains(&avg_gap) {
        Some(SubscriptionFrequency::Yearly)
    } else {
        None
    }
}

/// Find likely subscriptions, highest confidence first
pub fn detect_subscriptions(transactions: &[Transaction]) -> Vec<SubscriptionCandidate> {
    let mut index: HashMap<(String, u64), usize> = HashMap::new();
    let mut groups: Vec<Vec<&Transaction>> = Vec::new();

    for tx in transactions.iter().filter(|t| t.is_expense()) {
        let slot = *index.entry(group_key(tx)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(tx);
    }

    let mut candidates: Vec<SubscriptionCandidate> = groups
        .into_iter()
        .filter(|g| g.len() >= 2)
        .filter_map(|mut group| {
            group.sort_by_key(|t| t.date);

            let total_secs: i64 = group
                .windows(2)
                .map(|pair| (pair[1].date - pair[0].date).num_seconds())
                .sum();
            let avg_gap = total_secs as f64 / SECONDS_PER_DAY / (group.len() - 1) as f64;
            let frequency = classify_gap(avg_gap)?;

            let first = group.first()?;
            let last = group.last()?;
            let gap_days = avg_gap.round() as i64;
            let next_due_date = last
                .local_date()
                .checked_add_signed(Duration::days(gap_days))?;

            let name = if first.description.trim().is_empty() {
                "Subscription".to_string()
            } else {
                first.description.clone()
            };

            Some(SubscriptionCandidate {
                name,
                amount: first.amount(),
                frequency,
                avg_gap: gap_days,
                next_due_date,
                confidence: if group.len() > 2 { 0.9 } else { 0.7 },
            })
        })
        .collect();

    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TransactionType;
    use crate::time;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn expense(description: &str, amount: f64, on: NaiveDate) -> Transaction {
        Transaction {
            id: format!("{}-{}", description, on),
            amount,
            kind: TransactionType::Expense,
            category: "Entertainment".into(),
            description: description.into(),
            date: time::ist_midnight(on),
            tags: vec![],
        }
    }

    #[test]
    fn test_thirty_day_cycle_is_monthly() {
        let start = date(2024, 1, 1);
        let txs: Vec<_> = (0..3)
            .map(|i| {
                expense(
                    "Netflix Premium plan",
                    649.0,
                    start + Duration::days(30 * i),
                )
            })
            .collect();

        let candidates = detect_subscriptions(&txs);
        assert_eq!(candidates.len(), 1);
        let sub = &candidates[0];
        assert_eq!(sub.frequency, SubscriptionFrequency::Monthly);
        assert_eq!(sub.confidence, 0.9);
        assert_eq!(sub.avg_gap, 30);
        assert_eq!(sub.next_due_date, date(2024, 3, 31));
        assert_eq!(sub.name, "Netflix Premium plan");
    }

    #[test]
    fn test_two_occurrences_lower_confidence() {
        let txs = vec![
            expense("Spotify", 119.0, date(2024, 1, 5)),
            expense("Spotify", 119.0, date(2024, 2, 5)),
        ];
        let candidates = detect_subscriptions(&txs);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].confidence, 0.7);
    }

    #[test]
    fn test_yearly_cycle() {
        let txs = vec![
            expense("Amazon Prime", 1499.0, date(2023, 3, 1)),
            expense("Amazon Prime", 1499.0, date(2024, 3, 1)),
        ];
        let candidates = detect_subscriptions(&txs);
        assert_eq!(candidates[0].frequency, SubscriptionFrequency::Yearly);
    }

    #[test]
    fn test_variable_amounts_and_irregular_gaps_ignored() {
        let txs = vec![
            expense("Uber ride", 230.0, date(2024, 1, 1)),
            expense("Uber ride", 180.0, date(2024, 1, 31)),
            expense("Groceries", 500.0, date(2024, 1, 1)),
            expense("Groceries", 500.0, date(2024, 1, 12)),
            expense("Gym", 999.0, date(2024, 1, 1)),
        ];
        assert!(detect_subscriptions(&txs).is_empty());
    }

    #[test]
    fn test_sorted_by_confidence() {
        let txs = vec![
            expense("Spotify", 119.0, date(2024, 1, 5)),
            expense("Spotify", 119.0, date(2024, 2, 5)),
            expense("Netflix", 649.0, date(2024, 1, 1)),
            expense("Netflix", 649.0, date(2024, 1, 31)),
            expense("Netflix", 649.0, date(2024, 3, 1)),
        ];
        let candidates = detect_subscriptions(&txs);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name, "Netflix");
        assert_eq!(candidates[1].name, "Spotify");
    }
}
