//! Contextual prompt suggestions

use chrono::{Datelike, NaiveDateTime, Timelike, Weekday};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::Transaction;

const MAX_SUGGESTIONS: usize = 5;
const RECENT_WINDOW: usize = 50;

fn time_of_day(hour: u32) -> &'static [&'static str] {
    match hour {
        5..=10 => &["Log breakfast 🍳", "Add commute expense 🚌"],
        11..=14 => &["Add lunch cost 🍱", "Log coffee/tea ☕"],
        15..=18 => &["Log snacks 🥨", "Travel expense 🚕"],
        19..=22 => &["Log dinner 🍛", "Add grocery bill 🥦"],
        _ => &["Late night snack? 🍕"],
    }
}

/// Most frequent expense categories among the first `RECENT_WINDOW` records
fn top_categories(transactions: &[Transaction]) -> Vec<String> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for tx in transactions
        .iter()
        .take(RECENT_WINDOW)
        .filter(|t| t.is_expense() && !t.category.trim().is_empty())
    {
        match counts.iter_mut().find(|(c, _)| *c == tx.category) {
            Some((_, n)) => *n += 1,
            None => counts.push((tx.category.clone(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(c, _)| c).collect()
}

/// Up to five unique prompts for the current IST wall time
///
/// `now` is local IST time. Candidates come from the time of day, weekend or
/// weekday, month start or end, the two busiest recent categories, and two
/// fixed prompts; they are deduplicated and shuffled with `rng`.
pub fn get_smart_suggestions<R: Rng + ?Sized>(
    transactions: &[Transaction],
    now: NaiveDateTime,
    rng: &mut R,
) -> Vec<String> {
    let mut candidates: Vec<String> = time_of_day(now.hour())
        .iter()
        .map(|s| s.to_string())
        .collect();

    match now.weekday() {
        Weekday::Sat | Weekday::Sun => {
            candidates.push("Weekend spending?".into());
            candidates.push("Log movie/outing 🎬".into());
        }
        _ => candidates.push("Daily total so far".into()),
    }

    let day = now.day();
    if day >= 25 {
        candidates.push("Monthly budget status".into());
        candidates.push("Rent/Bills paid? 🧾".into());
    } else if day <= 5 {
        candidates.push("Set this month's budget".into());
        candidates.push("Pay Rent 🏠".into());
    }

    let top = top_categories(transactions);
    if let Some(first) = top.first() {
        candidates.push(format!("Spend on {}?", first));
    }
    if let Some(second) = top.get(1) {
        candidates.push(format!("{} breakdown", second));
    }

    candidates.push("Show my spending breakdown 📊".into());
    candidates.push("How much did I save?".into());

    let mut unique: Vec<String> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if !unique.contains(&c) {
            unique.push(c);
        }
    }
    unique.shuffle(rng);
    unique.truncate(MAX_SUGGESTIONS);
    unique
}
