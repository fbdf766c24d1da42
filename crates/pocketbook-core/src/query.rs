//! Query filtering and aggregation over the record snapshot
//!
//! Backs the `query` intent: filter one entity, then sum, average, count,
//! list or break down the matches.

use chrono::NaiveDate;
use serde::Serialize;

use crate::ai::types::{QueryEntity, QueryFilters, QueryIntent, QueryOperation};
use crate::format::{format_inr, format_inr_whole};
use crate::models::{
    FinancialSnapshot, Record, Reminder, ReminderType, Transaction, TransactionType,
    DEFAULT_CATEGORY,
};

/// Reply when no record survives the filters
pub const NO_MATCHES: &str = "I couldn't find any matching records.";

/// Category grouping key; reminders group by title
fn group_label(record: &Record) -> String {
    let label = match record {
        Record::Transaction(t) => t.category(),
        Record::Reminder(r) => r.title.trim(),
    };
    if label.is_empty() {
        DEFAULT_CATEGORY.to_string()
    } else {
        label.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownItem {
    pub label: String,
    pub value: f64,
    pub percentage: f64,
}

/// Result of running a query intent
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Nothing matched; rendered as plain text
    NoMatches,
    /// sum / average / count / list: a sentence plus up to `limit` records
    Stats {
        text: String,
        items: Vec<Record>,
        /// Total matches, which may exceed `items.len()`
        count: usize,
    },
    Breakdown {
        text: String,
        items: Vec<BreakdownItem>,
        count: usize,
        grand_total: f64,
    },
}

impl QueryOutcome {
    pub fn text(&self) -> &str {
        match self {
            QueryOutcome::NoMatches => NO_MATCHES,
            QueryOutcome::Stats { text, .. } | QueryOutcome::Breakdown { text, .. } => text,
        }
    }
}

fn contains_ci(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn in_range(date: NaiveDate, filters: &QueryFilters) -> bool {
    filters.start_date.map_or(true, |start| date >= start)
        && filters.end_date.map_or(true, |end| date <= end)
}

fn transaction_matches(tx: &Transaction, filters: &QueryFilters) -> bool {
    if !in_range(tx.local_date(), filters) {
        return false;
    }
    if let Some(kind) = filters.kind.as_deref() {
        match kind.trim().parse::<TransactionType>() {
            Ok(wanted) if wanted != tx.kind => return false,
            _ => {}
        }
    }
    if let Some(category) = filters.category.as_deref() {
        if !tx.category().eq_ignore_ascii_case(category.trim()) {
            return false;
        }
    }
    if let Some(search) = filters.search.as_deref() {
        let needle = search.trim().to_lowercase();
        let hit = contains_ci(&tx.description, &needle)
            || contains_ci(tx.category(), &needle)
            || tx.tags.iter().any(|tag| contains_ci(tag, &needle));
        if !hit {
            return false;
        }
    }
    true
}

fn reminder_kind(filter: &str) -> Option<ReminderType> {
    match filter.trim().to_lowercase().as_str() {
        "income" | "collect" => Some(ReminderType::Collect),
        "expense" | "pay" => Some(ReminderType::Pay),
        _ => None,
    }
}

fn reminder_matches(reminder: &Reminder, filters: &QueryFilters) -> bool {
    if !in_range(reminder.date, filters) {
        return false;
    }
    if let Some(wanted) = filters.kind.as_deref().and_then(reminder_kind) {
        if wanted != reminder.kind {
            return false;
        }
    }
    if let Some(search) = filters.search.as_deref() {
        let needle = search.trim().to_lowercase();
        let hit = contains_ci(&reminder.title, &needle)
            || reminder.tags.iter().any(|tag| contains_ci(tag, &needle));
        if !hit {
            return false;
        }
    }
    true
}

/// Records of the requested entity that pass every filter, in snapshot order
pub fn filter_records(
    entity: QueryEntity,
    filters: &QueryFilters,
    snapshot: &FinancialSnapshot,
) -> Vec<Record> {
    match entity {
        QueryEntity::Transaction => snapshot
            .transactions
            .iter()
            .filter(|t| transaction_matches(t, filters))
            .cloned()
            .map(Record::Transaction)
            .collect(),
        QueryEntity::Reminder => snapshot
            .reminders
            .iter()
            .filter(|r| reminder_matches(r, filters))
            .cloned()
            .map(Record::Reminder)
            .collect(),
    }
}

/// Group by category (or by day), largest first, with share of the total
pub fn breakdown(records: &[Record], by_date: bool) -> (Vec<BreakdownItem>, f64) {
    let mut groups: Vec<(String, f64)> = Vec::new();
    let mut total = 0.0;

    for record in records {
        let key = if by_date {
            record.date().format("%Y-%m-%d").to_string()
        } else {
            group_label(record)
        };
        let value = record.amount();
        total += value;
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v += value,
            None => groups.push((key, value)),
        }
    }

    let mut items: Vec<BreakdownItem> = groups
        .into_iter()
        .map(|(label, value)| BreakdownItem {
            label,
            value,
            percentage: if total > 0.0 { value / total * 100.0 } else { 0.0 },
        })
        .collect();
    items.sort_by(|a, b| b.value.total_cmp(&a.value));
    (items, total)
}

/// Run a query intent against the snapshot
///
/// `default_limit` applies when the intent carries no usable limit.
pub fn process_query(
    query: &QueryIntent,
    snapshot: &FinancialSnapshot,
    default_limit: usize,
) -> QueryOutcome {
    let matched = filter_records(query.entity, &query.filters, snapshot);
    let count = matched.len();
    if count == 0 {
        return QueryOutcome::NoMatches;
    }

    if query.operation == QueryOperation::Breakdown {
        let by_date = query.groups_by_date();
        let (items, grand_total) = breakdown(&matched, by_date);
        return QueryOutcome::Breakdown {
            text: format!(
                "Here is the breakdown by {}:",
                if by_date { "date" } else { "category" }
            ),
            items,
            count,
            grand_total,
        };
    }

    let sum: f64 = matched.iter().map(Record::amount).sum();
    let text = match query.operation {
        QueryOperation::Sum => format!("The total amount is {}.", format_inr(sum, 2)),
        QueryOperation::Average => format!(
            "The average amount is {}.",
            format_inr_whole(sum / count as f64)
        ),
        QueryOperation::Count => format!(
            "I found {} {}s matching your criteria.",
            count,
            query.entity.as_str()
        ),
        QueryOperation::List | QueryOperation::Breakdown => {
            "Here are the records I found:".to_string()
        }
    };

    let limit = query.limit_or(default_limit);
    QueryOutcome::Stats {
        text,
        items: matched.into_iter().take(limit).collect(),
        count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Recurrence;
    use crate::time;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(id: &str, kind: TransactionType, category: &str, amount: f64, day: NaiveDate) -> Transaction {
        Transaction {
            id: id.into(),
            amount,
            kind,
            category: category.into(),
            description: format!("{} purchase", category),
            date: time::ist_midnight(day),
            tags: vec![],
        }
    }

    fn scenario_a() -> FinancialSnapshot {
        FinancialSnapshot::new(
            vec![
                tx("1", TransactionType::Expense, "Food", 500.0, date(2024, 3, 1)),
                tx("2", TransactionType::Expense, "Food", 600.0, date(2024, 3, 2)),
                tx("3", TransactionType::Income, "Salary", 5000.0, date(2024, 3, 1)),
            ],
            vec![],
            vec![],
        )
    }

    fn query(operation: QueryOperation, filters: QueryFilters) -> QueryIntent {
        QueryIntent {
            entity: QueryEntity::Transaction,
            filters,
            operation,
            field: None,
            limit: None,
        }
    }

    #[test]
    fn test_sum_of_food_this_month() {
        let filters = QueryFilters {
            kind: Some("expense".into()),
            category: Some("food".into()),
            start_date: Some(date(2024, 3, 1)),
            end_date: Some(date(2024, 3, 31)),
            ..QueryFilters::default()
        };
        match process_query(&query(QueryOperation::Sum, filters), &scenario_a(), 10) {
            QueryOutcome::Stats { text, items, count } => {
                assert_eq!(count, 2);
                assert_eq!(items.iter().map(Record::amount).sum::<f64>(), 1100.0);
                assert_eq!(text, "The total amount is ₹1,100.");
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_no_matches_short_circuits() {
        for op in [QueryOperation::Sum, QueryOperation::Breakdown, QueryOperation::Count] {
            let filters = QueryFilters {
                category: Some("Travel".into()),
                ..QueryFilters::default()
            };
            let outcome = process_query(&query(op, filters), &scenario_a(), 10);
            assert_eq!(outcome, QueryOutcome::NoMatches);
            assert_eq!(outcome.text(), NO_MATCHES);
        }
    }

    #[test]
    fn test_breakdown_sums_to_total() {
        match process_query(
            &query(QueryOperation::Breakdown, QueryFilters::default()),
            &scenario_a(),
            10,
        ) {
            QueryOutcome::Breakdown {
                text,
                items,
                count,
                grand_total,
            } => {
                assert_eq!(text, "Here is the breakdown by category:");
                assert_eq!(count, 3);
                assert_eq!(grand_total, 6100.0);
                assert_eq!(items[0].label, "Salary");
                assert_eq!(items[1].label, "Food");
                let value_sum: f64 = items.iter().map(|i| i.value).sum();
                let pct_sum: f64 = items.iter().map(|i| i.percentage).sum();
                assert!((value_sum - grand_total).abs() < 1e-9);
                assert!((pct_sum - 100.0).abs() < 1e-9);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_breakdown_by_date() {
        let mut q = query(QueryOperation::Breakdown, QueryFilters::default());
        q.field = Some("date".into());
        match process_query(&q, &scenario_a(), 10) {
            QueryOutcome::Breakdown { text, items, .. } => {
                assert_eq!(text, "Here is the breakdown by date:");
                assert_eq!(items[0].label, "2024-03-01");
                assert_eq!(items[0].value, 5500.0);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_breakdown_zero_total() {
        let records = vec![Record::Transaction(tx(
            "z",
            TransactionType::Expense,
            "Food",
            f64::NAN,
            date(2024, 3, 1),
        ))];
        let (items, total) = breakdown(&records, false);
        assert_eq!(total, 0.0);
        assert_eq!(items[0].percentage, 0.0);
    }

    #[test]
    fn test_average_and_count() {
        let filters = QueryFilters {
            category: Some("Food".into()),
            ..QueryFilters::default()
        };
        let avg = process_query(&query(QueryOperation::Average, filters.clone()), &scenario_a(), 10);
        assert_eq!(avg.text(), "The average amount is ₹550.");

        let count = process_query(&query(QueryOperation::Count, filters), &scenario_a(), 10);
        assert_eq!(count.text(), "I found 2 transactions matching your criteria.");
    }

    #[test]
    fn test_list_respects_limit_and_reports_total() {
        let mut q = query(QueryOperation::List, QueryFilters::default());
        q.limit = Some(2.0);
        match process_query(&q, &scenario_a(), 10) {
            QueryOutcome::Stats { text, items, count } => {
                assert_eq!(text, "Here are the records I found:");
                assert_eq!(items.len(), 2);
                assert_eq!(count, 3);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_search_matches_tags_and_category() {
        let mut snapshot = scenario_a();
        snapshot.transactions[2].tags = vec!["Office".into()];
        let by_tag = QueryFilters {
            search: Some("office".into()),
            ..QueryFilters::default()
        };
        let matched = filter_records(QueryEntity::Transaction, &by_tag, &snapshot);
        assert_eq!(matched.len(), 1);

        let by_category = QueryFilters {
            search: Some("SALARY".into()),
            ..QueryFilters::default()
        };
        assert_eq!(
            filter_records(QueryEntity::Transaction, &by_category, &snapshot).len(),
            1
        );
    }

    #[test]
    fn test_reminder_filters() {
        let reminder = |id: &str, title: &str, kind: ReminderType| Reminder {
            id: id.into(),
            title: title.into(),
            amount: 1000.0,
            kind,
            date: date(2024, 3, 10),
            time: None,
            recurrence: Recurrence::None,
            completed: false,
            tags: vec![],
        };
        let snapshot = FinancialSnapshot::new(
            vec![],
            vec![
                reminder("r1", "Rent", ReminderType::Pay),
                reminder("r2", "Loan from Ravi", ReminderType::Collect),
            ],
            vec![],
        );

        let income = QueryFilters {
            kind: Some("income".into()),
            ..QueryFilters::default()
        };
        let matched = filter_records(QueryEntity::Reminder, &income, &snapshot);
        assert_eq!(matched.len(), 1);
        assert!(matches!(&matched[0], Record::Reminder(r) if r.id == "r2"));

        let search = QueryFilters {
            search: Some("rent".into()),
            ..QueryFilters::default()
        };
        assert_eq!(filter_records(QueryEntity::Reminder, &search, &snapshot).len(), 1);
    }
}
