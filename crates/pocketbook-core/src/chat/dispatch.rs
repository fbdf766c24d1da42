//! Intent dispatch: one classified intent in, one reply out

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::ai::parsing::DEFAULT_UNKNOWN_MESSAGE;
use crate::ai::types::{
    BudgetCheckIntent, BudgetSetIntent, CategorizationItem, ClassifiedIntent, Intent,
    SearchCriteria, Target,
};
use crate::ai::IntentClassifier;
use crate::config::ChatConfig;
use crate::error::{Error, Result};
use crate::format::format_inr_whole;
use crate::gateway::MutationGateway;
use crate::insights::{
    analyze_budget_status, analyze_trends, calculate_health_score, detect_subscriptions,
    generate_insights, simulate_financial_scenario, trend_insight, Scenario,
};
use crate::models::{Budget, FinancialSnapshot, Record, RecordKind};
use crate::query::{process_query, QueryOutcome};

use super::message::{CategoryProposal, MessageBody, Reply, StagedDelete, StagedEdit};

pub const DEFAULT_GREETING: &str =
    "Hello! I'm PocketBook AI. How can I help you with your finances today?";

/// The record most recently created or edited in this session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastAction {
    pub kind: RecordKind,
    pub id: String,
}

/// Everything a dispatch needs besides the intent
pub(crate) struct DispatchContext<'a> {
    pub snapshot: &'a FinancialSnapshot,
    pub classifier: &'a dyn IntentClassifier,
    pub gateway: &'a dyn MutationGateway,
    pub today: NaiveDate,
    pub last_action: Option<LastAction>,
    pub config: &'a ChatConfig,
}

fn amounts_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.005
}

/// Resolve the record an edit or delete refers to
///
/// `Target::Last` prefers the last-acted-on record when it still exists.
/// Otherwise transactions are searched before reminders; a description
/// criterion matches case-insensitively as a substring and a non-zero amount
/// must match exactly. The first hit wins.
pub fn find_item(
    target: Target,
    criteria: &SearchCriteria,
    last_action: Option<&LastAction>,
    snapshot: &FinancialSnapshot,
) -> Option<Record> {
    if target == Target::Last {
        if let Some(last) = last_action {
            let found = match last.kind {
                RecordKind::Transaction => snapshot
                    .transaction(&last.id)
                    .cloned()
                    .map(Record::Transaction),
                RecordKind::Reminder => snapshot.reminder(&last.id).cloned().map(Record::Reminder),
            };
            if found.is_some() {
                return found;
            }
        }
    }

    let needle = criteria
        .description
        .as_deref()
        .map(|d| d.trim().to_lowercase())
        .filter(|d| !d.is_empty());
    let amount = criteria.amount.filter(|a| *a != 0.0);

    let matches = |label: &str, value: f64| {
        if let Some(ref needle) = needle {
            if !label.to_lowercase().contains(needle) {
                return false;
            }
        }
        amount.map_or(true, |a| amounts_equal(a, value))
    };

    if let Some(tx) = snapshot
        .transactions
        .iter()
        .find(|t| matches(&t.description, t.amount()))
    {
        return Some(Record::Transaction(tx.clone()));
    }
    snapshot
        .reminders
        .iter()
        .find(|r| matches(&r.title, r.amount()))
        .map(|r| Record::Reminder(r.clone()))
}

pub(crate) async fn dispatch(
    ctx: &DispatchContext<'_>,
    classified: ClassifiedIntent,
) -> Result<Reply> {
    let ClassifiedIntent {
        intent,
        next_prompts,
    } = classified;
    let snapshot = ctx.snapshot;
    debug!(intent = intent.type_name(), "Dispatching intent");

    let reply = match intent {
        Intent::Unknown(m) => {
            Reply::text(m.message.unwrap_or_else(|| DEFAULT_UNKNOWN_MESSAGE.to_string()))
        }
        Intent::Greeting(m) => {
            Reply::text(m.message.unwrap_or_else(|| DEFAULT_GREETING.to_string()))
        }
        Intent::Query(query) => match process_query(&query, snapshot, ctx.config.result_limit) {
            QueryOutcome::NoMatches => Reply::text(crate::query::NO_MATCHES),
            QueryOutcome::Stats { text, items, count } => {
                Reply::widget(text, MessageBody::QueryStats { items, count })
            }
            QueryOutcome::Breakdown {
                text,
                items,
                count,
                grand_total,
            } => Reply::widget(
                text,
                MessageBody::QueryBreakdown {
                    items,
                    count,
                    grand_total,
                },
            ),
        },
        Intent::Insight(_) => {
            let mut insights =
                generate_insights(&snapshot.transactions, ctx.today, &mut rand::thread_rng());
            if let Some(trend) = trend_insight(&analyze_trends(&snapshot.transactions, ctx.today)) {
                insights.insert(0, trend);
            }
            Reply::widget(
                "Here's your financial overview:",
                MessageBody::Insight { insights },
            )
        }
        Intent::BudgetCheck(check) => return Ok(budget_check(ctx, &check, next_prompts)),
        Intent::BudgetSet(set) => budget_set(ctx, &set).await?,
        Intent::Edit(edit) => {
            match find_item(
                edit.target,
                &edit.search_criteria,
                ctx.last_action.as_ref(),
                snapshot,
            ) {
                Some(item) => Reply::widget(
                    format!("Found this {}. Confirm the changes:", item.kind()),
                    MessageBody::EditConfirm(StagedEdit {
                        item,
                        changes: edit.changes,
                    }),
                ),
                None => Reply::text("I couldn't find a matching item to edit."),
            }
        }
        Intent::Delete(delete) => {
            match find_item(
                delete.target,
                &delete.search_criteria,
                ctx.last_action.as_ref(),
                snapshot,
            ) {
                Some(item) => Reply::widget(
                    format!("Are you sure you want to delete this {}?", item.kind()),
                    MessageBody::DeleteConfirm(StagedDelete { item }),
                ),
                None => Reply::text("I couldn't find a matching item to delete."),
            }
        }
        Intent::Subscription => {
            let candidates = detect_subscriptions(&snapshot.transactions);
            if candidates.is_empty() {
                Reply::text(
                    "I analyzed your transaction history but couldn't find any obvious recurring subscriptions.",
                )
            } else {
                Reply::widget(
                    format!(
                        "I found {} potential subscriptions based on your history:",
                        candidates.len()
                    ),
                    MessageBody::Subscription { candidates },
                )
            }
        }
        Intent::CleanupCategories => cleanup_categories(ctx).await,
        Intent::ScenarioSimulation(s) => {
            let scenario = Scenario {
                kind: s.scenario_type,
                amount: s.amount,
                title: s.title,
            };
            let result = simulate_financial_scenario(
                &snapshot.transactions,
                &scenario,
                &snapshot.reminders,
                ctx.today,
            );
            Reply::widget(
                result.message.clone(),
                MessageBody::ScenarioSimulation(result),
            )
        }
        Intent::Chart(chart) => {
            Reply::widget("Here is the chart you requested:", MessageBody::Chart(chart))
        }
        // The card speaks for itself
        Intent::ActionCard(card) => Reply::widget("", MessageBody::ActionCard(card)),
        Intent::HealthScore => {
            let health = calculate_health_score(
                &snapshot.transactions,
                &snapshot.budgets,
                &snapshot.reminders,
                ctx.today,
            );
            Reply::widget(
                format!(
                    "Your financial health score is {}/100 ({}).",
                    health.score,
                    health.status.as_str()
                ),
                MessageBody::HealthScore(health),
            )
        }
        Intent::Transaction(draft) => Reply::widget(
            "I've prepared a transaction.",
            MessageBody::ConfirmationTransaction(draft),
        ),
        Intent::Reminder(draft) => Reply::widget(
            "I've drafted a reminder for you.",
            MessageBody::ConfirmationReminder(draft),
        ),
    };

    Ok(reply.with_prompts(next_prompts))
}

fn budget_check(
    ctx: &DispatchContext<'_>,
    check: &BudgetCheckIntent,
    next_prompts: Vec<String>,
) -> Reply {
    let statuses = analyze_budget_status(
        &ctx.snapshot.budgets,
        &ctx.snapshot.transactions,
        ctx.today,
    );

    match check.category.as_deref() {
        Some(category) => {
            match statuses
                .into_iter()
                .find(|b| b.category.eq_ignore_ascii_case(category))
            {
                Some(status) => Reply::widget(
                    format!("Budget status for {}:", category),
                    MessageBody::Budget {
                        budgets: vec![status],
                    },
                )
                .with_prompts(next_prompts),
                None => Reply::text(format!("No budget set for {}.", category))
                    .with_prompts(vec![format!("Set budget for {} at 5000", category)]),
            }
        }
        None => {
            let content = if statuses.is_empty() {
                "No budgets set yet."
            } else {
                "Here's your budget status:"
            };
            Reply::widget(content, MessageBody::Budget { budgets: statuses })
                .with_prompts(next_prompts)
        }
    }
}

/// Saved immediately; budgets are advisory and never gate writes
async fn budget_set(ctx: &DispatchContext<'_>, set: &BudgetSetIntent) -> Result<Reply> {
    let category = set.category.trim();
    if category.is_empty() || set.limit <= 0.0 {
        return Ok(Reply::text(
            "Please tell me a category and a positive limit for the budget.",
        ));
    }

    let budget = Budget::new(category, set.limit, set.period);
    match ctx.gateway.save_budget(&budget).await {
        Ok(()) => {
            tracing::info!(category, limit = set.limit, period = set.period.as_str(), "Saved budget");
            Ok(Reply::text(format!(
                "✅ Budget set: {} for {}",
                format_inr_whole(set.limit),
                category
            )))
        }
        Err(Error::Unsupported(_)) => Ok(Reply::text(
            "Budget saving is not available in this view.",
        )),
        Err(e) => Err(e),
    }
}

async fn cleanup_categories(ctx: &DispatchContext<'_>) -> Reply {
    let uncategorized: Vec<_> = ctx
        .snapshot
        .transactions
        .iter()
        .filter(|t| t.is_uncategorized())
        .take(ctx.config.cleanup_batch)
        .collect();

    if uncategorized.is_empty() {
        return Reply::text("Great news! You don't have any uncategorized transactions.");
    }

    let items: Vec<CategorizationItem> = uncategorized
        .iter()
        .map(|t| CategorizationItem {
            id: t.id.clone(),
            description: if t.description.trim().is_empty() {
                "Unknown".to_string()
            } else {
                t.description.clone()
            },
            amount: t.amount(),
        })
        .collect();

    let suggestions = ctx.classifier.suggest_categories(&items).await;
    let proposals: Vec<CategoryProposal> = suggestions
        .into_iter()
        .filter_map(|s| {
            let original = uncategorized.iter().find(|t| t.id == s.id);
            if original.is_none() {
                warn!(id = %s.id, "Category suggestion for unknown transaction");
            }
            original.map(|t| CategoryProposal {
                id: s.id,
                description: t.description.clone(),
                amount: t.amount(),
                current_category: t.category().to_string(),
                new_category: s.category,
            })
        })
        .collect();

    if proposals.is_empty() {
        Reply::text("I couldn't generate any better categories for your 'Other' transactions.")
    } else {
        Reply::widget(
            format!(
                "I found {} transactions that could use better categories. Review them below:",
                proposals.len()
            ),
            MessageBody::CategoryCleanup { proposals },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::{
        BudgetCheckIntent, CategorySuggestion, QueryEntity, QueryFilters, QueryIntent,
        QueryOperation,
    };
    use crate::ai::MockClassifier;
    use crate::gateway::InMemoryGateway;
    use crate::models::{
        BudgetPeriod, Recurrence, Reminder, ReminderType, Transaction, TransactionType,
    };
    use crate::time;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tx(id: &str, description: &str, category: &str, amount: f64) -> Transaction {
        Transaction {
            id: id.into(),
            amount,
            kind: TransactionType::Expense,
            category: category.into(),
            description: description.into(),
            date: time::ist_midnight(date(2024, 3, 5)),
            tags: vec![],
        }
    }

    fn snapshot() -> FinancialSnapshot {
        FinancialSnapshot::new(
            vec![
                tx("t1", "Swiggy dinner", "Food", 450.0),
                tx("t2", "Uber to office", "Other", 220.0),
                tx("t3", "Amazon order", "", 1299.0),
            ],
            vec![Reminder {
                id: "r1".into(),
                title: "Electricity bill".into(),
                amount: 1800.0,
                kind: ReminderType::Pay,
                date: date(2024, 3, 25),
                time: None,
                recurrence: Recurrence::Monthly,
                completed: false,
                tags: vec![],
            }],
            vec![Budget::new("Food", 500.0, BudgetPeriod::Monthly)],
        )
    }

    async fn run(intent: Intent, snapshot: &FinancialSnapshot) -> Reply {
        run_with(intent, snapshot, &MockClassifier::new(), &InMemoryGateway::default(), None).await
    }

    async fn run_with(
        intent: Intent,
        snapshot: &FinancialSnapshot,
        classifier: &MockClassifier,
        gateway: &InMemoryGateway,
        last_action: Option<LastAction>,
    ) -> Reply {
        let config = ChatConfig::default();
        let ctx = DispatchContext {
            snapshot,
            classifier,
            gateway,
            today: date(2024, 3, 20),
            last_action,
            config: &config,
        };
        dispatch(&ctx, ClassifiedIntent::new(intent)).await.unwrap()
    }

    #[test]
    fn test_find_item_by_description_then_reminders() {
        let snap = snapshot();
        let criteria = SearchCriteria {
            description: Some("UBER".into()),
            ..SearchCriteria::default()
        };
        let found = find_item(Target::Transaction, &criteria, None, &snap).unwrap();
        assert_eq!(found.id(), "t2");

        let criteria = SearchCriteria {
            description: Some("electricity".into()),
            ..SearchCriteria::default()
        };
        let found = find_item(Target::Transaction, &criteria, None, &snap).unwrap();
        assert_eq!(found.kind(), RecordKind::Reminder);
    }

    #[test]
    fn test_find_item_amount_must_match() {
        let snap = snapshot();
        let criteria = SearchCriteria {
            description: Some("swiggy".into()),
            amount: Some(999.0),
            ..SearchCriteria::default()
        };
        assert!(find_item(Target::Transaction, &criteria, None, &snap).is_none());
    }

    #[test]
    fn test_find_item_last_action() {
        let snap = snapshot();
        let last = LastAction {
            kind: RecordKind::Transaction,
            id: "t3".into(),
        };
        let found = find_item(Target::Last, &SearchCriteria::default(), Some(&last), &snap).unwrap();
        assert_eq!(found.id(), "t3");
    }

    #[tokio::test]
    async fn test_unknown_uses_classifier_text() {
        let reply = run(Intent::unknown("Only money talk, please."), &snapshot()).await;
        assert_eq!(reply.content, "Only money talk, please.");
        assert_eq!(reply.body, MessageBody::Text);
    }

    #[tokio::test]
    async fn test_query_no_matches_is_text() {
        let query = QueryIntent {
            entity: QueryEntity::Transaction,
            filters: QueryFilters {
                category: Some("Travel".into()),
                ..QueryFilters::default()
            },
            operation: QueryOperation::Sum,
            field: None,
            limit: None,
        };
        let reply = run(Intent::Query(query), &snapshot()).await;
        assert_eq!(reply.content, "I couldn't find any matching records.");
        assert_eq!(reply.body, MessageBody::Text);
    }

    #[tokio::test]
    async fn test_budget_check_missing_category() {
        let check = BudgetCheckIntent {
            category: Some("Travel".into()),
        };
        let reply = run(Intent::BudgetCheck(check), &snapshot()).await;
        assert_eq!(reply.content, "No budget set for Travel.");
        assert_eq!(reply.next_prompts, vec!["Set budget for Travel at 5000"]);
    }

    #[tokio::test]
    async fn test_budget_check_all() {
        let reply = run(Intent::BudgetCheck(BudgetCheckIntent::default()), &snapshot()).await;
        assert_eq!(reply.content, "Here's your budget status:");
        assert!(matches!(reply.body, MessageBody::Budget { ref budgets } if budgets.len() == 1));
    }

    #[tokio::test]
    async fn test_budget_set_saves_through_gateway() {
        let gateway = InMemoryGateway::default();
        let set = BudgetSetIntent {
            category: "Travel".into(),
            limit: 3000.0,
            period: BudgetPeriod::Monthly,
        };
        let reply = run_with(
            Intent::BudgetSet(set),
            &snapshot(),
            &MockClassifier::new(),
            &gateway,
            None,
        )
        .await;
        assert_eq!(reply.content, "✅ Budget set: ₹3,000 for Travel");
        assert_eq!(gateway.snapshot().budgets.len(), 1);
    }

    #[tokio::test]
    async fn test_edit_stages_confirmation() {
        let edit = crate::ai::types::EditIntent {
            target: Target::Transaction,
            search_criteria: SearchCriteria {
                description: Some("swiggy".into()),
                ..SearchCriteria::default()
            },
            changes: crate::models::RecordChanges {
                amount: Some(500.0),
                ..Default::default()
            },
        };
        let reply = run(Intent::Edit(edit), &snapshot()).await;
        assert_eq!(reply.content, "Found this transaction. Confirm the changes:");
        assert!(matches!(reply.body, MessageBody::EditConfirm(ref s) if s.item.id() == "t1"));
    }

    #[tokio::test]
    async fn test_cleanup_uses_suggestions() {
        let classifier = MockClassifier::new();
        classifier.set_suggestions(vec![
            CategorySuggestion {
                id: "t2".into(),
                category: "Transport".into(),
            },
            CategorySuggestion {
                id: "zzz".into(),
                category: "Food".into(),
            },
        ]);
        let reply = run_with(
            Intent::CleanupCategories,
            &snapshot(),
            &classifier,
            &InMemoryGateway::default(),
            None,
        )
        .await;

        // Two candidates were sent: "Other" and the blank category
        assert_eq!(classifier.suggestion_calls()[0].len(), 2);
        match reply.body {
            MessageBody::CategoryCleanup { proposals } => {
                assert_eq!(proposals.len(), 1);
                assert_eq!(proposals[0].current_category, "Other");
                assert_eq!(proposals[0].new_category, "Transport");
            }
            other => panic!("unexpected body {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cleanup_without_suggestions_degrades() {
        let reply = run(Intent::CleanupCategories, &snapshot()).await;
        assert_eq!(
            reply.content,
            "I couldn't generate any better categories for your 'Other' transactions."
        );
    }

    #[tokio::test]
    async fn test_health_score_widget() {
        let reply = run(Intent::HealthScore, &snapshot()).await;
        assert!(matches!(reply.body, MessageBody::HealthScore(_)));
        assert!(reply.content.starts_with("Your financial health score is "));
    }
}
