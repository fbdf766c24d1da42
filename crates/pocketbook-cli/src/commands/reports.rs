//! Report command implementations

use anyhow::{bail, Result};
use chrono::NaiveDate;
use pocketbook_core::format::{format_inr, format_inr_whole};
use pocketbook_core::insights::{
    analyze_budget_status, analyze_trends, calculate_health_score, detect_subscriptions,
    generate_insights, simulate_financial_scenario, trend_insight, BudgetState, Insight,
    InsightKind, Scenario, ScenarioType,
};
use pocketbook_core::FinancialSnapshot;

use super::truncate;

const RULE: &str = "   ─────────────────────────────────────────────────────────────";

pub fn insight_icon(kind: InsightKind) -> &'static str {
    match kind {
        InsightKind::Warning => "⚠️ ",
        InsightKind::Success => "✅",
        InsightKind::Info => "ℹ️ ",
        InsightKind::Tip => "💡",
    }
}

pub fn print_insight(insight: &Insight) {
    println!(
        "   {} {}: {}",
        insight_icon(insight.kind),
        insight.title,
        insight.message
    );
}

pub fn cmd_insights(snapshot: &FinancialSnapshot, today: NaiveDate) -> Result<()> {
    let mut insights = generate_insights(&snapshot.transactions, today, &mut rand::thread_rng());
    if let Some(trend) = trend_insight(&analyze_trends(&snapshot.transactions, today)) {
        insights.insert(0, trend);
    }

    println!();
    println!("📊 Financial Overview ({})", today.format("%B %Y"));
    println!("{}", RULE);
    for insight in &insights {
        print_insight(insight);
    }
    Ok(())
}

pub fn cmd_health(snapshot: &FinancialSnapshot, today: NaiveDate) -> Result<()> {
    let health = calculate_health_score(
        &snapshot.transactions,
        &snapshot.budgets,
        &snapshot.reminders,
        today,
    );

    println!();
    println!("❤️  Financial Health: {}/100 ({})", health.score, health.status);
    println!("{}", RULE);
    let factors = [
        ("Savings", &health.factors.savings),
        ("Budgets", &health.factors.budget),
        ("Bills", &health.factors.bills),
    ];
    for (label, factor) in factors {
        println!(
            "   {:8} {:>3}/{:<3} {}",
            label, factor.score, factor.impact, factor.message
        );
    }
    Ok(())
}

pub fn cmd_subscriptions(snapshot: &FinancialSnapshot) -> Result<()> {
    let candidates = detect_subscriptions(&snapshot.transactions);

    if candidates.is_empty() {
        println!("No recurring subscriptions found in your history.");
        return Ok(());
    }

    println!();
    println!("📋 Likely Subscriptions");
    println!("{}", RULE);
    for sub in candidates {
        println!(
            "   {:24} │ {:>10}/{:<7} │ next {} │ {:.0}%",
            truncate(&sub.name, 24),
            format_inr(sub.amount, 2),
            sub.frequency.as_str(),
            sub.next_due_date,
            sub.confidence * 100.0
        );
    }
    Ok(())
}

pub fn cmd_budgets(snapshot: &FinancialSnapshot, today: NaiveDate) -> Result<()> {
    let statuses = analyze_budget_status(&snapshot.budgets, &snapshot.transactions, today);

    if statuses.is_empty() {
        println!("No budgets set yet.");
        return Ok(());
    }

    println!();
    println!("🎯 Budgets ({})", today.format("%B %Y"));
    println!("{}", RULE);
    for status in statuses {
        let icon = match status.status {
            BudgetState::Safe => "🟢",
            BudgetState::Warning => "🟡",
            BudgetState::Over => "🔴",
        };
        println!(
            "   {} {:16} {:>10} of {:<10} ({:.0}%)",
            icon,
            truncate(&status.category, 16),
            format_inr_whole(status.spent),
            format_inr_whole(status.limit),
            status.percentage
        );
    }
    Ok(())
}

pub fn cmd_trends(snapshot: &FinancialSnapshot, today: NaiveDate) -> Result<()> {
    let trend = analyze_trends(&snapshot.transactions, today);

    println!();
    println!("📈 Spending Trend");
    println!("{}", RULE);
    println!("   This month:      {}", format_inr_whole(trend.current));
    println!("   Monthly average: {}", format_inr_whole(trend.average));
    println!(
        "   Status:          {} by {}",
        trend.status.as_str(),
        format_inr_whole(trend.difference)
    );
    Ok(())
}

pub fn cmd_simulate(
    snapshot: &FinancialSnapshot,
    today: NaiveDate,
    amount: f64,
    recurring: bool,
    title: Option<String>,
) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        bail!("Amount must be a positive number");
    }

    let scenario = Scenario {
        kind: if recurring {
            ScenarioType::Recurring
        } else {
            ScenarioType::OneTime
        },
        amount,
        title,
    };
    let result =
        simulate_financial_scenario(&snapshot.transactions, &scenario, &snapshot.reminders, today);

    println!();
    println!(
        "{} {}",
        if result.can_afford { "✅" } else { "❌" },
        result.message
    );
    println!("   Remaining savings: {}", format_inr_whole(result.remaining_savings));
    if let Some(months) = result.time_to_recover {
        println!("   Time to recover:   {} months", months);
    }
    if result.yearly_impact > 0.0 {
        println!("   Yearly impact:     {}", format_inr_whole(result.yearly_impact));
    }
    Ok(())
}
