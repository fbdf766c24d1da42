//! Interactive chat command
//!
//! Each transcript message is printed with its 1-based position, which the
//! slash commands use to address staged cards.

use std::io::Write;
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use pocketbook_core::chat::{ChatBus, ChatEvent, ChatSession, Message, MessageBody, Role, ToastLevel};
use pocketbook_core::format::{format_inr, format_inr_whole};
use pocketbook_core::{ClassifierClient, Config, IntentClassifier, SystemClock};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::TryRecvError};

use super::reports::insight_icon;
use crate::store::FileGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Quit,
}

pub async fn cmd_chat(store: FileGateway, config: &Config) -> Result<()> {
    let classifier =
        ClassifierClient::from_config(config).context("Failed to set up the classifier")?;
    println!(
        "💬 PocketBook chat ({} · {}). Type /quit to exit.",
        classifier.backend_name(),
        classifier.model()
    );

    let session = ChatSession::new(
        Arc::new(classifier),
        Arc::new(store.clone()),
        Arc::new(SystemClock),
        ChatBus::default(),
        config.chat.clone(),
    );
    let mut toasts = session.subscribe();

    if let Some(alert) = session.check_budget_alerts(&store.snapshot()) {
        print_message(&session, &alert);
    }

    run_chat(&session, &store, BufReader::new(tokio::io::stdin()), &mut toasts).await
}

/// Read lines until EOF or `/quit`
pub async fn run_chat<R>(
    session: &ChatSession,
    store: &FileGateway,
    reader: R,
    toasts: &mut broadcast::Receiver<ChatEvent>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    show_prompt();
    while let Some(line) = lines.next_line().await? {
        let outcome = handle_line(session, store, &line).await?;
        drain_toasts(toasts);
        if outcome == LineOutcome::Quit {
            break;
        }
        show_prompt();
    }
    Ok(())
}

fn show_prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}

/// Handle one REPL line: a slash command or a message to the assistant
pub async fn handle_line(
    session: &ChatSession,
    store: &FileGateway,
    line: &str,
) -> Result<LineOutcome> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(LineOutcome::Continue);
    }

    if let Some(command) = line.strip_prefix('/') {
        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        let result = match name {
            "quit" | "exit" => return Ok(LineOutcome::Quit),
            "clear" => {
                session.clear_history();
                Ok(None)
            }
            "confirm" => confirm(session, &args, Confirm::Action).await,
            "edit" => confirm(session, &args, Confirm::Edit).await,
            "delete" => confirm(session, &args, Confirm::Delete).await,
            "sub" => confirm(session, &args, Confirm::Subscription).await,
            other => Err(anyhow!(
                "Unknown command /{}. Try /confirm, /edit, /delete, /sub, /clear or /quit",
                other
            )),
        };

        match result {
            Ok(Some(resolved)) => print_message(session, &resolved),
            Ok(None) => {}
            Err(e) => println!("   ⚠️  {}", e),
        }
        return Ok(LineOutcome::Continue);
    }

    if let Some(reply) = session.send_message(line, &store.snapshot()).await {
        print_message(session, &reply);
    }
    Ok(LineOutcome::Continue)
}

#[derive(Clone, Copy)]
enum Confirm {
    Action,
    Edit,
    Delete,
    Subscription,
}

/// Run a confirm handler; returns the message to reprint when it changed
async fn confirm(session: &ChatSession, args: &[&str], kind: Confirm) -> Result<Option<Message>> {
    let id = message_id(session, args.first().copied())?;
    match kind {
        Confirm::Action => session.confirm_action(&id).await?,
        Confirm::Edit => session.confirm_edit(&id).await?,
        Confirm::Delete => session.confirm_delete(&id).await?,
        Confirm::Subscription => {
            let index: usize = args
                .get(1)
                .ok_or_else(|| anyhow!("Usage: /sub N K"))?
                .parse()
                .context("K must be a number")?;
            if index == 0 {
                bail!("Subscriptions are numbered from 1");
            }
            session.confirm_subscription(&id, index - 1).await?;
            // The card stays; the toast reports the result
            return Ok(None);
        }
    }
    Ok(session.message(&id))
}

/// Message id for a 1-based transcript position
fn message_id(session: &ChatSession, position: Option<&str>) -> Result<String> {
    let position: usize = position
        .ok_or_else(|| anyhow!("Which message? Give its number, e.g. /confirm 2"))?
        .parse()
        .context("Message number must be a positive integer")?;
    session
        .messages()
        .get(position.wrapping_sub(1))
        .map(|m| m.id.clone())
        .ok_or_else(|| anyhow!("No message #{}", position))
}

fn print_message(session: &ChatSession, message: &Message) {
    let position = session
        .messages()
        .iter()
        .position(|m| m.id == message.id)
        .map_or(0, |i| i + 1);
    println!("{}", render_message(position, message));
}

fn drain_toasts(toasts: &mut broadcast::Receiver<ChatEvent>) {
    loop {
        match toasts.try_recv() {
            Ok(ChatEvent::Toast { level, message }) => {
                let icon = match level {
                    ToastLevel::Success => "🔔",
                    ToastLevel::Error => "❌",
                    ToastLevel::Info => "ℹ️ ",
                };
                println!("   {} {}", icon, message);
            }
            Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
            Err(_) => break,
        }
    }
}

/// Plain-text rendering of one transcript message
pub fn render_message(position: usize, message: &Message) -> String {
    let who = match message.role {
        Role::User => "🧑",
        Role::Assistant => "🤖",
        Role::System => "⚠️ ",
    };
    let mut lines = vec![if message.content.is_empty() {
        format!("[{}] {}", position, who)
    } else {
        format!("[{}] {} {}", position, who, message.content)
    }];

    match &message.body {
        MessageBody::Text => {}
        MessageBody::QueryStats { items, count } => {
            for record in items {
                lines.push(format!(
                    "• {}  {}  {}",
                    record.date(),
                    record.label(),
                    format_inr(record.amount(), 2)
                ));
            }
            if *count > items.len() {
                lines.push(format!("+{} more", count - items.len()));
            }
        }
        MessageBody::QueryBreakdown {
            items, grand_total, ..
        } => {
            for item in items {
                lines.push(format!(
                    "• {}: {} ({:.1}%)",
                    item.label,
                    format_inr(item.value, 2),
                    item.percentage
                ));
            }
            lines.push(format!("Total: {}", format_inr(*grand_total, 2)));
        }
        MessageBody::ConfirmationTransaction(draft) => lines.push(format!(
            "💸 {} {} · {} · {} · {}",
            draft.transaction_type,
            format_inr(draft.amount, 2),
            draft.category.as_deref().unwrap_or("Other"),
            draft.description.as_deref().unwrap_or("AI Transaction"),
            draft
                .date
                .map_or_else(|| "today".to_string(), |d| d.to_string())
        )),
        MessageBody::ConfirmationReminder(draft) => lines.push(format!(
            "⏰ {} {} · {} · repeats {}",
            draft.title.as_deref().unwrap_or("AI Reminder"),
            format_inr(draft.amount, 2),
            draft
                .date
                .map_or_else(|| "today".to_string(), |d| d.to_string()),
            draft.recurrence.as_str()
        )),
        MessageBody::Insight { insights } => {
            for insight in insights {
                lines.push(format!(
                    "{} {}: {}",
                    insight_icon(insight.kind),
                    insight.title,
                    insight.message
                ));
            }
        }
        MessageBody::Budget { budgets } => {
            for b in budgets {
                lines.push(format!(
                    "• {}: {} of {} ({:.0}%, {})",
                    b.category,
                    format_inr_whole(b.spent),
                    format_inr_whole(b.limit),
                    b.percentage,
                    b.status.as_str()
                ));
            }
        }
        MessageBody::EditConfirm(staged) => {
            lines.push(format!(
                "✏️  {} ({}) on {}",
                staged.item.label(),
                format_inr(staged.item.amount(), 2),
                staged.item.date()
            ));
            if let Ok(changes) = serde_json::to_string(&staged.changes) {
                lines.push(format!("Changes: {}", changes));
            }
        }
        MessageBody::DeleteConfirm(staged) => lines.push(format!(
            "🗑️  {} ({}) on {}",
            staged.item.label(),
            format_inr(staged.item.amount(), 2),
            staged.item.date()
        )),
        MessageBody::Subscription { candidates } => {
            for (i, sub) in candidates.iter().enumerate() {
                lines.push(format!(
                    "{}. {} {}/{} · next {}",
                    i + 1,
                    sub.name,
                    format_inr(sub.amount, 2),
                    sub.frequency.as_str(),
                    sub.next_due_date
                ));
            }
        }
        MessageBody::CategoryCleanup { proposals } => {
            for p in proposals {
                lines.push(format!(
                    "• {} ({}): {} → {}",
                    p.description,
                    format_inr(p.amount, 2),
                    p.current_category,
                    p.new_category
                ));
            }
        }
        MessageBody::ScenarioSimulation(result) => {
            lines.push(format!(
                "{} Remaining savings {}",
                if result.can_afford { "✅" } else { "❌" },
                format_inr_whole(result.remaining_savings)
            ));
            if let Some(months) = result.time_to_recover {
                lines.push(format!("Time to recover: {} months", months));
            }
        }
        MessageBody::Chart(chart) => {
            if !chart.title.is_empty() {
                lines.push(chart.title.clone());
            }
            for point in &chart.chart_data {
                lines.push(format!("• {}: {}", point.name, format_inr(point.value, 2)));
            }
        }
        MessageBody::ActionCard(card) => lines.push(format!(
            "🃏 {}: {} ({})",
            card.title,
            card.description,
            format_inr(card.amount, 2)
        )),
        MessageBody::HealthScore(health) => {
            let f = &health.factors;
            lines.push(format!(
                "Savings {}/{} · Budgets {}/{} · Bills {}/{}",
                f.savings.score,
                f.savings.impact,
                f.budget.score,
                f.budget.impact,
                f.bills.score,
                f.bills.impact
            ));
        }
    }

    if !message.saved {
        let hint = match &message.body {
            MessageBody::ConfirmationTransaction(_)
            | MessageBody::ConfirmationReminder(_)
            | MessageBody::ActionCard(_)
            | MessageBody::CategoryCleanup { .. } => Some(format!("/confirm {}", position)),
            MessageBody::EditConfirm(_) => Some(format!("/edit {}", position)),
            MessageBody::DeleteConfirm(_) => Some(format!("/delete {}", position)),
            MessageBody::Subscription { .. } => Some(format!("/sub {} K", position)),
            _ => None,
        };
        if let Some(hint) = hint {
            lines.push(format!("→ {}", hint));
        }
    }

    for prompt in &message.next_prompts {
        lines.push(format!("💬 {}", prompt));
    }

    let mut rendered = lines.remove(0);
    for line in lines {
        rendered.push_str("\n     ");
        rendered.push_str(&line);
    }
    rendered
}
