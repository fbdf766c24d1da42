//! Chat session state machine
//!
//! A [`ChatSession`] owns the transcript, the rolling history and the
//! last-action pointer for one conversation. Each call receives the current
//! [`FinancialSnapshot`]; the session never caches financial data.
//!
//! ```text
//! Idle --(text)--> Classifying --(reply)--> Idle | AwaitingConfirmation
//! AwaitingConfirmation --(confirm)--> Mutating --(ok)--> Idle
//!                                              --(err)--> AwaitingConfirmation
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::ai::types::{ClassifierContext, ClassifierRequest, HistoryTurn};
use crate::ai::IntentClassifier;
use crate::config::ChatConfig;
use crate::gateway::MutationGateway;
use crate::insights::{analyze_budget_status, get_smart_suggestions};
use crate::models::FinancialSnapshot;
use crate::time::Clock;

use super::alerts::{budget_alert, critical_budget, BudgetAlertState};
use super::dispatch::{dispatch, DispatchContext, LastAction};
use super::events::{ChatBus, ChatEvent, ToastLevel};
use super::message::{Message, Reply, Role};

pub const HELP_MESSAGE: &str =
    "I can help you log transactions, analyze spending, check budgets, or set reminders.";
pub const ERROR_MESSAGE: &str = "Sorry, I encountered an error.";

#[derive(Debug, Default)]
pub(crate) struct SessionState {
    pub(crate) messages: Vec<Message>,
    history: VecDeque<HistoryTurn>,
    loading: bool,
    pub(crate) last_action: Option<LastAction>,
    /// Bumped on close; replies from an older epoch are dropped
    epoch: u64,
    next_id: u64,
    alert: BudgetAlertState,
    open: bool,
}

impl SessionState {
    fn push(&mut self, reply: Reply) -> Message {
        self.next_id += 1;
        let message = Message {
            id: format!("msg-{}", self.next_id),
            role: reply.role,
            content: reply.content,
            body: reply.body,
            next_prompts: reply.next_prompts,
            saved: false,
        };
        self.messages.push(message.clone());
        message
    }

    fn remember(&mut self, turn: HistoryTurn, limit: usize) {
        self.history.push_back(turn);
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }

    fn reset(&mut self) {
        self.messages.clear();
        self.history.clear();
        self.last_action = None;
        self.loading = false;
        self.epoch += 1;
    }

    pub(crate) fn message_mut(&mut self, id: &str) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| m.id == id)
    }
}

pub(crate) struct Inner {
    pub(crate) classifier: Arc<dyn IntentClassifier>,
    pub(crate) gateway: Arc<dyn MutationGateway>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) bus: ChatBus,
    pub(crate) config: ChatConfig,
    state: Mutex<SessionState>,
}

/// Handle to one conversation
///
/// Clones share the same session.
#[derive(Clone)]
pub struct ChatSession {
    pub(crate) inner: Arc<Inner>,
}

/// Clears `loading` however `send_message` exits, unless the session was
/// closed in the meantime
struct LoadingGuard<'a> {
    session: &'a ChatSession,
    epoch: u64,
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.session.state();
        if state.epoch == self.epoch {
            state.loading = false;
        }
    }
}

impl ChatSession {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        gateway: Arc<dyn MutationGateway>,
        clock: Arc<dyn Clock>,
        bus: ChatBus,
        config: ChatConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                classifier,
                gateway,
                clock,
                bus,
                config,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    pub(crate) fn state(&self) -> MutexGuard<'_, SessionState> {
        // A panic mid-update leaves plain data behind; keep going with it
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Send one user turn and return the assistant (or system) reply
    ///
    /// Returns `None` for blank input, while another turn is in flight, or
    /// when the session was closed before the reply arrived.
    pub async fn send_message(&self, text: &str, snapshot: &FinancialSnapshot) -> Option<Message> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let (epoch, history) = {
            let mut state = self.state();
            if state.loading {
                warn!("Ignoring message while a reply is pending");
                return None;
            }
            state.loading = true;

            let skip = state
                .history
                .len()
                .saturating_sub(self.inner.config.classifier_history);
            let history: Vec<HistoryTurn> = state.history.iter().skip(skip).cloned().collect();

            state.push(Reply {
                role: Role::User,
                ..Reply::text(text)
            });
            state.remember(HistoryTurn::user(text), self.inner.config.history_limit);
            (state.epoch, history)
        };
        let _loading = LoadingGuard {
            session: self,
            epoch,
        };

        let reply = if is_help_request(text) {
            self.help_reply(snapshot)
        } else {
            self.respond(text, history, snapshot).await
        };

        let mut state = self.state();
        if state.epoch != epoch {
            debug!(epoch, "Discarding reply for a closed conversation");
            return None;
        }
        if reply.role == Role::Assistant && !reply.content.is_empty() {
            state.remember(
                HistoryTurn::assistant(reply.content.as_str()),
                self.inner.config.history_limit,
            );
        }
        Some(state.push(reply))
    }

    fn help_reply(&self, snapshot: &FinancialSnapshot) -> Reply {
        let now = self.inner.clock.now().naive_local();
        let prompts = get_smart_suggestions(&snapshot.transactions, now, &mut rand::thread_rng());
        Reply::text(HELP_MESSAGE).with_prompts(prompts)
    }

    async fn respond(
        &self,
        text: &str,
        history: Vec<HistoryTurn>,
        snapshot: &FinancialSnapshot,
    ) -> Reply {
        let now = self.inner.clock.now();
        let request = ClassifierRequest {
            text: text.to_string(),
            history,
            context: classifier_context(snapshot, self.inner.config.context_transactions),
            now,
        };

        let classified = match self.inner.classifier.classify(&request).await {
            Ok(classified) => classified,
            Err(e) => {
                error!(error = %e, model = self.inner.classifier.model(), "Intent classification failed");
                return Reply::system(ERROR_MESSAGE);
            }
        };

        let last_action = self.state().last_action.clone();
        let ctx = DispatchContext {
            snapshot,
            classifier: self.inner.classifier.as_ref(),
            gateway: self.inner.gateway.as_ref(),
            today: now.date_naive(),
            last_action,
            config: &self.inner.config,
        };
        match dispatch(&ctx, classified).await {
            Ok(reply) => reply,
            Err(e) => {
                error!(error = %e, "Failed to handle intent");
                Reply::system(ERROR_MESSAGE)
            }
        }
    }

    /// Inject the daily budget warning if one is due
    ///
    /// Fires for the first budget at 90-99% utilisation, at most once per
    /// IST calendar day for this session.
    pub fn check_budget_alerts(&self, snapshot: &FinancialSnapshot) -> Option<Message> {
        let today = self.inner.clock.today();
        let mut state = self.state();
        if state.alert.shown_on(today) {
            return None;
        }

        let statuses = analyze_budget_status(&snapshot.budgets, &snapshot.transactions, today);
        let status = critical_budget(&statuses)?;
        info!(
            category = %status.category,
            percentage = status.percentage,
            "Raising budget alert"
        );
        state.alert.mark_shown(today);
        Some(state.push(budget_alert(status)))
    }

    /// Drop the transcript, history and last-action pointer
    ///
    /// An in-flight classification is not aborted; its reply is discarded.
    pub fn close(&self) {
        let mut state = self.state();
        state.reset();
        state.open = false;
        debug!(epoch = state.epoch, "Chat closed");
    }

    /// Start over without closing the chat
    pub fn clear_history(&self) {
        self.state().reset();
        self.inner.bus.toast(ToastLevel::Info, "Conversation cleared");
    }

    /// Apply an open/close/toggle request from elsewhere in the host
    ///
    /// Returns the prompt an `Open` event asks to send, if any.
    pub fn apply_event(&self, event: &ChatEvent) -> Option<String> {
        match event {
            ChatEvent::Open { prompt } => {
                self.state().open = true;
                prompt.clone().filter(|p| !p.trim().is_empty())
            }
            ChatEvent::Close => {
                self.close();
                None
            }
            ChatEvent::Toggle => {
                let was_open = self.state().open;
                if was_open {
                    self.close();
                } else {
                    self.state().open = true;
                }
                None
            }
            ChatEvent::Toast { .. } => None,
        }
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state().messages.clone()
    }

    pub fn message(&self, id: &str) -> Option<Message> {
        self.state().messages.iter().find(|m| m.id == id).cloned()
    }

    pub fn is_loading(&self) -> bool {
        self.state().loading
    }

    pub fn is_open(&self) -> bool {
        self.state().open
    }

    pub fn last_action(&self) -> Option<LastAction> {
        self.state().last_action.clone()
    }

    pub fn bus(&self) -> &ChatBus {
        &self.inner.bus
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.bus.subscribe()
    }
}

fn is_help_request(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("help") || lower.contains("commands")
}

/// Recent transactions (newest first) and the distinct categories
fn classifier_context(snapshot: &FinancialSnapshot, limit: usize) -> ClassifierContext {
    let mut recent = snapshot.transactions.clone();
    recent.sort_by(|a, b| b.date.cmp(&a.date));
    recent.truncate(limit);
    ClassifierContext {
        recent,
        categories: snapshot.categories(),
    }
}
