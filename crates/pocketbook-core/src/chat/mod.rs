//! Conversation orchestrator
//!
//! - [`session`] - transcript, rolling history, loading and epoch handling
//! - [`dispatch`] - one classified intent to one reply widget
//! - [`actions`] - confirm handlers that write through the gateway
//! - [`alerts`] - the daily proactive budget warning
//! - [`events`] - open/close/toggle and toast events on a broadcast bus
//! - [`message`] - transcript messages and widget payloads

pub mod actions;
pub mod alerts;
pub mod dispatch;
pub mod events;
pub mod message;
pub mod session;

pub use actions::{DELETED, SAVED, UPDATED};
pub use alerts::{budget_alert, critical_budget, BudgetAlertState, ALERT_PROMPTS};
pub use dispatch::{find_item, LastAction, DEFAULT_GREETING};
pub use events::{ChatBus, ChatEvent, ToastLevel};
pub use message::{
    CategoryProposal, Message, MessageBody, Reply, Role, StagedDelete, StagedEdit,
};
pub use session::{ChatSession, ERROR_MESSAGE, HELP_MESSAGE};
