//! PocketBook Core Library
//!
//! The engine behind the PocketBook finance chat:
//! - Metrics engine: insights, trends, subscriptions, budgets, health score
//! - Conversation orchestrator with staged confirmations
//! - Intent classifier boundary (Gemini over HTTP, scripted mock)
//! - Mutation gateway trait with an in-memory implementation
//! - Reminder completion and recurrence
//! - Layered configuration and the prompt library

pub mod ai;
pub mod chat;
pub mod config;
pub mod de;
pub mod error;
pub mod format;
pub mod gateway;
pub mod insights;
pub mod models;
pub mod prompts;
pub mod query;
pub mod reminders;
pub mod time;

/// Test utilities including mock Gemini server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{
    ClassifiedIntent, ClassifierClient, ClassifierRequest, GeminiBackend, Intent,
    IntentClassifier, MockClassifier, RetryPolicy,
};
pub use chat::{ChatBus, ChatEvent, ChatSession, Message, MessageBody, Role, ToastLevel};
pub use config::{BackendKind, ChatConfig, ClassifierConfig, Config, RetryConfig};
pub use error::{Error, Result};
pub use format::{format_inr, format_inr_whole};
pub use gateway::{InMemoryGateway, MutationGateway};
pub use models::{
    Budget, BudgetPeriod, FinancialSnapshot, NewReminder, NewTransaction, Record, RecordChanges,
    RecordKind, Recurrence, Reminder, ReminderType, Transaction, TransactionType,
};
pub use prompts::{Prompt, PromptId, PromptLibrary};
pub use query::{process_query, QueryOutcome};
pub use reminders::{apply_reminder_completion, complete_reminder, Completion, CompletionOutcome};
pub use time::{Clock, FixedClock, SystemClock};
