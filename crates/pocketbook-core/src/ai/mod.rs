//! Intent classifier boundary
//!
//! Every chat turn goes through an [`IntentClassifier`], which turns free
//! text plus recent history into one [`Intent`]. The orchestrator never sees
//! raw model output.
//!
//! # Architecture
//!
//! - `IntentClassifier` trait: the operations the chat core needs
//! - `ClassifierClient` enum: concrete wrapper providing Clone + static dispatch
//! - Backends: `GeminiBackend` (HTTP), `MockClassifier` (scripted, tests)
//!
//! # Configuration
//!
//! See [`crate::config`]. `POCKETBOOK_AI_BACKEND` picks `gemini` (default) or
//! `mock`; the Gemini backend needs `GEMINI_API_KEY`.

mod gemini;
mod mock;
pub mod parsing;
pub mod retry;
pub mod types;

pub use gemini::{GeminiBackend, SYSTEM_ACK};
pub use mock::{MockClassifier, OUT_OF_SCOPE_MESSAGE};
pub use retry::RetryPolicy;
pub use types::*;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::config::{BackendKind, Config};
use crate::error::Result;

/// Operations backed by the language model
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Classify one user turn
    ///
    /// Transient failures are retried inside the backend; an `Err` here means
    /// retries are exhausted or the failure was not retryable.
    async fn classify(&self, request: &ClassifierRequest) -> Result<ClassifiedIntent>;

    /// Suggest categories for uncategorised transactions
    ///
    /// Never fails: errors are logged and yield an empty list.
    async fn suggest_categories(&self, items: &[CategorizationItem]) -> Vec<CategorySuggestion>;

    /// Extract a transaction from free text (smart input)
    async fn extract_transaction(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<TransactionDraft>;

    /// Extract a reminder from free text (smart input)
    async fn extract_reminder(&self, text: &str, now: DateTime<FixedOffset>)
        -> Result<ReminderDraft>;

    /// Model name (for logging)
    fn model(&self) -> &str;

    /// Host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete classifier client
#[derive(Clone)]
pub enum ClassifierClient {
    Gemini(GeminiBackend),
    Mock(MockClassifier),
}

impl ClassifierClient {
    /// Build the configured backend
    pub fn from_config(config: &Config) -> Result<Self> {
        match config.classifier.backend {
            BackendKind::Gemini => {
                GeminiBackend::from_config(&config.classifier, &config.retry, &config.chat)
                    .map(ClassifierClient::Gemini)
            }
            BackendKind::Mock => Ok(ClassifierClient::Mock(MockClassifier::new())),
        }
    }

    pub fn mock() -> Self {
        ClassifierClient::Mock(MockClassifier::new())
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            ClassifierClient::Gemini(_) => BackendKind::Gemini.as_str(),
            ClassifierClient::Mock(_) => BackendKind::Mock.as_str(),
        }
    }
}

#[async_trait]
impl IntentClassifier for ClassifierClient {
    async fn classify(&self, request: &ClassifierRequest) -> Result<ClassifiedIntent> {
        match self {
            ClassifierClient::Gemini(b) => b.classify(request).await,
            ClassifierClient::Mock(b) => b.classify(request).await,
        }
    }

    async fn suggest_categories(&self, items: &[CategorizationItem]) -> Vec<CategorySuggestion> {
        match self {
            ClassifierClient::Gemini(b) => b.suggest_categories(items).await,
            ClassifierClient::Mock(b) => b.suggest_categories(items).await,
        }
    }

    async fn extract_transaction(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<TransactionDraft> {
        match self {
            ClassifierClient::Gemini(b) => b.extract_transaction(text, now).await,
            ClassifierClient::Mock(b) => b.extract_transaction(text, now).await,
        }
    }

    async fn extract_reminder(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<ReminderDraft> {
        match self {
            ClassifierClient::Gemini(b) => b.extract_reminder(text, now).await,
            ClassifierClient::Mock(b) => b.extract_reminder(text, now).await,
        }
    }

    fn model(&self) -> &str {
        match self {
            ClassifierClient::Gemini(b) => b.model(),
            ClassifierClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            ClassifierClient::Gemini(b) => b.host(),
            ClassifierClient::Mock(b) => b.host(),
        }
    }
}
