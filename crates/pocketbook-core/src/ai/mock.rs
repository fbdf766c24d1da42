//! Mock classifier for testing
//!
//! Scripted raw responses are parsed exactly like model output, so tests
//! exercise the same JSON handling as the real backend. With nothing
//! scripted, a small keyword matcher answers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};

use crate::error::{Error, Result};

use super::parsing::{extract_json, parse_intent};
use super::types::{
    CategorizationItem, CategorySuggestion, ClassifiedIntent, ClassifierRequest, Intent,
    MessageIntent, ReminderDraft, TransactionDraft,
};
use super::IntentClassifier;

/// Reply for anything the keyword matcher does not recognise
pub const OUT_OF_SCOPE_MESSAGE: &str =
    "I can only help with transactions, reminders, and financial insights.";

#[derive(Default)]
struct MockState {
    responses: VecDeque<Result<String>>,
    requests: Vec<ClassifierRequest>,
    suggestions: Vec<CategorySuggestion>,
    suggestion_calls: Vec<Vec<CategorizationItem>>,
}

/// Mock intent classifier
///
/// Clones share one script, so a test can keep a handle after moving a
/// clone into the session.
#[derive(Clone, Default)]
pub struct MockClassifier {
    state: Arc<Mutex<MockState>>,
}

impl MockClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        // A poisoned lock only means another test thread panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Queue a raw model response for the next classify call
    pub fn push_response(&self, raw: impl Into<String>) {
        self.state().responses.push_back(Ok(raw.into()));
    }

    /// Queue a failure for the next classify call
    pub fn push_error(&self, error: Error) {
        self.state().responses.push_back(Err(error));
    }

    /// Suggestions returned by every `suggest_categories` call
    pub fn set_suggestions(&self, suggestions: Vec<CategorySuggestion>) {
        self.state().suggestions = suggestions;
    }

    /// Requests seen by `classify`, oldest first
    pub fn requests(&self) -> Vec<ClassifierRequest> {
        self.state().requests.clone()
    }

    /// Batches seen by `suggest_categories`
    pub fn suggestion_calls(&self) -> Vec<Vec<CategorizationItem>> {
        self.state().suggestion_calls.clone()
    }

    pub fn pending(&self) -> usize {
        self.state().responses.len()
    }
}

/// Keyword fallback used when no response is scripted
fn keyword_intent(text: &str) -> Intent {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    let greeting = lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|w| matches!(w, "hi" | "hello" | "hey" | "thanks"));

    if greeting || has(&["thank you"]) {
        Intent::Greeting(MessageIntent::default())
    } else if has(&["subscription", "recurring"]) {
        Intent::Subscription
    } else if has(&["health", "score"]) {
        Intent::HealthScore
    } else if has(&["categor", "clean up", "cleanup"]) {
        Intent::CleanupCategories
    } else {
        Intent::unknown(OUT_OF_SCOPE_MESSAGE)
    }
}

/// First number in the text, ignoring thousands separators
fn first_amount(text: &str) -> f64 {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.' || c == ','))
        .map(|s| s.replace(',', ""))
        .find_map(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0)
}

#[async_trait]
impl IntentClassifier for MockClassifier {
    async fn classify(&self, request: &ClassifierRequest) -> Result<ClassifiedIntent> {
        let scripted = {
            let mut state = self.state();
            state.requests.push(request.clone());
            state.responses.pop_front()
        };

        match scripted {
            Some(Ok(raw)) => parse_intent(&raw),
            Some(Err(e)) => Err(e),
            None => Ok(ClassifiedIntent::new(keyword_intent(&request.text))),
        }
    }

    async fn suggest_categories(&self, items: &[CategorizationItem]) -> Vec<CategorySuggestion> {
        let mut state = self.state();
        state.suggestion_calls.push(items.to_vec());
        state.suggestions.clone()
    }

    async fn extract_transaction(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<TransactionDraft> {
        if let Some(Ok(raw)) = self.next_scripted() {
            return Ok(serde_json::from_value(extract_json(&raw)?)?);
        }
        Ok(TransactionDraft {
            amount: first_amount(text),
            description: Some(text.trim().to_string()),
            date: Some(now.date_naive()),
            ..TransactionDraft::default()
        })
    }

    async fn extract_reminder(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<ReminderDraft> {
        if let Some(Ok(raw)) = self.next_scripted() {
            return Ok(serde_json::from_value(extract_json(&raw)?)?);
        }
        Ok(ReminderDraft {
            title: Some(text.trim().to_string()),
            amount: first_amount(text),
            date: Some(now.date_naive()),
            ..ReminderDraft::default()
        })
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

impl MockClassifier {
    fn next_scripted(&self) -> Option<Result<String>> {
        self.state().responses.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::types::ClassifierContext;
    use crate::time::{Clock, FixedClock};
    use chrono::NaiveDate;

    fn request(text: &str) -> ClassifierRequest {
        ClassifierRequest {
            text: text.into(),
            history: vec![],
            context: ClassifierContext::default(),
            now: FixedClock::on(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()).now(),
        }
    }

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let mock = MockClassifier::new();
        mock.push_response(r#"{"type": "subscription"}"#);
        mock.push_error(Error::Api {
            status: 503,
            message: "busy".into(),
        });

        let first = mock.classify(&request("a")).await.unwrap();
        assert_eq!(first.intent, Intent::Subscription);
        assert!(mock.classify(&request("b")).await.is_err());
        assert_eq!(mock.requests().len(), 2);
        assert_eq!(mock.pending(), 0);
    }

    #[tokio::test]
    async fn test_keyword_fallback() {
        let mock = MockClassifier::new();
        let hi = mock.classify(&request("hi")).await.unwrap();
        assert_eq!(hi.intent.type_name(), "greeting");

        let other = mock.classify(&request("What's the weather?")).await.unwrap();
        assert_eq!(other.intent, Intent::unknown(OUT_OF_SCOPE_MESSAGE));
    }

    #[tokio::test]
    async fn test_clones_share_script() {
        let mock = MockClassifier::new();
        let handle = mock.clone();
        handle.push_response(r#"{"type": "health_score"}"#);
        let result = mock.classify(&request("x")).await.unwrap();
        assert_eq!(result.intent, Intent::HealthScore);
        assert_eq!(handle.requests()[0].text, "x");
    }

    #[tokio::test]
    async fn test_extract_transaction_fallback() {
        let mock = MockClassifier::new();
        let now = FixedClock::on(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()).now();
        let draft = mock
            .extract_transaction("Paid 1,250 for groceries", now)
            .await
            .unwrap();
        assert_eq!(draft.amount, 1250.0);
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2024, 3, 15));
    }
}
