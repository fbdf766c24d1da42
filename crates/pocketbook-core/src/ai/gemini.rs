//! Gemini backend implementation
//!
//! Calls the `generateContent` REST endpoint with JSON output forced via
//! `responseMimeType`. The system instruction travels as the first user turn,
//! acknowledged by a canned model turn, followed by recent history and the
//! new message.
//!
//! # Configuration
//!
//! - `GEMINI_API_KEY`: API key (required)
//! - `GEMINI_MODEL`: Model name (default: gemini-2.0-flash)
//! - `GEMINI_BASE_URL`: API root, overridable for tests

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{ChatConfig, ClassifierConfig, RetryConfig};
use crate::error::{Error, Result};
use crate::prompts::{self, PromptId, PromptLibrary};

use super::parsing::{extract_json, parse_category_suggestions, parse_intent};
use super::retry::RetryPolicy;
use super::types::{
    CategorizationItem, CategorySuggestion, ClassifiedIntent, ClassifierRequest, HistoryTurn,
    ReminderDraft, TransactionDraft, TurnRole,
};
use super::IntentClassifier;

/// Canned model turn that follows the system instruction
pub const SYSTEM_ACK: &str =
    "Understood. I am ready to act as the PocketBook financial assistant and will output strict JSON.";

/// Gemini `generateContent` backend
#[derive(Clone)]
pub struct GeminiBackend {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: String,
    temperature: f32,
    retry: RetryPolicy,
    history_limit: usize,
    context_limit: usize,
    prompts: Arc<RwLock<PromptLibrary>>,
}

impl GeminiBackend {
    /// Create a backend with default retry and context limits
    pub fn new(base_url: &str, model: &str, api_key: &str) -> Self {
        let chat = ChatConfig::default();
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            temperature: 0.1,
            retry: RetryPolicy::default(),
            history_limit: chat.classifier_history,
            context_limit: chat.context_transactions,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        }
    }

    /// Build from the layered config; fails without an API key
    pub fn from_config(
        classifier: &ClassifierConfig,
        retry: &RetryConfig,
        chat: &ChatConfig,
    ) -> Result<Self> {
        let api_key = classifier
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("GEMINI_API_KEY is not set".into()))?;

        let http_client = Client::builder()
            .timeout(Duration::from_secs(classifier.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http_client,
            base_url: classifier.base_url.trim_end_matches('/').to_string(),
            model: classifier.model.clone(),
            api_key: api_key.to_string(),
            temperature: classifier.temperature,
            retry: RetryPolicy::from(retry),
            history_limit: chat.classifier_history,
            context_limit: chat.context_transactions,
            prompts: Arc::new(RwLock::new(PromptLibrary::new())),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use only the compiled-in prompt templates
    pub fn with_embedded_prompts(mut self) -> Self {
        self.prompts = Arc::new(RwLock::new(PromptLibrary::embedded_only()));
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    fn render(
        &self,
        id: PromptId,
        system: bool,
        vars: &HashMap<&str, String>,
    ) -> Result<String> {
        let mut library = self
            .prompts
            .write()
            .map_err(|_| Error::InvalidData("Failed to acquire prompt library lock".into()))?;
        let prompt = library.get(id)?;
        Ok(if system {
            prompt.render_system(vars)
        } else {
            prompt.render_user(vars)
        })
    }

    /// Conversation payload for one classification
    fn classify_contents(&self, request: &ClassifierRequest) -> Result<Vec<Content>> {
        let mut vars = time_vars(&request.now);
        vars.insert(
            "context",
            prompts::context_block(&request.context, self.context_limit),
        );
        let system = self.render(PromptId::ClassifyIntent, true, &vars)?;

        let mut contents = vec![Content::user(system), Content::model(SYSTEM_ACK)];
        let skip = request.history.len().saturating_sub(self.history_limit);
        contents.extend(request.history.iter().skip(skip).map(Content::from));
        contents.push(Content::user(request.text.clone()));
        Ok(contents)
    }

    /// One `generateContent` round trip, returning the first candidate's text
    async fn generate(&self, contents: &[Content]) -> Result<String> {
        let request = GenerateRequest {
            contents,
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
                temperature: self.temperature,
            },
        };

        let response = self
            .http_client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().find_map(|p| p.text))
            .ok_or_else(|| Error::InvalidData("No response from Gemini API".into()))
    }

    /// Single-prompt call with retry
    async fn generate_with_retry(&self, label: &str, prompt: String) -> Result<String> {
        let contents = vec![Content::user(prompt)];
        let contents = &contents;
        self.retry
            .run(label, move || self.generate(contents))
            .await
    }
}

fn time_vars(now: &DateTime<FixedOffset>) -> HashMap<&'static str, String> {
    let mut vars = HashMap::new();
    vars.insert("date", now.format("%Y-%m-%d").to_string());
    vars.insert("time", now.format("%H:%M").to_string());
    vars
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: &'a [Content],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }

    fn model(text: impl Into<String>) -> Self {
        Self {
            role: "model".to_string(),
            parts: vec![Part {
                text: Some(text.into()),
            }],
        }
    }
}

impl From<&HistoryTurn> for Content {
    fn from(turn: &HistoryTurn) -> Self {
        match turn.role {
            TurnRole::User => Content::user(turn.content.clone()),
            TurnRole::Assistant => Content::model(turn.content.clone()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[async_trait]
impl IntentClassifier for GeminiBackend {
    async fn classify(&self, request: &ClassifierRequest) -> Result<ClassifiedIntent> {
        let contents = self.classify_contents(request)?;
        let contents = &contents;
        let raw = self
            .retry
            .run("classify", move || self.generate(contents))
            .await?;
        debug!(model = %self.model, response_len = raw.len(), "Classifier response");
        parse_intent(&raw)
    }

    async fn suggest_categories(&self, items: &[CategorizationItem]) -> Vec<CategorySuggestion> {
        if items.is_empty() {
            return Vec::new();
        }
        let mut vars = HashMap::new();
        vars.insert("categories", prompts::suggested_categories());
        vars.insert("transactions", prompts::categorization_lines(items));

        let result = match self.render(PromptId::SuggestCategories, false, &vars) {
            Ok(prompt) => self.generate_with_retry("suggest_categories", prompt).await,
            Err(e) => Err(e),
        };
        match result.and_then(|raw| parse_category_suggestions(&raw)) {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!(error = %e, count = items.len(), "Category suggestion failed");
                Vec::new()
            }
        }
    }

    async fn extract_transaction(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<TransactionDraft> {
        let mut vars = time_vars(&now);
        vars.insert("text", text.to_string());
        vars.insert("categories", prompts::suggested_categories());
        let prompt = self.render(PromptId::ExtractTransaction, false, &vars)?;
        let raw = self.generate_with_retry("extract_transaction", prompt).await?;
        Ok(serde_json::from_value(extract_json(&raw)?)?)
    }

    async fn extract_reminder(
        &self,
        text: &str,
        now: DateTime<FixedOffset>,
    ) -> Result<ReminderDraft> {
        let mut vars = time_vars(&now);
        vars.insert("text", text.to_string());
        let prompt = self.render(PromptId::ExtractReminder, false, &vars)?;
        let raw = self.generate_with_retry("extract_reminder", prompt).await?;
        Ok(serde_json::from_value(extract_json(&raw)?)?)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
