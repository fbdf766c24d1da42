//! Prompt library for the intent classifier
//!
//! Prompts are loaded with a two-layer resolution:
//! 1. Check for an override in the data dir (~/.local/share/pocketbook/prompts/)
//! 2. Fall back to the embedded default compiled into the binary
//!
//! Templates use `{{var}}` placeholders and are split into `# System` and
//! `# User` sections.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use crate::ai::types::{CategorizationItem, ClassifierContext, SUGGESTED_CATEGORIES};
use crate::error::{Error, Result};
use crate::format::format_inr;

mod defaults {
    pub const CLASSIFY_INTENT: &str = include_str!("../../../prompts/classify_intent.md");
    pub const EXTRACT_TRANSACTION: &str = include_str!("../../../prompts/extract_transaction.md");
    pub const EXTRACT_REMINDER: &str = include_str!("../../../prompts/extract_reminder.md");
    pub const SUGGEST_CATEGORIES: &str = include_str!("../../../prompts/suggest_categories.md");
}

/// Known prompt IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptId {
    /// System instruction for per-turn intent classification
    ClassifyIntent,
    /// Smart-input transaction extraction
    ExtractTransaction,
    /// Smart-input reminder extraction
    ExtractReminder,
    /// Batch recategorisation of uncategorised transactions
    SuggestCategories,
}

impl PromptId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClassifyIntent => "classify_intent",
            Self::ExtractTransaction => "extract_transaction",
            Self::ExtractReminder => "extract_reminder",
            Self::SuggestCategories => "suggest_categories",
        }
    }

    pub fn all() -> &'static [PromptId] {
        &[
            Self::ClassifyIntent,
            Self::ExtractTransaction,
            Self::ExtractReminder,
            Self::SuggestCategories,
        ]
    }

    fn default_content(&self) -> &'static str {
        match self {
            Self::ClassifyIntent => defaults::CLASSIFY_INTENT,
            Self::ExtractTransaction => defaults::EXTRACT_TRANSACTION,
            Self::ExtractReminder => defaults::EXTRACT_REMINDER,
            Self::SuggestCategories => defaults::SUGGEST_CATEGORIES,
        }
    }
}

/// A loaded prompt template
#[derive(Debug, Clone)]
pub struct Prompt {
    pub id: PromptId,
    pub content: String,
    /// Whether this came from an override file
    pub is_override: bool,
}

impl Prompt {
    pub fn system_section(&self) -> Option<&str> {
        extract_section(&self.content, "# System")
    }

    pub fn user_section(&self) -> Option<&str> {
        extract_section(&self.content, "# User")
    }

    /// Render the system section (or the whole template when it has none)
    pub fn render_system(&self, vars: &HashMap<&str, String>) -> String {
        render(self.system_section().unwrap_or(&self.content), vars)
    }

    /// Render the user section (or the whole template when it has none)
    pub fn render_user(&self, vars: &HashMap<&str, String>) -> String {
        render(self.user_section().unwrap_or(&self.content), vars)
    }
}

/// Replace `{{key}}` placeholders; unknown placeholders are left as-is
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let pattern = format!("{{{{{}}}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}

fn extract_section<'a>(content: &'a str, header: &str) -> Option<&'a str> {
    let start = content.find(header)?;
    let after_header = &content[start + header.len()..];
    let end = after_header.find("\n# ").unwrap_or(after_header.len());
    Some(after_header[..end].trim())
}

/// Prompt library with override lookup and caching
#[derive(Debug, Clone, Default)]
pub struct PromptLibrary {
    override_dir: Option<PathBuf>,
    cache: HashMap<PromptId, Prompt>,
}

impl PromptLibrary {
    /// Library using the default override directory
    pub fn new() -> Self {
        Self {
            override_dir: default_prompts_dir(),
            cache: HashMap::new(),
        }
    }

    pub fn with_override_dir(path: PathBuf) -> Self {
        Self {
            override_dir: Some(path),
            cache: HashMap::new(),
        }
    }

    /// Library that only ever uses the compiled-in templates
    pub fn embedded_only() -> Self {
        Self::default()
    }

    /// Get a prompt, loading it on first use
    pub fn get(&mut self, id: PromptId) -> Result<&Prompt> {
        if !self.cache.contains_key(&id) {
            let prompt = self.load(id)?;
            self.cache.insert(id, prompt);
        }
        self.cache
            .get(&id)
            .ok_or_else(|| Error::NotFound(format!("prompt {}", id.as_str())))
    }

    fn load(&self, id: PromptId) -> Result<Prompt> {
        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.md", id.as_str()));
            if path.exists() {
                let content = fs::read_to_string(&path).map_err(|e| {
                    Error::InvalidData(format!("Failed to read prompt override: {}", e))
                })?;
                tracing::debug!(prompt = id.as_str(), path = %path.display(), "Using prompt override");
                return Ok(Prompt {
                    id,
                    content,
                    is_override: true,
                });
            }
        }

        Ok(Prompt {
            id,
            content: id.default_content().to_string(),
            is_override: false,
        })
    }

    pub fn has_override(&self, id: PromptId) -> bool {
        self.override_dir
            .as_ref()
            .is_some_and(|d| d.join(format!("{}.md", id.as_str())).exists())
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

/// Default prompts override directory
pub fn default_prompts_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("pocketbook").join("prompts"))
}

/// Data summary block embedded in the classification prompt
///
/// Lists the known categories and up to `limit` recent transactions as
/// `- {date}: {description} ({type}) ₹{amount} [{category}]`.
pub fn context_block(context: &ClassifierContext, limit: usize) -> String {
    let mut block = String::from("\nCONTEXT:\n");
    let categories = if context.categories.is_empty() {
        "None yet".to_string()
    } else {
        context.categories.join(", ")
    };
    block.push_str(&format!("Existing categories: {}\n", categories));

    if !context.recent.is_empty() {
        block.push_str("Recent transactions:\n");
        for tx in context.recent.iter().take(limit) {
            block.push_str(&format!(
                "- {}: {} ({}) {} [{}]\n",
                tx.local_date().format("%Y-%m-%d"),
                tx.description,
                tx.kind.as_str(),
                format_inr(tx.amount(), 2),
                tx.category()
            ));
        }
    }
    block
}

/// Category list shown to the model for suggestions and extraction
pub fn suggested_categories() -> String {
    SUGGESTED_CATEGORIES.join(", ")
}

/// One `id | description | amount` line per transaction
pub fn categorization_lines(items: &[CategorizationItem]) -> String {
    items
        .iter()
        .map(|item| {
            format!(
                "- id: {}, description: \"{}\", amount: {}",
                item.id, item.description, item.amount
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
