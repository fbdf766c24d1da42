//! Layered configuration
//!
//! Config is loaded with a two-layer resolution:
//! 1. An explicit path, or the user override (~/.config/pocketbook/config.toml)
//! 2. The embedded defaults compiled into the binary
//!
//! Keys missing from an override keep their default. Environment variables
//! are applied last (see [`Config::apply_env`]).

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/pocketbook.toml");

/// Which classifier backend to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Gemini,
    Mock,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Gemini => "gemini",
            BackendKind::Mock => "mock",
        }
    }

    /// Parse a backend name; unknown names yield None
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gemini" | "google" => Some(BackendKind::Gemini),
            "mock" => Some(BackendKind::Mock),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    pub backend: BackendKind,
    pub model: String,
    pub base_url: String,
    /// Read from `GEMINI_API_KEY`; never stored in the file
    #[serde(skip)]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub timeout_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Gemini,
            model: "gemini-2.0-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            api_key: None,
            temperature: 0.1,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            multiplier: 2,
        }
    }
}

/// Conversation limits
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Turns kept in the rolling history
    pub history_limit: usize,
    /// Prior turns sent with each classification
    pub classifier_history: usize,
    /// Recent transactions embedded in the classification prompt
    pub context_transactions: usize,
    /// Default row limit for list queries
    pub result_limit: usize,
    /// Uncategorised transactions sent per cleanup request
    pub cleanup_batch: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: 20,
            classifier_history: 10,
            context_transactions: 5,
            result_limit: 10,
            cleanup_batch: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub classifier: ClassifierConfig,
    pub retry: RetryConfig,
    pub chat: ChatConfig,
}

impl Config {
    /// Load from `path`, the user override, or the embedded defaults, then
    /// apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = load_file(path)?;
        config.apply_env();
        Ok(config)
    }

    /// Parse TOML content; absent keys keep defaults
    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The compiled-in defaults
    pub fn embedded() -> Result<Self> {
        Self::parse(DEFAULT_CONFIG)
    }

    /// Apply `POCKETBOOK_AI_BACKEND`, `GEMINI_API_KEY`, `GEMINI_MODEL` and
    /// `GEMINI_BASE_URL` from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any key lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(name) = get("POCKETBOOK_AI_BACKEND") {
            match BackendKind::parse(&name) {
                Some(kind) => self.classifier.backend = kind,
                None => tracing::warn!(backend = %name, "Unknown POCKETBOOK_AI_BACKEND, keeping configured backend"),
            }
        }
        if let Some(key) = get("GEMINI_API_KEY") {
            self.classifier.api_key = Some(key);
        }
        if let Some(model) = get("GEMINI_MODEL") {
            self.classifier.model = model;
        }
        if let Some(url) = get("GEMINI_BASE_URL") {
            self.classifier.base_url = url;
        }
    }
}

/// Default user override location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pocketbook").join("config.toml"))
}

fn load_file(path: Option<&Path>) -> Result<Config> {
    let override_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                p.display()
            )))
        }
        None => default_config_path().filter(|p| p.exists()),
    };

    match override_path {
        Some(p) => {
            debug!(path = %p.display(), "Loading config override");
            let content = fs::read_to_string(&p)
                .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?;
            Config::parse(&content)
        }
        None => Config::embedded(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_embedded_matches_defaults() {
        let config = Config::embedded().unwrap();
        assert_eq!(config.classifier.backend, BackendKind::Gemini);
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.chat, ChatConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_defaults() {
        let config = Config::parse("[retry]\nmax_retries = 1\n\n[chat]\nresult_limit = 25\n").unwrap();
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.chat.result_limit, 25);
        assert_eq!(config.chat.history_limit, 20);
        assert_eq!(config.classifier.model, "gemini-2.0-flash");
    }

    #[test]
    fn test_invalid_toml() {
        let err = Config::parse("[retry\nmax_retries = ").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_explicit_path() {
        let err = load_file(Some(Path::new("/nonexistent/pocketbook.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("POCKETBOOK_AI_BACKEND", "MOCK"),
            ("GEMINI_API_KEY", "secret"),
            ("GEMINI_MODEL", "gemini-pro"),
            ("GEMINI_BASE_URL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.classifier.backend, BackendKind::Mock);
        assert_eq!(config.classifier.api_key.as_deref(), Some("secret"));
        assert_eq!(config.classifier.model, "gemini-pro");
        // Blank values are ignored
        assert_eq!(
            config.classifier.base_url,
            "https://generativelanguage.googleapis.com"
        );
    }

    #[test]
    fn test_unknown_backend_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|k| (k == "POCKETBOOK_AI_BACKEND").then(|| "openai".to_string()));
        assert_eq!(config.classifier.backend, BackendKind::Gemini);
    }
}
