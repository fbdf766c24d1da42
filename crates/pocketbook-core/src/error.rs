//! Error types for PocketBook

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Classifier API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(format!("Invalid config TOML: {}", e))
    }
}

impl Error {
    /// Whether a failed classifier call is worth retrying
    ///
    /// Overload and transient server errors (429, 500, 503) qualify, as does
    /// any error whose text reports the model being under high demand.
    pub fn is_retryable(&self) -> bool {
        if let Error::Api { status, .. } = self {
            if matches!(status, 429 | 500 | 503) {
                return true;
            }
        }
        let text = self.to_string();
        text.contains("503") || text.to_lowercase().contains("high demand")
    }
}

pub type Result<T> = std::result::Result<T, Error>;
