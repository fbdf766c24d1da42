//! Chat event bus
//!
//! UI regions that are not the chat itself (quick actions, a floating
//! button) open, close or toggle the chat by publishing on a [`ChatBus`].
//! The session publishes toast notifications on the same bus.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastLevel {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum ChatEvent {
    /// Open the chat, optionally sending `prompt` as the first message
    Open { prompt: Option<String> },
    Close,
    Toggle,
    /// Transient notification for the host to display
    Toast { level: ToastLevel, message: String },
}

/// Broadcast channel shared by publishers and the chat session
#[derive(Debug, Clone)]
pub struct ChatBus {
    tx: broadcast::Sender<ChatEvent>,
}

impl Default for ChatBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChatBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; returns how many subscribers received it
    pub fn publish(&self, event: ChatEvent) -> usize {
        match self.tx.send(event) {
            Ok(n) => n,
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "No chat bus subscribers");
                0
            }
        }
    }

    pub fn open(&self, prompt: Option<String>) -> usize {
        self.publish(ChatEvent::Open { prompt })
    }

    pub fn close(&self) -> usize {
        self.publish(ChatEvent::Close)
    }

    pub fn toggle(&self) -> usize {
        self.publish(ChatEvent::Toggle)
    }

    pub fn toast(&self, level: ToastLevel, message: impl Into<String>) -> usize {
        self.publish(ChatEvent::Toast {
            level,
            message: message.into(),
        })
    }
}
