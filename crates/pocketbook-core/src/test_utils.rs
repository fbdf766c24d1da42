//! Test utilities for pocketbook-core
//!
//! A scripted mock of the Gemini `generateContent` endpoint. Each request
//! pops the next queued reply; an empty queue answers with an `unknown`
//! intent.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    extract::{Json, State},
    http::StatusCode,
    routing::post,
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

#[derive(Default)]
struct Script {
    replies: VecDeque<(u16, Value)>,
    requests: Vec<Value>,
}

/// Mock Gemini server for tests
pub struct MockGeminiServer {
    addr: SocketAddr,
    script: Arc<Mutex<Script>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockGeminiServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let script = Arc::new(Mutex::new(Script::default()));
        let app = Router::new()
            .route("/v1beta/models/:call", post(handle_generate))
            .with_state(script.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            script,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Queue a successful reply whose first candidate carries `text`
    pub fn push_text(&self, text: &str) {
        let body = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] }
            }]
        });
        self.script.lock().unwrap().replies.push_back((200, body));
    }

    /// Queue an error reply in Gemini's error envelope
    pub fn push_status(&self, status: u16, message: &str) {
        let body = json!({
            "error": { "code": status, "message": message, "status": "UNAVAILABLE" }
        });
        self.script.lock().unwrap().replies.push_back((status, body));
    }

    /// Number of requests received so far
    pub fn request_count(&self) -> usize {
        self.script.lock().unwrap().requests.len()
    }

    /// Request bodies received so far
    pub fn requests(&self) -> Vec<Value> {
        self.script.lock().unwrap().requests.clone()
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_generate(
    State(script): State<Arc<Mutex<Script>>>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut script = script.lock().unwrap();
    script.requests.push(request);
    let (status, body) = script.replies.pop_front().unwrap_or_else(|| {
        (
            200,
            json!({
                "candidates": [{
                    "content": {
                        "role": "model",
                        "parts": [{ "text": "{\"type\": \"unknown\", \"message\": \"No scripted response\"}" }]
                    }
                }]
            }),
        )
    });
    (
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        Json(body),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_server_scripted_replies() {
        let server = MockGeminiServer::start().await;
        server.push_status(503, "overloaded");
        server.push_text("{}");

        let client = reqwest::Client::new();
        let url = format!("{}/v1beta/models/test:generateContent", server.url());

        let first = client.post(&url).json(&json!({})).send().await.unwrap();
        assert_eq!(first.status().as_u16(), 503);

        let second: Value = client
            .post(&url)
            .json(&json!({}))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(second["candidates"][0]["content"]["parts"][0]["text"], "{}");
        assert_eq!(server.request_count(), 2);
    }
}
