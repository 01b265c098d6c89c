use std::time::Duration;

use futures::StreamExt;
use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::config::Config;

// Completion parameters, fixed for the chat use case.
const TEMPERATURE: f64 = 0.6;
const TOP_P: f64 = 1.0;
const MAX_COMPLETION_TOKENS: u32 = 4096;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const CHANNEL_CAPACITY: usize = 32;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("completion request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("completion api returned {status}: {body}")]
    Api { status: StatusCode, body: String },
}

/// Streaming client for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct LlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, LlmError> {
        // Connect timeout only: the streamed response itself has no fixed
        // duration, so a whole-request timeout would cut answers short.
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Start a streamed completion for `prompt`. Content deltas arrive over
    /// the returned channel in generation order; a non-success status is
    /// reported here before any delta, a transport failure mid-stream as the
    /// channel's final item.
    pub async fn stream_completion(
        &self,
        prompt: &str,
    ) -> Result<mpsc::Receiver<Result<String, LlmError>>, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": TEMPERATURE,
            "max_completion_tokens": MAX_COMPLETION_TOKENS,
            "top_p": TOP_P,
            "stream": true,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(LlmError::Api { status, body });
        }

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let mut stream = res.bytes_stream();

        tokio::spawn(async move {
            let mut lines = LineBuffer::new();
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        for line in lines.complete(&bytes) {
                            match parse_event(&line) {
                                Some(SseEvent::Delta(content)) => {
                                    if tx.send(Ok(content)).await.is_err() {
                                        return;
                                    }
                                }
                                Some(SseEvent::Done) => return,
                                None => {}
                            }
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(LlmError::Http(err))).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// One parsed server-sent-event line.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(String),
    Done,
}

/// Reassembles complete lines from a byte stream. Bytes stay raw until a
/// terminator arrives and only complete lines are decoded, so a multi-byte
/// character split across network chunks comes through whole.
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn new() -> Self {
        Self { pending: Vec::new() }
    }

    fn complete(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }
}

fn parse_event(line: &str) -> Option<SseEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line == "data: [DONE]" {
        return Some(SseEvent::Done);
    }
    let data = line.strip_prefix("data: ")?;
    let json: Value = serde_json::from_str(data).ok()?;
    let content = json["choices"][0]["delta"]["content"].as_str()?;
    if content.is_empty() {
        return None;
    }
    Some(SseEvent::Delta(content.to_string()))
}
