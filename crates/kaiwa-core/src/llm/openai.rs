use crate::constants::endpoints;
use crate::error::{KaiwaError, Result};
use crate::llm::traits::*;
use futures::channel::mpsc;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: endpoints::OPENAI_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| KaiwaError::Completion(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(KaiwaError::Completion(format!(
                "OpenAI API error ({}): {}",
                status, text
            )));
        }
        Ok(response)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Pull the assembled text out of a Responses API body. Prefers the
/// top-level `output_text` convenience field when the server provides it.
pub(crate) fn extract_output_text(body: &Value) -> Option<String> {
    if let Some(text) = body.get("output_text").and_then(|t| t.as_str()) {
        return Some(text.to_string());
    }

    let output = body.get("output")?.as_array()?;
    let mut text = String::new();
    let mut found = false;
    for item in output {
        let Some(parts) = item.get("content").and_then(|c| c.as_array()) else {
            continue;
        };
        for part in parts {
            if part.get("type").and_then(|t| t.as_str()) == Some("output_text") {
                if let Some(t) = part.get("text").and_then(|t| t.as_str()) {
                    text.push_str(t);
                    found = true;
                }
            }
        }
    }
    found.then_some(text)
}

/// Translate one SSE `data:` payload into a stream event.
/// Returns `None` for events that carry nothing we surface.
pub(crate) fn parse_stream_event(data: &str) -> Option<StreamEvent> {
    if data == "[DONE]" {
        return Some(StreamEvent::Done);
    }

    let event: Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "Skipping malformed stream chunk");
            return None;
        }
    };

    match event.get("type").and_then(|t| t.as_str())? {
        "response.output_text.delta" => event
            .get("delta")
            .and_then(|d| d.as_str())
            .map(|d| StreamEvent::TextDelta(d.to_string())),
        "response.completed" => Some(StreamEvent::Done),
        "response.failed" | "response.incomplete" => {
            let message = event
                .pointer("/response/error/message")
                .and_then(|m| m.as_str())
                .or_else(|| {
                    event
                        .pointer("/response/incomplete_details/reason")
                        .and_then(|m| m.as_str())
                })
                .unwrap_or("response did not complete");
            Some(StreamEvent::Error(message.to_string()))
        }
        "error" => {
            let message = event
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown stream error");
            Some(StreamEvent::Error(message.to_string()))
        }
        _ => None,
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAIClient {
    async fn respond(&self, request: &ResponseRequest) -> Result<String> {
        let mut body = request.clone();
        body.stream = None;

        tracing::debug!(model = %body.model, input = body.input.len(), "Sending response request");
        let response = self.post(endpoints::RESPONSES_PATH, &body).await?;
        let text = response
            .text()
            .await
            .map_err(|e| KaiwaError::Completion(format!("Failed to read response: {e}")))?;

        let value: Value = serde_json::from_str(&text)
            .map_err(|e| KaiwaError::Completion(format!("Failed to parse response: {e}")))?;

        extract_output_text(&value)
            .ok_or_else(|| KaiwaError::Completion("Response contained no output text".into()))
    }

    async fn respond_stream(
        &self,
        request: &ResponseRequest,
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>> {
        let mut body = request.clone();
        body.stream = Some(true);

        tracing::debug!(model = %body.model, input = body.input.len(), "Sending streaming response request");
        let response = self.post(endpoints::RESPONSES_PATH, &body).await?;

        let (tx, rx) = mpsc::unbounded();
        tokio::spawn(read_event_stream(response.bytes_stream(), tx));

        Ok(rx)
    }

    async fn chat(&self, model: &str, messages: &[Message]) -> Result<String> {
        let body = ChatRequest { model, messages };

        tracing::debug!(model, messages = messages.len(), "Sending chat request");
        let response = self.post(endpoints::CHAT_COMPLETIONS_PATH, &body).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| KaiwaError::Completion(format!("Failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| KaiwaError::Completion("No content in chat response".into()))
    }
}

/// Forward the events of an SSE body to `tx`.
///
/// Bytes are buffered until a full line arrives, so a multibyte character
/// split across chunks is decoded whole. A body that ends without a
/// terminal event is reported as an error.
async fn read_event_stream<S, B, E>(stream: S, tx: mpsc::UnboundedSender<StreamEvent>)
where
    S: Stream<Item = std::result::Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut stream = std::pin::pin!(stream);
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.unbounded_send(StreamEvent::Error(e.to_string()));
                return;
            }
        };
        buffer.extend_from_slice(chunk.as_ref());

        while let Some(line_end) = buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);

            let Some(data) = line.trim().strip_prefix("data:") else {
                continue;
            };

            match parse_stream_event(data.trim()) {
                Some(StreamEvent::TextDelta(text)) => {
                    let _ = tx.unbounded_send(StreamEvent::TextDelta(text));
                }
                Some(terminal) => {
                    let _ = tx.unbounded_send(terminal);
                    return;
                }
                None => {}
            }
        }
    }

    tracing::warn!("Response stream closed before completion");
    let _ = tx.unbounded_send(StreamEvent::Error(
        "stream ended before completion".to_string(),
    ));
}
