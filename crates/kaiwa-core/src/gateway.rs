use crate::constants::{models, modes};
use crate::error::{KaiwaError, Result};
use crate::llm::{LlmClient, Message, ResponseRequest, StreamEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Per-request tuning knobs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    pub web_search: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    #[default]
    Default,
    Deliberate,
}

impl std::str::FromStr for ResponseMode {
    type Err = KaiwaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "default" | "normal" => Ok(ResponseMode::Default),
            "deliberate" | "deep" => Ok(ResponseMode::Deliberate),
            other => Err(KaiwaError::Config(format!("Unknown response mode: {other}"))),
        }
    }
}

/// Split a history into request instructions and conversational input.
///
/// System messages never reach `input`. If several are present the last
/// one wins, matching the replace-on-set rule of [`crate::Session`].
pub fn split_instructions(history: &[Message]) -> (Option<String>, Vec<Message>) {
    let mut instructions = None;
    let mut input = Vec::with_capacity(history.len());
    for message in history {
        if message.is_system() {
            instructions = Some(message.content.clone());
        } else {
            input.push(message.clone());
        }
    }
    (instructions.filter(|i| !i.is_empty()), input)
}

/// Translates a history plus options into one outbound request.
pub struct CompletionGateway {
    client: Arc<dyn LlmClient>,
    model: String,
    web_search_context_size: String,
}

impl CompletionGateway {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            model: models::DEFAULT_CHAT_MODEL.to_string(),
            web_search_context_size: modes::WEB_SEARCH_CONTEXT_SIZE.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_web_search_context_size(mut self, size: impl Into<String>) -> Self {
        self.web_search_context_size = size.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    fn web_search_tool(&self) -> Value {
        serde_json::json!({
            "type": modes::WEB_SEARCH_TOOL,
            "search_context_size": self.web_search_context_size,
        })
    }

    pub fn build_request(&self, history: &[Message], options: &CompletionOptions) -> ResponseRequest {
        let (instructions, input) = split_instructions(history);
        ResponseRequest {
            model: self.model.clone(),
            instructions,
            input,
            temperature: options.temperature,
            max_output_tokens: options.max_output_tokens,
            tools: options.web_search.then(|| vec![self.web_search_tool()]),
            stream: None,
        }
    }

    pub async fn complete(&self, history: &[Message], options: &CompletionOptions) -> Result<String> {
        let request = self.build_request(history, options);
        self.client.respond(&request).await.map_err(into_completion)
    }

    /// Like [`complete`](Self::complete) but hands each text fragment to
    /// `on_delta` as it arrives. Returns the concatenated text.
    pub async fn complete_stream<F>(
        &self,
        history: &[Message],
        options: &CompletionOptions,
        mut on_delta: F,
    ) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        use futures::StreamExt;

        let request = self.build_request(history, options);
        let mut rx = self
            .client
            .respond_stream(&request)
            .await
            .map_err(into_completion)?;

        let mut text = String::new();
        while let Some(event) = rx.next().await {
            match event {
                StreamEvent::TextDelta(delta) => {
                    on_delta(&delta);
                    text.push_str(&delta);
                }
                StreamEvent::Done => return Ok(text),
                StreamEvent::Error(e) => return Err(KaiwaError::Completion(e)),
            }
        }
        Err(KaiwaError::Completion(
            "stream ended before completion".to_string(),
        ))
    }
}

fn into_completion(err: KaiwaError) -> KaiwaError {
    match err {
        KaiwaError::Completion(_) => err,
        other => KaiwaError::Completion(other.to_string()),
    }
}
