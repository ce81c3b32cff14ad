use crate::constants::{models, transcripts};
use crate::error::{KaiwaError, Result};
use crate::llm::{LlmClient, Message};
use std::sync::Arc;

/// Keep only alphanumerics, spaces and underscores, then trim trailing
/// whitespace. The result is safe to embed in a file name.
pub fn sanitize_title(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Best-effort conversation titles from a completion model.
pub struct Titler {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl Titler {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self {
            client,
            model: models::DEFAULT_TITLE_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Title for the given opening messages. Never fails: any problem with
    /// the model yields [`transcripts::FALLBACK_TITLE`].
    pub async fn title(&self, prefix: &[Message]) -> String {
        if prefix.is_empty() {
            return transcripts::EMPTY_CHAT_TITLE.to_string();
        }

        match self.request_title(prefix).await {
            Ok(title) => title,
            Err(e) => {
                tracing::warn!(error = %e, "Title generation failed, using fallback");
                transcripts::FALLBACK_TITLE.to_string()
            }
        }
    }

    async fn request_title(&self, prefix: &[Message]) -> Result<String> {
        let excerpt: Vec<Message> = prefix
            .iter()
            .map(|m| Message::new(m.role, clip(&m.content, transcripts::TITLE_MESSAGE_CHARS)))
            .collect();
        let transcript = serde_json::to_string(&excerpt)?;
        let messages = [
            Message::system(transcripts::TITLE_PROMPT),
            Message::user(transcript),
        ];

        let raw = self.client.chat(&self.model, &messages).await?;
        let title = sanitize_title(&raw);
        if title.trim().is_empty() {
            return Err(KaiwaError::Completion(format!(
                "Unusable title returned: {raw:?}"
            )));
        }
        Ok(title)
    }
}

/// First `max` characters of `text`.
fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}
