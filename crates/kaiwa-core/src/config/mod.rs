use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::constants::{endpoints, models, modes};
use crate::error::{KaiwaError, Result};
use crate::gateway::{CompletionGateway, CompletionOptions, ResponseMode};
use crate::llm::{LlmClient, OpenAIClient};
use crate::transcript::{Titler, TranscriptStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub modes: ModeSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub title_model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
}

/// Sampling presets for the two response modes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModeSettings {
    pub default_temperature: f32,
    pub default_max_output_tokens: u32,
    pub deliberate_temperature: f32,
    pub deliberate_max_output_tokens: u32,
    pub web_search_context_size: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StorageSettings {
    pub save_dir: Option<PathBuf>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: models::DEFAULT_CHAT_MODEL.to_string(),
            title_model: models::DEFAULT_TITLE_MODEL.to_string(),
            api_key_env: endpoints::DEFAULT_API_KEY_ENV.to_string(),
            base_url: None,
        }
    }
}

impl Default for ModeSettings {
    fn default() -> Self {
        Self {
            default_temperature: modes::DEFAULT_TEMPERATURE,
            default_max_output_tokens: modes::DEFAULT_MAX_OUTPUT_TOKENS,
            deliberate_temperature: modes::DELIBERATE_TEMPERATURE,
            deliberate_max_output_tokens: modes::DELIBERATE_MAX_OUTPUT_TOKENS,
            web_search_context_size: modes::WEB_SEARCH_CONTEXT_SIZE.to_string(),
        }
    }
}

impl ModeSettings {
    pub fn options(&self, mode: ResponseMode, web_search: bool) -> CompletionOptions {
        let (temperature, max_output_tokens) = match mode {
            ResponseMode::Default => (self.default_temperature, self.default_max_output_tokens),
            ResponseMode::Deliberate => (
                self.deliberate_temperature,
                self.deliberate_max_output_tokens,
            ),
        };
        CompletionOptions {
            temperature: Some(temperature),
            max_output_tokens: Some(max_output_tokens),
            web_search,
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kaiwa")
            .join("config.toml")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Read settings from `path`, falling back to defaults when the file is
    /// missing or unparseable.
    pub fn load_from(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| KaiwaError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the API key from the environment variable specified in settings.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    /// The API key, or the error that ends the session before any request.
    pub fn require_api_key(&self) -> Result<String> {
        self.api_key()
            .ok_or_else(|| KaiwaError::MissingCredential(self.llm.api_key_env.clone()))
    }

    pub fn transcript_dir(&self) -> PathBuf {
        self.storage
            .save_dir
            .clone()
            .unwrap_or_else(TranscriptStore::default_dir)
    }

    pub fn options_for(&self, mode: ResponseMode, web_search: bool) -> CompletionOptions {
        self.modes.options(mode, web_search)
    }

    /// Build the completion client. Fails when the credential is missing.
    pub fn build_llm_client(&self) -> Result<Arc<dyn LlmClient>> {
        let api_key = self.require_api_key()?;
        let mut client = OpenAIClient::new(api_key);
        if let Some(ref base_url) = self.llm.base_url {
            client = client.with_base_url(base_url.clone());
        }
        Ok(Arc::new(client))
    }

    pub fn build_gateway(&self, client: Arc<dyn LlmClient>) -> CompletionGateway {
        CompletionGateway::new(client)
            .with_model(self.llm.model.clone())
            .with_web_search_context_size(self.modes.web_search_context_size.clone())
    }

    pub fn build_titler(&self, client: Arc<dyn LlmClient>) -> Titler {
        Titler::new(client).with_model(self.llm.title_model.clone())
    }

    pub fn build_store(&self) -> TranscriptStore {
        TranscriptStore::new(self.transcript_dir())
    }
}
