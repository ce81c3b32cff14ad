/// kaiwa: centralized constants.
/// Model names, endpoints, prompts and mode presets live here.

// ─── Models ───────────────────────────────────────────────────────────────────

pub mod models {
    pub const DEFAULT_CHAT_MODEL: &str = "gpt-4.1-mini";
    pub const DEFAULT_TITLE_MODEL: &str = "gpt-4.1-mini";
}

// ─── API Endpoints ────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const OPENAI_BASE_URL: &str = "https://api.openai.com";
    pub const RESPONSES_PATH: &str = "/v1/responses";
    pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";
    pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
}

// ─── Response Modes ───────────────────────────────────────────────────────────

pub mod modes {
    pub const DEFAULT_TEMPERATURE: f32 = 0.7;
    pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 512;

    /// "Deliberate" trades randomness for longer, more exhaustive answers.
    pub const DELIBERATE_TEMPERATURE: f32 = 0.1;
    pub const DELIBERATE_MAX_OUTPUT_TOKENS: u32 = 2048;

    pub const WEB_SEARCH_TOOL: &str = "web_search";
    pub const WEB_SEARCH_CONTEXT_SIZE: &str = "medium";
}

// ─── Transcripts ──────────────────────────────────────────────────────────────

pub mod transcripts {
    pub const EXTENSION: &str = "json";
    pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
    pub const SAVE_DIR_NAME: &str = "saved_chats";
    pub const JSON_INDENT: &[u8] = b"    ";

    /// Only the opening turns are sent for titling.
    pub const TITLE_PREFIX_MESSAGES: usize = 3;
    pub const MAX_TITLE_CHARS: usize = 64;
    /// Per-message cap on what the title model sees.
    pub const TITLE_MESSAGE_CHARS: usize = 500;

    pub const TITLE_PROMPT: &str =
        "Generate a title for the following conversation in 20 characters or fewer. \
         Reply with the title only.";
    pub const FALLBACK_TITLE: &str = "Untitled chat";
    pub const EMPTY_CHAT_TITLE: &str = "Empty chat";

    pub const MARKDOWN_FILE_PREFIX: &str = "chat_history";
}

// ─── Documents ────────────────────────────────────────────────────────────────

pub mod documents {
    /// Present in every failed extraction result; never in extracted text we produce.
    pub const EXTRACTION_ERROR_MARKER: &str = "An error occurred while extracting text from the file";

    pub const CONTEXT_PROMPT: &str =
        "You are a data analysis assistant. Answer the user's questions based on the \
         following file contents.";
}
