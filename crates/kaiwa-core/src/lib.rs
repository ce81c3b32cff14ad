pub mod error;
pub mod constants;
pub mod llm;
pub mod session;
pub mod transcript;
pub mod export;
pub mod gateway;
pub mod documents;
pub mod config;

// Re-export key types
pub use error::{KaiwaError, Result};
pub use llm::{LlmClient, Message, ResponseRequest, Role, StreamEvent};
pub use session::{run_turn, Session, TurnEvent};
pub use transcript::{SavedTranscript, Titler, TranscriptStore};
pub use export::to_markdown;
pub use gateway::{CompletionGateway, CompletionOptions, ResponseMode};
pub use config::Settings;
