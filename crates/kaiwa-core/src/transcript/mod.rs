pub mod store;
pub mod titler;

pub use store::{list_transcripts, to_transcript_json, SavedTranscript, TranscriptStore};
pub use titler::{sanitize_title, Titler};
