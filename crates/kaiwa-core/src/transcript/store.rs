use crate::constants::transcripts;
use crate::error::{KaiwaError, Result};
use crate::llm::Message;
use crate::transcript::titler::{sanitize_title, Titler};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::cmp::Reverse;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedTranscript {
    pub path: PathBuf,
    pub file_name: String,
    pub title: String,
}

impl fmt::Display for SavedTranscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Conversation saved: {}", self.path.display())
    }
}

/// Serialize a history the way transcripts are stored: pretty-printed,
/// four-space indent, non-ASCII written verbatim.
pub fn to_transcript_json(history: &[Message]) -> Result<String> {
    let formatter = serde_json::ser::PrettyFormatter::with_indent(transcripts::JSON_INDENT);
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    history.serialize(&mut ser)?;
    // serde_json only emits valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// The title as it appears in a file name: sanitized, length-capped and
/// never empty.
pub fn file_title(title: &str) -> String {
    let title = sanitize_title(title);
    if title.trim().is_empty() {
        return transcripts::FALLBACK_TITLE.to_string();
    }
    title
        .chars()
        .take(transcripts::MAX_TITLE_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// `YYYYMMDD_HHMMSS_<title>` without extension or collision suffix.
pub fn transcript_stem(now: DateTime<Local>, title: &str) -> String {
    format!(
        "{}_{}",
        now.format(transcripts::TIMESTAMP_FORMAT),
        file_title(title)
    )
}

/// Transcript file names in `dir`, most recently modified first.
/// Equal modification times fall back to file name order. A missing
/// directory has no transcripts.
pub fn list_transcripts(dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(dir = %dir.display(), error = %e, "Failed to read transcript directory");
            }
            return Vec::new();
        }
    };

    let mut files: Vec<(SystemTime, String)> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let path = entry.path();
            path.is_file()
                && path.extension().and_then(|e| e.to_str()) == Some(transcripts::EXTENSION)
        })
        .filter_map(|entry| {
            let name = entry.file_name().into_string().ok()?;
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, name))
        })
        .collect();

    files.sort_by(|a, b| Reverse(a.0).cmp(&Reverse(b.0)).then_with(|| a.1.cmp(&b.1)));
    files.into_iter().map(|(_, name)| name).collect()
}

/// Owns the on-disk transcripts in one directory.
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `<data dir>/kaiwa/saved_chats`, or `./saved_chats` when the platform
    /// has no data directory.
    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .map(|d| d.join("kaiwa"))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(transcripts::SAVE_DIR_NAME)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Title the conversation from its opening messages and write it.
    pub async fn save(&self, history: &[Message], titler: &Titler) -> Result<SavedTranscript> {
        if history.is_empty() {
            return Err(KaiwaError::EmptyHistory);
        }

        let prefix_len = history.len().min(transcripts::TITLE_PREFIX_MESSAGES);
        let title = titler.title(&history[..prefix_len]).await;
        self.save_with_title(history, &title, Local::now())
    }

    /// Write `history` under an explicit title and timestamp.
    pub fn save_with_title(
        &self,
        history: &[Message],
        title: &str,
        now: DateTime<Local>,
    ) -> Result<SavedTranscript> {
        if history.is_empty() {
            return Err(KaiwaError::EmptyHistory);
        }

        let contents = to_transcript_json(history)?;
        fs::create_dir_all(&self.dir).map_err(|e| KaiwaError::persistence(&self.dir, e))?;

        let title = file_title(title);
        let stem = transcript_stem(now, &title);

        let mut attempt = 1;
        loop {
            let file_name = if attempt == 1 {
                format!("{stem}.{}", transcripts::EXTENSION)
            } else {
                format!("{stem}_{attempt}.{}", transcripts::EXTENSION)
            };
            let path = self.dir.join(&file_name);

            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    attempt += 1;
                    continue;
                }
                Err(e) => return Err(KaiwaError::persistence(path, e)),
            };

            if let Err(e) = file.write_all(contents.as_bytes()).and_then(|_| file.sync_all()) {
                drop(file);
                let _ = fs::remove_file(&path);
                return Err(KaiwaError::persistence(path, e));
            }

            tracing::info!(path = %path.display(), messages = history.len(), "Transcript saved");
            return Ok(SavedTranscript {
                path,
                file_name,
                title,
            });
        }
    }

    pub fn list(&self) -> Vec<String> {
        list_transcripts(&self.dir)
    }

    /// A bare file name resolves inside the store directory; anything with
    /// a directory component is used as given.
    pub fn resolve(&self, identifier: &str) -> PathBuf {
        let path = Path::new(identifier);
        if path.is_absolute() || path.components().count() > 1 {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    pub fn try_load(&self, identifier: &str) -> Result<Vec<Message>> {
        let path = self.resolve(identifier);
        let contents =
            fs::read_to_string(&path).map_err(|e| KaiwaError::deserialization(&path, e))?;
        let history: Vec<Message> =
            serde_json::from_str(&contents).map_err(|e| KaiwaError::deserialization(&path, e))?;

        tracing::info!(path = %path.display(), messages = history.len(), "Transcript loaded");
        Ok(history)
    }

    /// Load a transcript, degrading to an empty history when the file is
    /// missing or malformed.
    pub fn load(&self, identifier: &str) -> Vec<Message> {
        self.try_load(identifier).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to an empty history");
            Vec::new()
        })
    }
}
