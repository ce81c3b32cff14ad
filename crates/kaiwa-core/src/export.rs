use crate::constants::transcripts;
use crate::llm::{Message, Role};
use chrono::{DateTime, Local};

const DOCUMENT_TITLE: &str = "# Conversation Transcript";
const USER_HEADING: &str = "## ■ Developer input";
const ASSISTANT_HEADING: &str = "## ■ Assistant response";

/// Render a history as a Markdown document, one heading and one literal
/// `text` block per message.
pub fn to_markdown(history: &[Message]) -> String {
    let mut lines = vec![format!("{DOCUMENT_TITLE}\n")];
    for message in history {
        let heading = match message.role {
            Role::User => USER_HEADING,
            Role::Assistant | Role::System => ASSISTANT_HEADING,
        };
        let fence = fence_for(&message.content);
        lines.push(format!("{heading}\n"));
        lines.push(format!("{fence}text\n{}\n{fence}\n", message.content));
    }
    lines.join("\n")
}

/// A backtick fence longer than any backtick run inside `content`.
fn fence_for(content: &str) -> String {
    let longest = content
        .split(|c: char| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

/// `chat_history_YYYYMMDD_HHMMSS.md`
pub fn markdown_file_name(now: DateTime<Local>) -> String {
    format!(
        "{}_{}.md",
        transcripts::MARKDOWN_FILE_PREFIX,
        now.format(transcripts::TIMESTAMP_FORMAT)
    )
}
