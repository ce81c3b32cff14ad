use kaiwa_core::ResponseMode;

/// Result of processing a slash command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult {
    /// Display a message to the user.
    Message(String),
    /// Clear the conversation and any attached document.
    Clear,
    /// Quit the application.
    Quit,
    /// Save current conversation.
    SaveConversation,
    /// List saved conversations.
    ListConversations,
    /// Load conversation by file name or list index.
    LoadConversation(String),
    /// Export the conversation as Markdown, optionally to a given path.
    Export(Option<String>),
    /// Attach a document as system context.
    Attach(String),
    /// Switch response mode.
    SetMode(ResponseMode),
    /// Toggle web search.
    SetWebSearch(bool),
    /// Show status (model, mode, message count).
    ShowStatus,
    /// Not a command - treat as regular input.
    NotACommand,
}

pub fn handle_command(input: &str) -> CommandResult {
    let parts: Vec<&str> = input.trim().splitn(2, ' ').collect();
    let cmd = parts[0];
    let arg = parts.get(1).map(|s| s.trim()).unwrap_or("");

    match cmd {
        "/help" | "/h" => show_help(),
        "/exit" | "/quit" | "/q" => CommandResult::Quit,
        "/clear" | "/new" => CommandResult::Clear,

        // Conversation commands
        "/save" => CommandResult::SaveConversation,
        "/list" | "/conversations" | "/history" => CommandResult::ListConversations,
        "/load" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /load <file-name | number from /list>".into())
            } else {
                CommandResult::LoadConversation(arg.to_string())
            }
        }
        "/export" => CommandResult::Export((!arg.is_empty()).then(|| arg.to_string())),
        "/attach" => {
            if arg.is_empty() {
                CommandResult::Message("Usage: /attach <file.txt | file.docx | file.pdf>".into())
            } else {
                CommandResult::Attach(arg.to_string())
            }
        }

        // Mode commands
        "/mode" => match arg.parse::<ResponseMode>() {
            Ok(mode) => CommandResult::SetMode(mode),
            _ => CommandResult::Message("Usage: /mode <default | deliberate>".into()),
        },
        "/web" => match arg {
            "on" => CommandResult::SetWebSearch(true),
            "off" => CommandResult::SetWebSearch(false),
            _ => CommandResult::Message("Usage: /web <on | off>".into()),
        },
        "/status" => CommandResult::ShowStatus,
        "/version" => CommandResult::Message(format!("kaiwa v{}", env!("CARGO_PKG_VERSION"))),

        // Unknown command
        _ => {
            if input.starts_with('/') {
                CommandResult::Message(format!("Unknown command: {cmd}. Type /help for commands."))
            } else {
                CommandResult::NotACommand
            }
        }
    }
}

fn show_help() -> CommandResult {
    let help_text = "\
╭─ kaiwa Commands ───────────────────────────────────────────────╮

  CONVERSATION
    /clear, /new              Clear the conversation and attachment
    /save                     Save the conversation as JSON
    /list                     List saved conversations (newest first)
    /load <name|number>       Load a saved conversation
    /export [path]            Export the conversation as Markdown

  CONTEXT & MODES
    /attach <file>            Use a txt/docx/pdf file as context
    /mode <default|deliberate> Switch response mode
    /web <on|off>             Let the model consult the web
    /status                   Show model, mode and message count

  OTHER
    /help, /h                 Show this help message
    /version                  Show version information
    /exit, /quit, /q          Quit

╰────────────────────────────────────────────────────────────────╯";

    CommandResult::Message(help_text.into())
}
