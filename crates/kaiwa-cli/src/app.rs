use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use kaiwa_core::documents::{classify_extraction, document_context, extract_text};
use kaiwa_core::export::markdown_file_name;
use kaiwa_core::{
    run_turn, to_markdown, CompletionGateway, ResponseMode, Session, Settings, Titler,
    TranscriptStore, TurnEvent,
};

use crate::commands::{handle_command, CommandResult};

/// Everything one interactive session needs, constructed once at startup.
pub struct ChatApp {
    settings: Settings,
    session: Session,
    gateway: CompletionGateway,
    titler: Titler,
    store: TranscriptStore,
    mode: ResponseMode,
    web_search: bool,
    attachment: Option<String>,
    last_listing: Vec<String>,
}

impl ChatApp {
    pub fn new(settings: Settings, mode: ResponseMode, web_search: bool) -> Result<Self> {
        let client = settings.build_llm_client()?;
        Ok(Self {
            gateway: settings.build_gateway(client.clone()),
            titler: settings.build_titler(client),
            store: settings.build_store(),
            settings,
            session: Session::new(),
            mode,
            web_search,
            attachment: None,
            last_listing: Vec::new(),
        })
    }

    /// Send one prompt, streaming the reply to stdout.
    pub async fn send(&mut self, prompt: String) -> Result<()> {
        let options = self.settings.options_for(self.mode, self.web_search);
        let (tx, mut rx) = mpsc::unbounded_channel::<TurnEvent>();

        let session = &mut self.session;
        let gateway = &self.gateway;
        let turn = async move { run_turn(session, gateway, prompt, &options, &tx).await };
        let render = async move {
            while let Some(event) = rx.recv().await {
                match event {
                    TurnEvent::TextDelta(text) => {
                        print!("{text}");
                        let _ = std::io::stdout().flush();
                    }
                    TurnEvent::Complete { .. } => println!(),
                    TurnEvent::Error(e) => eprintln!("\nError: {e}"),
                }
            }
        };

        let (result, ()) = tokio::join!(turn, render);
        result.map(|_| ()).map_err(Into::into)
    }

    pub fn attach(&mut self, path: &Path) -> Result<()> {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let text = classify_extraction(extract_text(&bytes, extension))?;

        self.session.set_context(document_context(&text));
        self.attachment = Some(path.display().to_string());
        Ok(())
    }

    async fn save(&self) {
        if self.session.is_empty() {
            println!("There is no conversation to save.");
            return;
        }
        match self.store.save(self.session.messages(), &self.titler).await {
            Ok(saved) => println!("{saved}"),
            Err(e) => {
                tracing::warn!(error = %e, "Save failed");
                eprintln!("Error: {e}");
            }
        }
    }

    fn list(&mut self) {
        self.last_listing = self.store.list();
        if self.last_listing.is_empty() {
            println!("No saved conversations in {}", self.store.dir().display());
            return;
        }
        for (i, name) in self.last_listing.iter().enumerate() {
            println!("{:>3}. {name}", i + 1);
        }
    }

    fn load(&mut self, arg: &str) {
        let identifier = arg
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.last_listing.get(i).cloned())
            .unwrap_or_else(|| arg.to_string());

        let history = self.store.load(&identifier);
        tracing::info!(%identifier, messages = history.len(), "Loaded transcript");
        if history.is_empty() {
            println!("Could not load {identifier}; starting from an empty conversation.");
        } else {
            println!("Loaded {} messages from {identifier}", history.len());
        }
        self.session.replace(history);
        self.attachment = restored_attachment(&self.session);
    }

    fn export(&self, path: Option<String>) {
        if self.session.is_empty() {
            println!("There is no conversation to export.");
            return;
        }
        let path = path
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(markdown_file_name(chrono::Local::now())));
        match std::fs::write(&path, to_markdown(self.session.messages())) {
            Ok(()) => println!("Exported to {}", path.display()),
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "Export failed");
                eprintln!("Error: failed to export {}: {e}", path.display());
            }
        }
    }

    fn status(&self) -> String {
        format!(
            "Model: {}\nMode: {:?}\nWeb search: {}\nMessages: {}\nAttachment: {}\nSave dir: {}",
            self.gateway.model(),
            self.mode,
            if self.web_search { "on" } else { "off" },
            self.session.len(),
            self.attachment.as_deref().unwrap_or("none"),
            self.store.dir().display(),
        )
    }

    /// Apply one line of input. Returns `false` when the user quits.
    pub async fn handle_line(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty() {
            return true;
        }

        match handle_command(line) {
            CommandResult::Quit => return false,
            CommandResult::Message(msg) => println!("{msg}"),
            CommandResult::Clear => {
                self.session.clear();
                self.attachment = None;
                println!("Conversation cleared.");
            }
            CommandResult::SaveConversation => self.save().await,
            CommandResult::ListConversations => self.list(),
            CommandResult::LoadConversation(arg) => self.load(&arg),
            CommandResult::Export(path) => self.export(path),
            CommandResult::Attach(path) => match self.attach(Path::new(&path)) {
                Ok(()) => println!("Loaded {path}. Ask questions about its contents."),
                Err(e) => {
                    tracing::warn!(error = %e, %path, "Attach failed");
                    eprintln!("Error: {e}");
                }
            },
            CommandResult::SetMode(mode) => {
                self.mode = mode;
                println!("Response mode: {mode:?}");
            }
            CommandResult::SetWebSearch(enabled) => {
                self.web_search = enabled;
                println!("Web search {}", if enabled { "enabled" } else { "disabled" });
            }
            CommandResult::ShowStatus => println!("{}", self.status()),
            CommandResult::NotACommand => {
                // the failure is already printed and recorded in the history
                let _ = self.send(line.to_string()).await;
            }
        }
        true
    }
}

/// Status label for a document context carried in by a loaded transcript.
pub fn restored_attachment(session: &Session) -> Option<String> {
    session
        .context()
        .map(|_| "context restored from transcript".to_string())
}

pub async fn run_single_prompt(
    settings: Settings,
    prompt: &str,
    mode: ResponseMode,
    web_search: bool,
    attach: Option<&Path>,
) -> Result<()> {
    let mut app = ChatApp::new(settings, mode, web_search)?;
    if let Some(path) = attach {
        app.attach(path)?;
    }
    app.send(prompt.to_string()).await
}

pub async fn run_repl(
    settings: Settings,
    mode: ResponseMode,
    web_search: bool,
    attach: Option<&Path>,
) -> Result<()> {
    let mut app = ChatApp::new(settings, mode, web_search)?;
    if let Some(path) = attach {
        match app.attach(path) {
            Ok(()) => println!("Loaded {}.", path.display()),
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    println!("kaiwa v{}. Type /help for commands.", env!("CARGO_PKG_VERSION"));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if !app.handle_line(&line).await {
            break;
        }
    }
    Ok(())
}
