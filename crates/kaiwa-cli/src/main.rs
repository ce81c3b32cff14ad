use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use kaiwa_core::ResponseMode;

mod app;
mod commands;

#[derive(Parser)]
#[command(name = "kaiwa")]
#[command(about = "kaiwa - chat with a language model and keep the transcripts")]
#[command(version)]
struct Cli {
    /// Run a single prompt and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Model to use for replies
    #[arg(short, long)]
    model: Option<String>,

    /// Lower temperature, longer answers
    #[arg(long)]
    deliberate: bool,

    /// Let the model consult the web before answering
    #[arg(long)]
    web_search: bool,

    /// Document (txt, docx, pdf) to use as context
    #[arg(short, long)]
    attach: Option<PathBuf>,

    /// Directory for saved conversations
    #[arg(long)]
    save_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = kaiwa_core::Settings::load();

    if let Some(ref model) = cli.model {
        settings.llm.model = model.clone();
    }
    if let Some(ref dir) = cli.save_dir {
        settings.storage.save_dir = Some(dir.clone());
    }

    // Nothing works without the credential, so refuse to start.
    if let Err(e) = settings.require_api_key() {
        eprintln!("{e}");
        std::process::exit(1);
    }

    let mode = if cli.deliberate {
        ResponseMode::Deliberate
    } else {
        ResponseMode::Default
    };

    if let Some(prompt) = cli.prompt {
        app::run_single_prompt(settings, &prompt, mode, cli.web_search, cli.attach.as_deref())
            .await?;
    } else {
        app::run_repl(settings, mode, cli.web_search, cli.attach.as_deref()).await?;
    }

    Ok(())
}
