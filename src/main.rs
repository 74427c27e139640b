use anyhow::Result;
use clap::Parser;
use colored::*;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use ragbot_cli::{
    ChatSession, PromptHistory, clear_screen, display_banner, read_prompt, render_history,
    show_thinking,
};
use ragbot_core::ChatEngine;
use ragbot_ollama::OllamaBackend;
use ragbot_rag::{AppContext, Settings};

mod logging;

#[derive(Parser)]
#[command(name = "ragbot")]
#[command(about = "Chat with your documents through a local Ollama model", long_about = None)]
struct Cli {
    /// Directory the source documents are read from
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory holding the vector store
    #[arg(long)]
    persist_dir: Option<PathBuf>,

    /// Open the persisted vector store instead of rebuilding it
    #[arg(long)]
    no_rebuild: bool,

    /// Rebuild even if no vector store has been persisted yet
    #[arg(long)]
    fresh: bool,

    /// Do not log the standalone question of each turn
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn apply(self, settings: &mut Settings) {
        if let Some(dir) = self.data_dir {
            settings.data_dir = dir;
        }
        if let Some(dir) = self.persist_dir {
            settings.persist_dir = dir;
        }
        if self.no_rebuild {
            settings.rebuild_on_start = false;
        }
        if self.fresh {
            settings.allow_missing_store = true;
        }
        if self.quiet {
            settings.verbose = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = Settings::from_env()?;
    cli.apply(&mut settings);
    logging::init(&settings.log_dir)?;
    let backend = OllamaBackend::from_env()?;
    info!(
        base_url = %backend.config().base_url,
        data_dir = %settings.data_dir.display(),
        rebuild = settings.rebuild_on_start,
        "starting ragbot"
    );

    let ctx = AppContext::new(settings, Arc::new(backend));
    run(&ctx).await?;

    println!("{}", "Goodbye!".green());
    Ok(())
}

async fn create_engine(ctx: &AppContext) -> ragbot_core::Result<Arc<dyn ChatEngine>> {
    let engine: Arc<dyn ChatEngine> = ctx.init_engine().await?;
    Ok(engine)
}

/// Render, then either answer the pending prompt or read the next one
async fn run(ctx: &AppContext) -> Result<()> {
    let mut session = ChatSession::new();
    let mut history = PromptHistory::new();
    let mut last_error: Option<String> = None;

    // Models and index are loaded before the first prompt is read
    clear_screen()?;
    display_banner();
    show_thinking()?;
    if let Err(e) = session.start(|| create_engine(ctx)).await {
        error!(error = %e, "chat engine initialization failed");
        last_error = Some(e.to_string());
    }

    loop {
        session.ensure_initialized();
        clear_screen()?;
        display_banner();
        render_history(&mut io::stdout().lock(), session.messages())?;
        if let Some(message) = last_error.take() {
            println!("{} {}\n", "error:".red().bold(), message.red());
        }

        if session.needs_response() {
            show_thinking()?;
            let outcome = match session.ensure_engine(|| create_engine(ctx)).await {
                Ok(_) => session.respond().await,
                Err(e) => Err(e),
            };
            if let Err(e) = outcome {
                error!(error = %e, "chat request failed");
                last_error = Some(e.to_string());
            }
            continue;
        }

        let Some(prompt) = read_prompt(&mut history)? else {
            return Ok(());
        };
        session.submit(&prompt)?;
    }
}
