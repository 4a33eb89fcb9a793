//! Command-line access to the slate pipeline.
//!
//! # Examples
//!
//! ```sh
//! # Compile markup (stdin when no file is given)
//! slate render page.haml
//! slate render page.haml --page "Landing page"
//!
//! # Replay a saved response through extraction and filtering
//! slate extract response.txt --chunk-size 16
//!
//! # Inspect and manage a JSON message list against a small window
//! slate context history.json --limit 4000 --weights weights.json
//! ```

use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use slate_rs::prelude::*;
use tokio::sync::mpsc;

/// Streaming chat core tools.
#[derive(Parser)]
#[command(name = "slate", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile indentation markup to HTML.
    Render {
        /// Markup file. Reads stdin when omitted.
        file: Option<PathBuf>,

        /// Wrap the output in a themed HTML document with this title.
        #[arg(long)]
        page: Option<String>,
    },
    /// Replay a text file as a streamed response and print events as JSON lines.
    Extract {
        file: PathBuf,

        /// Characters per simulated delta.
        #[arg(long, default_value_t = 24)]
        chunk_size: usize,
    },
    /// Report context usage for a JSON message list and print the managed result.
    Context {
        file: PathBuf,

        /// Context window in tokens.
        #[arg(long)]
        limit: Option<usize>,

        /// JSON keyword weight table replacing the default one.
        #[arg(long)]
        weights: Option<PathBuf>,

        /// System prompt counted against the window.
        #[arg(long, default_value = "")]
        system_prompt: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let cli = Cli::parse();
    slate_rs::logging::init("info");

    match cli.command {
        Command::Render { file, page } => render(file.as_deref(), page.as_deref()),
        Command::Extract { file, chunk_size } => extract(&file, chunk_size).await,
        Command::Context {
            file,
            limit,
            weights,
            system_prompt,
        } => context(&file, limit, weights.as_deref(), &system_prompt),
    }
}

fn render(file: Option<&Path>, page: Option<&str>) -> Result<(), String> {
    let source = match file {
        Some(path) => read(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| format!("failed to read stdin: {e}"))?;
            buf
        }
    };
    let html = render_html(&source);
    match page {
        Some(title) => println!("{}", generate_html(title, &html)),
        None => println!("{html}"),
    }
    Ok(())
}

async fn extract(file: &Path, chunk_size: usize) -> Result<(), String> {
    let source = ScriptedSource::from_file(file, chunk_size)?;
    let (tx, mut rx) = mpsc::channel::<StreamEvent>(64);

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", event.to_json());
        }
    });

    let outcome = run_response(source.stream(SourceRequest::default()), &TracingSink, &tx).await;
    drop(tx);
    printer.await.map_err(|e| format!("event printer failed: {e}"))?;

    match outcome.error {
        Some(e) => Err(e.to_string()),
        None => Ok(()),
    }
}

fn context(file: &Path, limit: Option<usize>, weights: Option<&Path>, system_prompt: &str) -> Result<(), String> {
    let messages: Vec<Message> =
        serde_json::from_str(&read(file)?).map_err(|e| format!("invalid message list in {}: {e}", file.display()))?;

    let mut config = ContextConfig::default();
    if let Some(limit) = limit {
        config = config.with_context_window(limit);
    }
    let mut manager = ContextManager::new(config);
    if let Some(path) = weights {
        manager = manager.with_weights(KeywordWeights::from_json(&read(path)?)?);
    }

    let state = manager.state(&messages, system_prompt);
    eprintln!("{}", state.to_log_string());
    if let Some(line) = state.status_message() {
        eprintln!("{line}");
    }

    let (managed, report) = manager.manage(&messages, system_prompt);
    let output = serde_json::json!({
        "report": report,
        "messages": managed,
    });
    let pretty = serde_json::to_string_pretty(&output).map_err(|e| format!("failed to encode result: {e}"))?;
    println!("{pretty}");
    Ok(())
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {e}", path.display()))
}
