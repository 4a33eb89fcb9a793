//! Demo chat server.
//!
//! Streams scripted responses through the slate pipeline so the SSE
//! protocol can be exercised without a model provider.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p slate-web
//! cargo run -p slate-web -- --bind 0.0.0.0:8080 --static-dir public
//! cargo run -p slate-web -- --replay saved_response.txt --chunk-size 12
//! ```
//!
//! Then send a message:
//!
//! ```bash
//! curl -N -X POST localhost:5000/chat \
//!   -H 'content-type: application/json' \
//!   -d '{"message": "Show me a page", "session_id": "demo"}'
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use slate_rs::context::ContextConfig;
use slate_rs::pipeline::{ScriptedSource, TracingSink};
use slate_web::{DEFAULT_SYSTEM_PROMPT, WebConfig, spawn_web};

/// Response replayed when no `--replay` file is given.
const DEMO_RESPONSE: &str = concat!(
    "Here is a small landing page. ",
    "<artifact type=\"haml\" title=\"Landing page\">\n",
    "!!!\n",
    "%html\n",
    "  %head\n",
    "    %title Slate demo\n",
    "  %body\n",
    "    .hero#top{ \"data-role\": \"banner\" }\n",
    "      %h1 Welcome\n",
    "      %p Rendered from HAML.\n",
    "    %br/\n",
    "</artifact> ",
    "Let me know if you want changes.",
);

/// Demo chat server streaming scripted responses as Server-Sent Events.
#[derive(Parser)]
#[command(name = "slate-web", version)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "SLATE_BIND", default_value = "127.0.0.1:5000")]
    bind: SocketAddr,

    /// Context window in tokens.
    #[arg(long, env = "SLATE_CONTEXT_WINDOW", default_value_t = slate_rs::context::DEFAULT_CONTEXT_WINDOW)]
    context_window: usize,

    /// System prompt sent with every turn.
    #[arg(long, env = "SLATE_SYSTEM_PROMPT", default_value = DEFAULT_SYSTEM_PROMPT)]
    system_prompt: String,

    /// Directory served for unknown routes.
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// Seconds of inactivity before a session is evicted.
    #[arg(long, default_value_t = 3600)]
    session_idle_secs: u64,

    /// Text file replayed as every response.
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Characters per replayed delta.
    #[arg(long, default_value_t = 16)]
    chunk_size: usize,

    /// Milliseconds between replayed deltas.
    #[arg(long, default_value_t = 20)]
    delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();
    slate_rs::logging::init("info");

    let source = match &args.replay {
        Some(path) => ScriptedSource::from_file(path, args.chunk_size)?,
        None => ScriptedSource::from_text(DEMO_RESPONSE, args.chunk_size),
    }
    .with_delay(Duration::from_millis(args.delay_ms));

    let mut config = WebConfig::default()
        .with_bind_addr(args.bind)
        .with_system_prompt(args.system_prompt)
        .with_session_idle_ttl(Duration::from_secs(args.session_idle_secs))
        .with_context(ContextConfig::new().with_context_window(args.context_window));
    if let Some(dir) = args.static_dir {
        config = config.with_static_dir(dir);
    }

    let handle = spawn_web(Arc::new(source), Arc::new(TracingSink), config)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", args.bind))?;
    println!("Chat server: http://{}", handle.addr);

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to wait for Ctrl-C: {e}"))?;
    Ok(())
}
