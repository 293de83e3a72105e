//! `latch`: talk to the Latch AI assistant from a terminal, or replay a
//! recorded run stream through the decoder.

use std::io::{self, Write};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use latch_models::Transcript;
use latch_sdk::{AssistantChat, ClientConfig, DecodeSession, LatchClient};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod render;

use render::StreamPrinter;

#[derive(Parser, Debug)]
#[command(name = "latch")]
#[command(author, version, about = "Latch AI assistant client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Chat with the assistant; `/quit` or end of input exits
    Chat(ChatArgs),
    /// Decode a recorded run stream and print the resulting transcript
    Replay(ReplayArgs),
}

#[derive(Args, Debug)]
struct ChatArgs {
    /// Send this user's baby profiles as context with every message
    #[arg(long)]
    user_id: Option<String>,

    /// Override the backend URL
    #[arg(long)]
    backend_url: Option<String>,

    /// Override the assistant id
    #[arg(long)]
    assistant_id: Option<String>,
}

#[derive(Args, Debug)]
struct ReplayArgs {
    /// Raw response body of a `runs/stream` call
    file: PathBuf,

    /// Bytes per chunk fed to the decoder
    #[arg(long, default_value = "64")]
    chunk_size: NonZeroUsize,

    /// User message the capture answers
    #[arg(long, default_value = "(replayed message)")]
    prompt: String,

    /// Print the transcript as JSON
    #[arg(long)]
    json: bool,
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Chat(args) => {
            // Keep log lines out of the conversation unless RUST_LOG asks.
            init_tracing("warn");
            chat(args).await
        }
        Commands::Replay(args) => {
            init_tracing("info");
            replay(&args)
        }
    }
}

async fn chat(args: ChatArgs) -> anyhow::Result<()> {
    let mut config = ClientConfig::load().context("loading configuration")?;
    if let Some(url) = args.backend_url {
        config = config.with_backend_url(url);
    }
    if let Some(id) = args.assistant_id {
        config = config.with_assistant_id(id);
    }
    let client = LatchClient::new(config)?;

    let profiles = match &args.user_id {
        Some(user_id) => client.fetch_baby_profiles(user_id).await.unwrap_or_else(|e| {
            warn!(user_id = %user_id, error = %e, "continuing without baby profiles");
            Vec::new()
        }),
        None => Vec::new(),
    };

    let mut chat = AssistantChat::open(client, profiles)
        .await
        .context("opening the chat")?;
    let transcript = chat.transcript().clone();
    let mut changes = transcript.subscribe();
    let mut printer = StreamPrinter::new(io::stdout());

    for message in &transcript.snapshot() {
        printer.print_message(message)?;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("you> ");
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "/quit" {
            break;
        }
        if !chat.send(line).await? {
            continue;
        }

        let outcome = loop {
            tokio::select! {
                biased;
                change = changes.recv() => match change {
                    Ok(change) => transcript.with(|t| printer.apply(change, t))?,
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "change feed lagged, resyncing");
                        transcript.with(|t| printer.catch_up(t))?;
                    }
                    // `transcript` holds a sender, so the feed never closes here.
                    Err(RecvError::Closed) => {}
                },
                outcome = chat.wait() => break outcome,
            }
        };

        while let Ok(change) = changes.try_recv() {
            transcript.with(|t| printer.apply(change, t))?;
        }
        printer.finish()?;

        if let Some(Err(e)) = outcome {
            eprintln!("error: {e}");
        }
    }

    chat.close().await;
    Ok(())
}

fn replay(args: &ReplayArgs) -> anyhow::Result<()> {
    let capture = std::fs::read(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;

    let mut transcript = Transcript::new();
    let summary = {
        let Some(mut session) = DecodeSession::begin(&mut transcript, &args.prompt)? else {
            bail!("--prompt must not be blank");
        };
        for chunk in capture.chunks(args.chunk_size.get()) {
            session.feed(chunk);
        }
        session.end();
        session.summary()
    };
    info!(
        bytes = capture.len(),
        applied = summary.applied,
        skipped = summary.skipped,
        "replay finished"
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
    } else {
        for message in &transcript {
            println!("{}: {}", message.role, message.content);
        }
    }
    Ok(())
}
