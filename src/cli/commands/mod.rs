
use crate::chat::{ChatEvent, ChatSyncEngine, FileUpload, Message};
use crate::config::{Config, load_config};
use crate::utils::{expand_home, mime_from_path};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(name = "bondvoyage")]
#[command(about = "Booking chat client for the BondVoyage API")]
pub struct Cli {
    /// Path to config.json (defaults to ~/.bondvoyage/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default config file
    Init {
        #[arg(long)]
        force: bool,
    },
    /// Print a booking's conversation
    History {
        #[arg(long, short = 'b')]
        booking: String,
        /// Keep paging back until the whole history is loaded
        #[arg(long, short = 'a')]
        all: bool,
    },
    /// Follow a conversation, printing new messages as they arrive
    Watch {
        #[arg(long, short = 'b')]
        booking: String,
    },
    /// Send a message
    Send {
        #[arg(long, short = 'b')]
        booking: String,
        #[arg(default_value = "")]
        text: String,
        /// Attach a file (repeatable)
        #[arg(long = "file", short = 'f')]
        files: Vec<PathBuf>,
    },
    /// Ask the assistant for a suggested reply
    Suggest {
        #[arg(long, short = 'b')]
        booking: String,
    },
    /// Mark a conversation as read
    Read {
        #[arg(long, short = 'b')]
        booking: String,
    },
    /// Show the unread count
    Unread {
        #[arg(long, short = 'b')]
        booking: String,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init { force } => init(config_path, force)?,
        Commands::History { booking, all } => {
            let engine = open(config_path, &booking).await?;
            if all {
                while engine.has_more() {
                    let before = engine.messages().len();
                    engine.load_more().await?;
                    if engine.messages().len() == before {
                        break;
                    }
                }
            }
            for message in engine.messages() {
                println!("{}", format_message(&message));
            }
            if engine.has_more() {
                println!("(older messages available, use --all)");
            }
        }
        Commands::Watch { booking } => watch(config_path, &booking).await?,
        Commands::Send {
            booking,
            text,
            files,
        } => {
            let uploads = read_uploads(&files).await?;
            let engine = open(config_path, &booking).await?;
            let message = engine.send_message(&text, &uploads).await?;
            println!("{}", format_message(&message));
        }
        Commands::Suggest { booking } => {
            let engine = open(config_path, &booking).await?;
            let message = engine.generate_ai_suggestion().await?;
            println!("{}", format_message(&message));
        }
        Commands::Read { booking } => {
            let engine = open(config_path, &booking).await?;
            engine.mark_as_read().await?;
            println!("\u{2713} Marked {} as read", booking);
        }
        Commands::Unread { booking } => {
            let engine = open(config_path, &booking).await?;
            println!("{}", engine.unread_count());
        }
    }

    Ok(())
}

fn init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => crate::config::get_config_path()?,
    };
    if path.exists() && !force {
        println!(
            "\u{26a0}\u{fe0f}  Config already exists at {} (use --force to overwrite)",
            path.display()
        );
        return Ok(());
    }
    crate::config::save_config(&Config::default(), Some(path.as_path()))?;
    println!("\u{2713} Created config at {}", path.display());
    println!("\nNext steps:");
    println!("  1. Set api.baseUrl and api.authToken in {}", path.display());
    println!("  2. Follow a booking: bondvoyage watch --booking <ID>");
    Ok(())
}

async fn open(config_path: Option<&Path>, booking: &str) -> Result<ChatSyncEngine> {
    let config = load_config(config_path)?;
    config.validate()?;
    let engine = ChatSyncEngine::from_config(booking, &config);
    engine
        .initialize()
        .await
        .with_context(|| format!("Failed to load conversation for booking {}", booking))?;
    // One-shot commands don't need the background poller
    engine.stop_polling();
    Ok(engine)
}

async fn watch(config_path: Option<&Path>, booking: &str) -> Result<()> {
    let config = load_config(config_path)?;
    config.validate()?;
    let engine = ChatSyncEngine::from_config(booking, &config);
    let mut events = engine.subscribe();
    engine
        .initialize()
        .await
        .with_context(|| format!("Failed to load conversation for booking {}", booking))?;

    for message in engine.messages() {
        println!("{}", format_message(&message));
    }
    println!("({} unread, Ctrl+C to stop)", engine.unread_count());
    if !engine.is_polling() {
        warn!("polling is disabled (chat.pollIntervalMs <= 0), nothing to watch");
        return Ok(());
    }

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(ChatEvent::Appended { ids }) => {
                    let messages = engine.messages();
                    for message in messages.iter().filter(|m| ids.contains(&m.id)) {
                        println!("{}", format_message(message));
                    }
                }
                Ok(ChatEvent::UnreadChanged { count }) => debug!("unread count now {}", count),
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => warn!("watch fell behind by {} events", n),
                Err(RecvError::Closed) => break,
            },
        }
    }

    engine.shutdown();
    Ok(())
}

async fn read_uploads(paths: &[PathBuf]) -> Result<Vec<FileUpload>> {
    let mut uploads = Vec::with_capacity(paths.len());
    for path in paths {
        let path = expand_home(&path.to_string_lossy());
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read attachment {}", path.display()))?;
        let file_name = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());
        uploads.push(FileUpload::new(
            file_name,
            Some(mime_from_path(&path).to_string()),
            bytes,
        ));
    }
    Ok(uploads)
}

/// One line per message: `[2026-01-05 14:03] admin: text (+1 attachment)`.
pub(crate) fn format_message(message: &Message) -> String {
    let mut line = format!(
        "[{}] {}: {}",
        message.created_at.format("%Y-%m-%d %H:%M"),
        message.kind,
        message.content
    );
    match message.attachments.len() {
        0 => {}
        1 => line.push_str(" (+1 attachment)"),
        n => line.push_str(&format!(" (+{} attachments)", n)),
    }
    line
}
