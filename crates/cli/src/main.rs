//! Mkulima CLI — the main entry point.
//!
//! Commands:
//! - `serve`   — Start the HTTP gateway (SMS callback + API)
//! - `chat`    — Talk to the advisory agent from a terminal
//! - `seed`    — Load the starter knowledge base
//! - `doctor`  — Diagnose configuration and connectivity

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "mkulima",
    about = "Mkulima Smart — SMS farming advice from an LLM agent",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Chat with the advisory agent
    Chat {
        /// Send a single message instead of entering interactive mode
        #[arg(short, long)]
        message: Option<String>,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,

        /// Answer as this registered farmer (enables farm data)
        #[arg(short, long)]
        user_id: Option<i64>,
    },

    /// Load the starter knowledge base (idempotent)
    Seed,

    /// Diagnose system health
    Doctor {
        /// Write a default config file if none exists
        #[arg(long)]
        write_config: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    commands::load_dotenv();

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(port, host).await?,
        Commands::Chat {
            message,
            session,
            user_id,
        } => commands::chat::run(message, session, user_id).await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::Doctor { write_config } => commands::doctor::run(write_config).await?,
    }

    Ok(())
}
