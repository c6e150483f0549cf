//! `mkulima chat` — Interactive or single-message chat against the agent.
//!
//! Runs the same workflow, store and tools as the SMS callback; only the
//! transport differs.

use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    session: Option<String>,
    user_id: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;

    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No model API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables (or add it to .env):");
        eprintln!("    GROQ_API_KEY   = 'gsk_...'   (default provider)");
        eprintln!("    OPENAI_API_KEY = 'sk-...'    (with default_provider = \"openai\")");
        eprintln!();
        eprintln!("  Or add `api_key` to your config file:");
        eprintln!(
            "    {}",
            mkulima_config::AppConfig::config_dir()
                .join("config.toml")
                .display()
        );
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let state = mkulima_gateway::build_state(&config).await?;
    let agent = state.agent.clone();

    if let Some(msg) = message {
        eprint!("  Thinking...");
        let outcome = agent.respond(&msg, user_id, session).await;
        eprint!("\r              \r");
        println!("{}", outcome.reply);
        eprintln!("  (session {})", outcome.session_id);
        return Ok(());
    }

    println!();
    println!("  🌱 Mkulima Smart — Interactive Mode");
    println!();
    println!("  Provider:  {}", config.default_provider);
    println!("  Model:     {}", config.default_model);
    println!(
        "  Weather:   {}",
        if config.tools.weather_api_key.is_some() {
            "enabled"
        } else {
            "no API key, tool will report unavailable"
        }
    );
    println!();
    println!("  Type your question and press Enter.");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut session = session;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(line) = lines.next_line().await? {
        let text = line.trim();
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }
        if !text.is_empty() {
            eprint!("  ...");
            let outcome = agent.respond(text, user_id, session.take()).await;
            eprint!("\r     \r");
            println!();
            for line in outcome.reply.lines() {
                println!("  Mkulima > {line}");
            }
            println!();
            session = Some(outcome.session_id);
        }

        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!();
    println!("  Kwaheri! 👋");
    println!();

    Ok(())
}
