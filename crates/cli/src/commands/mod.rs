pub mod chat;
pub mod doctor;
pub mod seed;
pub mod serve;

use mkulima_config::AppConfig;

/// Load the nearest `.env` walking up from the working directory.
///
/// Variables already set in the process environment win.
pub fn load_dotenv() {
    let Ok(mut dir) = std::env::current_dir() else {
        tracing::warn!("Could not determine current directory for .env lookup");
        return;
    };

    loop {
        let candidate = dir.join(".env");
        if candidate.exists() {
            match dotenvy::from_path(&candidate) {
                Ok(()) => tracing::debug!(path = %candidate.display(), "Loaded environment from .env"),
                Err(e) => tracing::warn!(
                    path = %candidate.display(),
                    error = %e,
                    "Failed to load .env file"
                ),
            }
            return;
        }
        if !dir.pop() {
            return;
        }
    }
}

pub fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}
