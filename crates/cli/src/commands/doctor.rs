//! `mkulima doctor` — Diagnose configuration and connectivity.

use mkulima_config::AppConfig;
use mkulima_core::provider::Provider;
use mkulima_store::SqliteStore;
use std::time::Duration;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

pub async fn run(write_config: bool) -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 Mkulima Doctor — System Diagnostics");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = std::env::var("MKULIMA_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| AppConfig::config_dir().join("config.toml"));
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else if write_config {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&config_path, AppConfig::default_toml())?;
        println!("  ✅ Wrote default config: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults and environment (--write-config creates one)");
    }

    let config = match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Configuration valid");
            config
        }
        Err(e) => {
            println!("  ❌ Configuration invalid: {e}");
            println!("\n  ⚠️  Fix the configuration before running further checks.");
            return Ok(());
        }
    };

    // Model provider
    match mkulima_providers::build_from_config(&config) {
        Ok(provider) => match tokio::time::timeout(PROBE_TIMEOUT, provider.health_check()).await {
            Ok(Ok(true)) => println!(
                "  ✅ Model provider reachable ({}, {})",
                provider.name(),
                config.default_model
            ),
            Ok(Ok(false)) => {
                println!("  ❌ Model provider answered but reported unhealthy");
                issues += 1;
            }
            Ok(Err(e)) => {
                println!("  ❌ Model provider check failed: {e}");
                issues += 1;
            }
            Err(_) => {
                println!("  ❌ Model provider did not answer within {PROBE_TIMEOUT:?}");
                issues += 1;
            }
        },
        Err(e) => {
            println!("  ❌ Model provider not configured: {e}");
            issues += 1;
        }
    }

    // Database
    match SqliteStore::from_config(&config.database).await {
        Ok(_) => println!("  ✅ Database ready: {}", config.database.url),
        Err(e) => {
            println!("  ❌ Database unavailable: {e}");
            issues += 1;
        }
    }

    // Optional integrations
    if config.tools.weather_api_key.is_some() {
        println!("  ✅ Weather API key configured");
    } else {
        println!("  ⚠️  No OPENWEATHER_API_KEY, weather questions get a fallback reply");
        issues += 1;
    }

    if config.sms.api_key.is_some() {
        println!("  ✅ SMS gateway configured (username: {})", config.sms.username);
    } else {
        println!("  ⚠️  No AFRICASTALKING_API_KEY, SMS replies will only be logged");
        issues += 1;
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
