//! `mkulima seed` — Load the starter knowledge base.

use mkulima_store::{SqliteStore, seed_knowledge, starter_knowledge};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let store = SqliteStore::from_config(&config.database).await?;

    let added = seed_knowledge(&store).await?;
    let total = starter_knowledge().len();

    println!("🌱 Knowledge base: {}", config.database.url);
    println!("   Added {added} of {total} starter entries");
    if added < total {
        println!("   {} already present", total - added);
    }

    Ok(())
}
