//! Status command implementation

use crate::config::Config;
use crate::error::Result;
use crate::meta::{GlobalStats, MetaDb};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Status information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusInfo {
    pub config_path: String,
    pub db_path: String,
    pub search_url: String,
    pub publisher_env: String,
    pub publisher_configured: bool,
    pub db_stats: GlobalStats,
}

/// Get system status
pub async fn cmd_status(config: &Config, db: &MetaDb) -> Result<StatusInfo> {
    info!("Getting status");

    let db_stats = db.get_global_stats().await?;

    Ok(StatusInfo {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        search_url: config.search.base_url.clone(),
        publisher_env: config.search.publisher_env.clone(),
        publisher_configured: config.publisher_id().is_some(),
        db_stats,
    })
}

/// Print status to console
pub fn print_status(status: &StatusInfo) {
    println!("\n📊 gradjobs Status\n");
    println!("Configuration: {}", status.config_path);
    println!("Database: {}", status.db_path);
    println!("\nSearch:");
    println!("  URL: {}", status.search_url);
    let publisher = if status.publisher_configured {
        "✓ Set"
    } else {
        "✗ Not set"
    };
    println!("  Publisher ({}): {}", status.publisher_env, publisher);

    let stats = &status.db_stats;
    println!("\nDatabase Stats:");
    println!("  Postings: {}", stats.posting_count);
    println!("  Classified: {}", stats.classified_count);
    println!("  Search titles: {}", stats.title_count);
    println!("  Search locations: {}", stats.location_count);
    if !stats.label_counts.is_empty() {
        println!("  Labels:");
        for (label, count) in &stats.label_counts {
            println!("    {}: {}", label, count);
        }
    }
}
