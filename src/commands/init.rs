//! Init command implementation

use crate::config::Config;
use crate::error::{Error, Result};
use crate::meta::MetaDb;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_dir: PathBuf,
    pub config_path: PathBuf,
    pub force: bool,
}

/// What init wrote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitResult {
    pub config_path: String,
    pub db_path: String,
    pub config_written: bool,
}

/// Write a default config and create the posting database
///
/// An existing config is kept unless `force` is set. The database schema is
/// created if missing either way.
pub async fn cmd_init(options: InitOptions) -> Result<InitResult> {
    let InitOptions {
        base_dir,
        config_path,
        force,
    } = options;

    let config_exists = config_path.exists();
    let mut config = if config_exists && !force {
        info!("Keeping existing config at {:?}", config_path);
        Config::load(&config_path)?
    } else {
        Config::default()
    };

    config.paths.base_dir = base_dir.clone();
    config.paths.config_file = config_path.clone();
    config.paths.db_file = base_dir.join("jobs.db");

    let config_written = !config_exists || force;
    if config_written {
        config.validate()?;
        config.save()?;
    }

    let db = MetaDb::connect(&config).await?;
    if !db.is_initialized().await? {
        return Err(Error::Other(format!(
            "Failed to create schema in {}",
            config.paths.db_file.display()
        )));
    }

    Ok(InitResult {
        config_path: config.paths.config_file.display().to_string(),
        db_path: config.paths.db_file.display().to_string(),
        config_written,
    })
}

pub fn print_init_result(result: &InitResult) {
    if result.config_written {
        println!("✓ Wrote config: {}", result.config_path);
    } else {
        println!("✓ Config already present: {}", result.config_path);
    }
    println!("✓ Database ready: {}", result.db_path);
    println!("\nSet the publisher id environment variable before running 'gradjobs scrape'.");
}
