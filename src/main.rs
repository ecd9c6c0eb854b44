//! gradjobs CLI entry point

use clap::{Parser, Subcommand};
use gradjobs::{
    commands::{
        cmd_analyse, cmd_init, cmd_scrape, cmd_status, print_analysis, print_init_result,
        print_scrape_stats, print_status, AnalyseOptions, InitOptions, ScrapeOptions,
    },
    config::Config,
    error::{Error, Result},
    meta::MetaDb,
    progress::LogWriterFactory,
};
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gradjobs")]
#[command(version, about = "Crawl job postings and classify their degree requirements", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize gradjobs configuration and database
    Init {
        /// Force overwrite existing config
        #[arg(long)]
        force: bool,
    },

    /// Crawl postings for a job title
    Scrape {
        /// Job title to search for
        title: String,

        /// Locations to search (defaults to the reference cities)
        #[arg(short, long)]
        location: Vec<String>,
    },

    /// Classify and count stored postings for a job title
    Analyse {
        /// Job title the postings were scraped under
        title: String,

        /// Number of search locations in the breakdown
        #[arg(long)]
        top: Option<usize>,

        /// Recompute every cached degree label for the title
        #[arg(long)]
        reclassify: bool,

        /// Tally raw degree mentions per search location (re-reads all HTML)
        #[arg(long)]
        signals: bool,
    },

    /// Show system status
    Status,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(LogWriterFactory))
        .with(filter)
        .init();

    if let Commands::Init { force } = cli.command {
        return handle_init(cli.config, force, cli.json).await;
    }

    let config = load_config(cli.config.as_deref())?;
    let db = MetaDb::connect(&config).await?;

    match cli.command {
        Commands::Init { .. } => unreachable!(),

        Commands::Scrape { title, location } => {
            let options = ScrapeOptions {
                title,
                locations: location,
            };
            let stats = cmd_scrape(&config, &db, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                print_scrape_stats(&stats);
            }
        }

        Commands::Analyse {
            title,
            top,
            reclassify,
            signals,
        } => {
            let options = AnalyseOptions {
                title,
                top,
                reclassify,
                signals,
            };
            let analysis = cmd_analyse(&config, &db, options).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                print_analysis(&analysis);
            }
        }

        Commands::Status => {
            let status = cmd_status(&config, &db).await?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&status)?);
            } else {
                print_status(&status);
            }
        }
    }

    Ok(())
}

async fn handle_init(config: Option<PathBuf>, force: bool, json: bool) -> Result<()> {
    // A .toml argument is the config file itself; anything else is its directory
    let (base_dir, config_path) = match config {
        Some(path) if path.extension().is_some_and(|e| e == "toml") => {
            let base = path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(Config::default_base_dir);
            (base, path)
        }
        Some(dir) => (dir.clone(), dir.join("config.toml")),
        None => {
            let base = Config::default_base_dir();
            (base.clone(), base.join("config.toml"))
        }
    };

    let result = cmd_init(InitOptions {
        base_dir,
        config_path,
        force,
    })
    .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_init_result(&result);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::load(path)?,
        None => Config::load_from(None)?,
    };

    if !config.is_initialized() {
        return Err(Error::NotInitialized);
    }
    Ok(config)
}
