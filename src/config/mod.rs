//! Configuration management for gradjobs
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::classify::SignalRules;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search service configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Degree classification rules
    #[serde(default)]
    pub classify: ClassifyConfig,

    /// Geographic binning configuration
    #[serde(default)]
    pub geo: GeoConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// Search service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Search API endpoint
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Environment variable name holding the publisher id
    #[serde(default = "default_publisher_env")]
    pub publisher_env: String,

    /// Results requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Client IP reported to the search API
    #[serde(default = "default_user_ip")]
    pub user_ip: String,

    /// User agent string
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Number of locations crawled at once
    #[serde(default = "default_location_concurrency")]
    pub location_concurrency: usize,
}

/// Which words count as an undergraduate degree mention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndergradRule {
    /// "degree", "bachelors", "bs" and "b.s."
    Classic,
    /// Bare "degree" only
    DegreeOnly,
}

/// Degree classification configuration
///
/// Empty pattern lists fall back to the built-in patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    #[serde(default = "default_undergrad_rule")]
    pub undergrad_rule: UndergradRule,

    #[serde(default)]
    pub phd_patterns: Vec<String>,

    #[serde(default)]
    pub ms_patterns: Vec<String>,

    #[serde(default)]
    pub undergrad_patterns: Vec<String>,
}

/// Geographic binning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoConfig {
    /// Maximum planar distance (degrees) to a reference city
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,

    /// JSON file with reference cities (built-in list when unset)
    #[serde(default)]
    pub cities_file: Option<PathBuf>,

    /// Locations shown in the per-location breakdown
    #[serde(default = "default_top_locations")]
    pub top_locations: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for gradjobs data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            publisher_env: default_publisher_env(),
            page_size: default_page_size(),
            user_ip: default_user_ip(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            location_concurrency: default_location_concurrency(),
        }
    }
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            undergrad_rule: default_undergrad_rule(),
            phd_patterns: Vec::new(),
            ms_patterns: Vec::new(),
            undergrad_patterns: Vec::new(),
        }
    }
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            max_distance: default_max_distance(),
            cities_file: None,
            top_locations: default_top_locations(),
        }
    }
}

impl Config {
    /// Get the default base directory for gradjobs (~/.gradjobs)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gradjobs")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Initialize paths configuration
    pub fn init_paths(&mut self, base_dir: Option<PathBuf>) {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        self.paths = PathsConfig {
            config_file: base.join("config.toml"),
            db_file: base.join("jobs.db"),
            base_dir: base,
        };
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        let base = config_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            db_file: base.join("jobs.db"),
            base_dir: base,
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let mut config = Config::default();
        config.init_paths(base_dir);

        if config.paths.config_file.exists() {
            debug!("Loading config from {:?}", config.paths.config_file);
            let content = std::fs::read_to_string(&config.paths.config_file)?;
            let mut loaded: Config = toml::from_str(&content)?;
            loaded.paths = config.paths;
            config = loaded;
        } else {
            debug!("No config file found, using defaults");
        }

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Get the search API publisher id from environment
    pub fn publisher_id(&self) -> Option<String> {
        std::env::var(&self.search.publisher_env).ok()
    }

    /// Check if gradjobs is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.search.page_size == 0 {
            return Err(Error::Config(
                "search.page_size must be positive".to_string(),
            ));
        }

        if self.search.location_concurrency == 0 {
            return Err(Error::Config(
                "search.location_concurrency must be at least 1".to_string(),
            ));
        }

        if !self.geo.max_distance.is_finite() || self.geo.max_distance <= 0.0 {
            return Err(Error::Config(
                "geo.max_distance must be a positive number".to_string(),
            ));
        }

        // Compiling the rules surfaces bad patterns before any crawl starts
        SignalRules::from_config(&self.classify)?;

        Ok(())
    }
}
