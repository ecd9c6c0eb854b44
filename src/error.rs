//! Custom error types for gradjobs

use thiserror::Error;

/// Main error type for gradjobs operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Search service error: {0}")]
    Search(String),

    #[error("Posting fetch error: {0}")]
    Fetch(String),

    #[error("Unparseable posting date: {0}")]
    DateParse(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("Not initialized: run 'gradjobs init' first")]
    NotInitialized,

    #[error("{0}")]
    Other(String),
}

/// Result type alias for gradjobs
pub type Result<T> = std::result::Result<T, Error>;
