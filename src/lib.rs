//! gradjobs - crawl job postings and measure advertised degree requirements
//!
//! This crate provides:
//! - An incremental, deduplicating crawler over a paginated job search API
//! - A SQLite posting store with merged title/location labels
//! - A cached degree classifier over posting HTML
//! - Geographic binning onto reference cities and label aggregation

pub mod aggregate;
pub mod classify;
pub mod commands;
pub mod config;
pub mod crawl;
pub mod error;
pub mod geo;
pub mod meta;
pub mod progress;
pub mod search;

pub use config::Config;
pub use error::{Error, Result};
