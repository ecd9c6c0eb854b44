//! Job search service client
//!
//! This module provides:
//! - A trait for paginated job search backends
//! - The listing and page types they return
//! - An HTTP client for the Indeed publisher API

mod indeed;

pub use indeed::*;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One page request against the search service, always sorted newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub location: String,
    pub offset: u32,
    pub limit: u32,
}

impl SearchQuery {
    pub fn first_page(query: &str, location: &str, limit: u32) -> Self {
        Self {
            query: query.to_string(),
            location: location.to_string(),
            offset: 0,
            limit,
        }
    }

    /// The query for the page after this one
    pub fn next_page(&self) -> Self {
        Self {
            offset: self.offset + self.limit,
            ..self.clone()
        }
    }
}

/// A single search result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobListing {
    #[serde(rename = "jobkey")]
    pub job_key: String,
    pub url: String,
    /// Posting date in the service's own format
    pub date: String,
    #[serde(rename = "jobtitle", default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(rename = "formattedLocation", default)]
    pub formatted_location: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    #[serde(default)]
    pub results: Vec<JobListing>,
    #[serde(rename = "totalResults", default)]
    pub total_results: u64,
}

/// Trait for paginated job search providers
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Fetch one page of listings, newest first
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage>;
}
