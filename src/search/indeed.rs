//! Indeed publisher API client

use super::{SearchPage, SearchQuery, SearchService};
use crate::config::SearchConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// HTTP client for the Indeed job search API
pub struct IndeedClient {
    client: Client,
    base_url: String,
    publisher: String,
    user_ip: String,
    user_agent: String,
}

impl IndeedClient {
    pub fn new(config: &SearchConfig, publisher: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| Error::Search(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            publisher: publisher.into(),
            user_ip: config.user_ip.clone(),
            user_agent: config.user_agent.clone(),
        })
    }
}

#[async_trait]
impl SearchService for IndeedClient {
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
        debug!(
            "Searching '{}' in '{}' (start {}, limit {})",
            query.query, query.location, query.offset, query.limit
        );

        let start = query.offset.to_string();
        let limit = query.limit.to_string();
        let params = [
            ("publisher", self.publisher.as_str()),
            ("q", query.query.as_str()),
            ("l", query.location.as_str()),
            ("start", start.as_str()),
            ("limit", limit.as_str()),
            ("sort", "date"),
            ("latlong", "1"),
            ("format", "json"),
            ("v", "2"),
            ("userip", self.user_ip.as_str()),
            ("useragent", self.user_agent.as_str()),
        ];

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Search(format!(
                "HTTP {} for '{}' in '{}'",
                status, query.query, query.location
            )));
        }

        let page: SearchPage = response.json().await?;
        debug!(
            "Received {} of {} results",
            page.results.len(),
            page.total_results
        );
        Ok(page)
    }
}
