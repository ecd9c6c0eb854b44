//! Default values for configuration

use super::UndergradRule;

/// Default search API endpoint (Indeed publisher API)
pub fn default_search_base_url() -> String {
    std::env::var("GRADJOBS_SEARCH_URL")
        .unwrap_or_else(|_| "http://api.indeed.com/ads/apisearch".to_string())
}

/// Default environment variable name for the publisher id
pub fn default_publisher_env() -> String {
    "INDEED_PUBLISHER".to_string()
}

/// Largest page the search API will return
pub fn default_page_size() -> u32 {
    25
}

/// Client IP reported to the search API
pub fn default_user_ip() -> String {
    "1.2.3.4".to_string()
}

/// Default user agent
pub fn default_user_agent() -> String {
    format!("gradjobs/{} (Job Posting Survey)", env!("CARGO_PKG_VERSION"))
}

/// Default request timeout in seconds
pub fn default_timeout() -> u64 {
    30
}

/// Default: crawl one location at a time
pub fn default_location_concurrency() -> usize {
    1
}

/// Default undergraduate rule
pub fn default_undergrad_rule() -> UndergradRule {
    UndergradRule::Classic
}

/// Default nearest-city threshold, in coordinate degrees
pub fn default_max_distance() -> f64 {
    1.0
}

/// Default number of locations in the per-location breakdown
pub fn default_top_locations() -> usize {
    9
}
