//! Incremental job crawling with deduplicating merge
//!
//! This module provides:
//! - Paginated search per (title, location) with a freshness stopping rule
//! - One HTML fetch per previously unseen job key
//! - Per-page label merging for postings rediscovered under a new title or location
//! - Per-location failure isolation
//!
//! The stopping rule assumes the search service returns listings in a stable
//! newest-first order. If that ordering is violated, new postings behind a
//! stale page are missed until a later crawl; nothing here compensates.

mod dates;
mod fetch;

pub use dates::*;
pub use fetch::*;

use crate::config::SearchConfig;
use crate::error::Result;
use crate::meta::{JobPosting, LabelSet, MergeUpdate, MetaDb, PostingLabels};
use crate::search::{JobListing, SearchPage, SearchQuery, SearchService};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Outcome of crawling one location
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationStats {
    pub location: String,
    pub pages_fetched: usize,
    pub pages_processed: usize,
    pub listings_seen: usize,
    pub inserted: usize,
    pub merged: usize,
}

/// Outcome of a whole crawl
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlStats {
    pub title: String,
    pub locations: Vec<LocationStats>,
    pub errors: Vec<String>,
}

impl CrawlStats {
    pub fn inserted(&self) -> usize {
        self.locations.iter().map(|l| l.inserted).sum()
    }

    pub fn merged(&self) -> usize {
        self.locations.iter().map(|l| l.merged).sum()
    }
}

/// Crawl/merge engine over a search service and the posting store
pub struct CrawlEngine<'a> {
    db: &'a MetaDb,
    search: &'a dyn SearchService,
    fetcher: &'a dyn PostingFetcher,
    page_size: u32,
    concurrency: usize,
}

impl<'a> CrawlEngine<'a> {
    pub fn new(
        db: &'a MetaDb,
        search: &'a dyn SearchService,
        fetcher: &'a dyn PostingFetcher,
        config: &SearchConfig,
    ) -> Self {
        Self {
            db,
            search,
            fetcher,
            page_size: config.page_size.max(1),
            concurrency: config.location_concurrency.max(1),
        }
    }

    /// Crawl every location for a title
    ///
    /// A failure in one location is logged and recorded in the stats; the
    /// remaining locations still run. `on_location` is called as each
    /// location finishes, in input order.
    pub async fn crawl(
        &self,
        title: &str,
        locations: &[String],
        on_location: impl Fn(&str),
    ) -> CrawlStats {
        info!(
            "Crawling '{}' across {} locations",
            title,
            locations.len()
        );

        let mut stats = CrawlStats {
            title: title.to_string(),
            ..Default::default()
        };

        let mut results = stream::iter(locations)
            .map(|location| self.crawl_location(title, location))
            .buffered(self.concurrency);

        let mut index = 0;
        while let Some(result) = results.next().await {
            let location = &locations[index];
            index += 1;

            match result {
                Ok(location_stats) => {
                    info!(
                        "{}: {} new, {} merged over {} pages",
                        location,
                        location_stats.inserted,
                        location_stats.merged,
                        location_stats.pages_processed
                    );
                    stats.locations.push(location_stats);
                }
                Err(e) => {
                    let error_msg = format!("{}: {}", location, e);
                    warn!(%error_msg, "Crawl failed for location");
                    stats.errors.push(error_msg);
                }
            }
            on_location(location);
        }

        stats
    }

    /// Crawl a single location until the results stop being newer than the store
    pub async fn crawl_location(&self, title: &str, location: &str) -> Result<LocationStats> {
        let mut stats = LocationStats {
            location: location.to_string(),
            ..Default::default()
        };

        let newest_known = self.db.newest_posted_at(title, location).await?;
        debug!(
            "Newest known posting for '{}' in '{}': {:?}",
            title, location, newest_known
        );

        let mut query = SearchQuery::first_page(title, location, self.page_size);
        let mut page = self.search.search(&query).await?;
        stats.pages_fetched += 1;
        let total = page.total_results;

        // Keys inserted or merged during this location's crawl
        let mut inserted_keys: HashSet<String> = HashSet::new();
        let mut merge_keys: HashSet<String> = HashSet::new();

        loop {
            if u64::from(query.offset) >= total {
                break;
            }
            if !is_fresh(&page, newest_known)? {
                debug!(
                    "Stopping '{}' at offset {}: first listing is not newer than the store",
                    location, query.offset
                );
                break;
            }

            let mut new_postings = Vec::new();
            let mut rediscovered: Vec<(String, PostingLabels)> = Vec::new();
            for listing in &page.results {
                stats.listings_seen += 1;
                if inserted_keys.contains(&listing.job_key) || merge_keys.contains(&listing.job_key)
                {
                    continue;
                }

                match self.db.get_posting_labels(&listing.job_key).await? {
                    Some(labels) => {
                        merge_keys.insert(listing.job_key.clone());
                        rediscovered.push((listing.job_key.clone(), labels));
                    }
                    None => {
                        let posting = self.build_posting(listing, title, location).await?;
                        inserted_keys.insert(listing.job_key.clone());
                        new_postings.push(posting);
                    }
                }
            }

            // Commit the page before requesting the next one
            stats.inserted += self.db.insert_postings(&new_postings).await?;
            stats.merged += self.merge_labels(rediscovered, title, location).await?;
            stats.pages_processed += 1;

            query = query.next_page();
            if u64::from(query.offset) >= total {
                break;
            }
            page = self.search.search(&query).await?;
            stats.pages_fetched += 1;
        }

        Ok(stats)
    }

    /// Add this search's title and location to rediscovered postings
    ///
    /// Returns how many postings actually gained a label.
    async fn merge_labels(
        &self,
        rediscovered: Vec<(String, PostingLabels)>,
        title: &str,
        location: &str,
    ) -> Result<usize> {
        let mut merged = 0;
        for (job_key, labels) in rediscovered {
            let update = MergeUpdate::for_labels(&labels.titles, &labels.locations, title, location);
            if update.is_empty() {
                continue;
            }
            if self.db.apply_merge(&job_key, &update).await? {
                debug!("Merged labels into {}: {:?}", job_key, update);
                merged += 1;
            }
        }
        Ok(merged)
    }

    /// New posting record for a listing never seen before
    async fn build_posting(
        &self,
        listing: &JobListing,
        title: &str,
        location: &str,
    ) -> Result<JobPosting> {
        let posted_at = parse_posted_at(&listing.date)?;
        let html_posting = self.fetcher.fetch(&listing.url).await?;

        Ok(JobPosting {
            job_key: listing.job_key.clone(),
            job_title: listing.title.clone(),
            company: listing.company.clone(),
            url: listing.url.clone(),
            formatted_location: listing.formatted_location.clone(),
            posted_at,
            html_posting,
            latitude: listing.latitude,
            longitude: listing.longitude,
            degree_classification: None,
            search_titles: LabelSet::from_iter([title]),
            search_locations: LabelSet::from_iter([location]),
            created_at: Utc::now().to_rfc3339(),
        })
    }
}

/// Whether a page still leads with listings newer than the store
fn is_fresh(page: &SearchPage, newest_known: Option<i64>) -> Result<bool> {
    let Some(first) = page.results.first() else {
        return Ok(false);
    };
    match newest_known {
        None => Ok(true),
        Some(newest) => Ok(parse_posted_at(&first.date)? > newest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Search service backed by fixed, newest-first listing lists per location
    #[derive(Default)]
    struct ScriptedSearch {
        listings: HashMap<String, Vec<JobListing>>,
        requests: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedSearch {
        fn with(mut self, location: &str, listings: Vec<JobListing>) -> Self {
            self.listings.insert(location.to_string(), listings);
            self
        }

        fn offsets(&self, location: &str) -> Vec<u32> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .filter(|(l, _)| l == location)
                .map(|(_, offset)| *offset)
                .collect()
        }
    }

    #[async_trait]
    impl SearchService for ScriptedSearch {
        async fn search(&self, query: &SearchQuery) -> Result<SearchPage> {
            self.requests
                .lock()
                .unwrap()
                .push((query.location.clone(), query.offset));

            let all = self
                .listings
                .get(&query.location)
                .ok_or_else(|| Error::Search(format!("no such location: {}", query.location)))?;

            let start = (query.offset as usize).min(all.len());
            let end = (start + query.limit as usize).min(all.len());
            Ok(SearchPage {
                results: all[start..end].to_vec(),
                total_results: all.len() as u64,
            })
        }
    }

    /// Fetcher that counts requests per URL and can be told to fail some
    #[derive(Default)]
    struct CountingFetcher {
        fetches: Mutex<HashMap<String, usize>>,
        failing: Mutex<HashSet<String>>,
    }

    impl CountingFetcher {
        fn fail_on(&self, job_key: &str) {
            self.failing
                .lock()
                .unwrap()
                .insert(listing(job_key, 0).url);
        }

        fn recover(&self) {
            self.failing.lock().unwrap().clear();
        }

        fn total(&self) -> usize {
            self.fetches.lock().unwrap().values().sum()
        }

        fn max_per_url(&self) -> usize {
            self.fetches.lock().unwrap().values().copied().max().unwrap_or(0)
        }
    }

    #[async_trait]
    impl PostingFetcher for CountingFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            *self.fetches.lock().unwrap().entry(url.to_string()).or_default() += 1;
            if self.failing.lock().unwrap().contains(url) {
                return Err(Error::Fetch(format!("HTTP 503: {}", url)));
            }
            Ok(format!("<html><body><p>MS required</p><a href=\"{}\">x</a></body></html>", url))
        }
    }

    fn listing(job_key: &str, timestamp: i64) -> JobListing {
        JobListing {
            job_key: job_key.to_string(),
            url: format!("https://jobs.example.com/viewjob?jk={}", job_key),
            date: Utc.timestamp_opt(timestamp, 0).unwrap().to_rfc2822(),
            title: Some("Engineer".to_string()),
            company: None,
            formatted_location: None,
            latitude: Some(47.6),
            longitude: Some(-122.3),
        }
    }

    /// Listings `prefix0..prefixN`, newest first, ten seconds apart
    fn listings(prefix: &str, count: usize, newest: i64) -> Vec<JobListing> {
        (0..count)
            .map(|i| listing(&format!("{}{}", prefix, i), newest - 10 * i as i64))
            .collect()
    }

    fn config(page_size: u32) -> SearchConfig {
        SearchConfig {
            page_size,
            ..SearchConfig::default()
        }
    }

    async fn setup_db() -> (MetaDb, TempDir) {
        let tmp = TempDir::new().unwrap();
        let db = MetaDb::new(&tmp.path().join("jobs.db")).await.unwrap();
        (db, tmp)
    }

    fn locations(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_repeat_crawl_inserts_nothing() {
        let (db, _tmp) = setup_db().await;
        let search = ScriptedSearch::default().with("Seattle", listings("s", 7, 10_000));
        let fetcher = CountingFetcher::default();
        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(3));

        let first = engine
            .crawl("engineer", &locations(&["Seattle"]), |_| {})
            .await;
        assert!(first.errors.is_empty());
        assert_eq!(first.inserted(), 7);
        assert_eq!(first.merged(), 0);
        assert_eq!(fetcher.total(), 7);

        let second = engine
            .crawl("engineer", &locations(&["Seattle"]), |_| {})
            .await;
        assert!(second.errors.is_empty());
        assert_eq!(second.inserted(), 0);
        assert_eq!(second.merged(), 0);
        assert_eq!(fetcher.total(), 7);
        assert_eq!(second.locations[0].pages_processed, 0);
        assert_eq!(db.get_global_stats().await.unwrap().posting_count, 7);
    }

    #[tokio::test]
    async fn test_stops_at_first_stale_page() {
        let (db, _tmp) = setup_db().await;
        // Page size 2: first listings of pages 0..4 are dated 1000, 980, 960, 940, 920
        let search = ScriptedSearch::default().with("Seattle", listings("s", 10, 1000));
        let fetcher = CountingFetcher::default();

        let known = JobPosting {
            job_key: "old".to_string(),
            job_title: None,
            company: None,
            url: "https://jobs.example.com/old".to_string(),
            formatted_location: None,
            posted_at: 955,
            html_posting: String::new(),
            latitude: None,
            longitude: None,
            degree_classification: None,
            search_titles: LabelSet::from_iter(["engineer"]),
            search_locations: LabelSet::from_iter(["Seattle"]),
            created_at: Utc::now().to_rfc3339(),
        };
        db.insert_postings(std::slice::from_ref(&known)).await.unwrap();

        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(2));
        let stats = engine.crawl_location("engineer", "Seattle").await.unwrap();

        // Pages 0-2 are processed; page 3 is only inspected
        assert_eq!(stats.pages_processed, 3);
        assert_eq!(stats.inserted, 6);
        assert_eq!(search.offsets("Seattle"), vec![0, 2, 4, 6]);
        assert!(db.get_posting("s5").await.unwrap().is_some());
        assert!(db.get_posting("s6").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stops_at_total_without_extra_request() {
        let (db, _tmp) = setup_db().await;
        let search = ScriptedSearch::default().with("Seattle", listings("s", 4, 1000));
        let fetcher = CountingFetcher::default();
        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(2));

        let stats = engine.crawl_location("engineer", "Seattle").await.unwrap();
        assert_eq!(stats.inserted, 4);
        assert_eq!(search.offsets("Seattle"), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_overlapping_locations_merge() {
        let (db, _tmp) = setup_db().await;
        let mut boston = listings("b", 3, 2000);
        boston.insert(1, listing("s1", 1990));
        let search = ScriptedSearch::default()
            .with("Seattle", listings("s", 3, 1000))
            .with("Boston", boston);
        let fetcher = CountingFetcher::default();
        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(25));

        let stats = engine
            .crawl("engineer", &locations(&["Seattle", "Boston"]), |_| {})
            .await;

        assert_eq!(stats.locations[0].inserted, 3);
        assert_eq!(stats.locations[1].inserted, 3);
        assert_eq!(stats.locations[1].merged, 1);
        assert_eq!(fetcher.max_per_url(), 1);

        let shared = db.get_posting("s1").await.unwrap().unwrap();
        assert!(shared.search_locations.contains("Seattle"));
        assert!(shared.search_locations.contains("Boston"));
        // Timestamp comes from the first sighting only
        assert_eq!(shared.posted_at, 990);
    }

    #[tokio::test]
    async fn test_new_title_merges_existing_postings() {
        let (db, _tmp) = setup_db().await;
        let search = ScriptedSearch::default().with("Seattle", listings("s", 3, 1000));
        let fetcher = CountingFetcher::default();
        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(25));

        engine
            .crawl("engineer", &locations(&["Seattle"]), |_| {})
            .await;
        let before = db.get_posting("s0").await.unwrap().unwrap();

        let stats = engine
            .crawl("developer", &locations(&["Seattle"]), |_| {})
            .await;
        assert_eq!(stats.inserted(), 0);
        assert_eq!(stats.merged(), 3);
        assert_eq!(fetcher.total(), 3);

        let after = db.get_posting("s0").await.unwrap().unwrap();
        assert!(after.search_titles.is_superset(&before.search_titles));
        assert_eq!(after.search_titles.len(), 2);
        assert!(after.search_locations.is_superset(&before.search_locations));
    }

    #[tokio::test]
    async fn test_failing_location_is_isolated() {
        let (db, _tmp) = setup_db().await;
        let search = ScriptedSearch::default()
            .with("Seattle", listings("s", 2, 1000))
            .with("Boston", listings("b", 2, 1000));
        let fetcher = CountingFetcher::default();
        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(25));

        let stats = engine
            .crawl("engineer", &locations(&["Seattle", "Atlantis", "Boston"]), |_| {})
            .await;

        assert_eq!(stats.errors.len(), 1);
        assert!(stats.errors[0].starts_with("Atlantis"));
        assert_eq!(stats.locations.len(), 2);
        assert_eq!(stats.inserted(), 4);
    }

    #[tokio::test]
    async fn test_malformed_date_aborts_only_that_location() {
        let (db, _tmp) = setup_db().await;
        let mut broken = listings("x", 2, 1000);
        broken[1].date = "sometime last week".to_string();
        let search = ScriptedSearch::default()
            .with("Denver", broken)
            .with("Boston", listings("b", 2, 1000));
        let fetcher = CountingFetcher::default();
        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(25));

        let stats = engine
            .crawl("engineer", &locations(&["Denver", "Boston"]), |_| {})
            .await;

        assert_eq!(stats.errors.len(), 1);
        assert!(stats.errors[0].contains("sometime last week"));
        assert_eq!(stats.locations[0].location, "Boston");
        assert_eq!(stats.inserted(), 2);
    }

    #[tokio::test]
    async fn test_repeated_listing_is_inserted_once() {
        let (db, _tmp) = setup_db().await;
        let mut shifted = listings("s", 4, 1000);
        // Pagination drift: a listing reappears on the next page
        shifted.insert(2, listing("s1", 990));
        let search = ScriptedSearch::default().with("Seattle", shifted);
        let fetcher = CountingFetcher::default();
        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(2));

        let stats = engine.crawl_location("engineer", "Seattle").await.unwrap();
        assert_eq!(stats.listings_seen, 5);
        assert_eq!(stats.inserted, 4);
        assert_eq!(stats.merged, 0);
        assert_eq!(fetcher.max_per_url(), 1);
    }

    #[tokio::test]
    async fn test_empty_results_stop_crawl() {
        let (db, _tmp) = setup_db().await;
        let search = ScriptedSearch::default().with("Nowhere", Vec::new());
        let fetcher = CountingFetcher::default();
        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(25));

        let stats = engine.crawl_location("engineer", "Nowhere").await.unwrap();
        assert_eq!(stats.pages_fetched, 1);
        assert_eq!(stats.pages_processed, 0);
        assert_eq!(fetcher.total(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_locations_keep_order() {
        let (db, _tmp) = setup_db().await;
        let names = ["Austin", "Boston", "Chicago", "Denver"];
        let mut search = ScriptedSearch::default();
        for (i, name) in names.iter().enumerate() {
            search = search.with(name, listings(&format!("{}-", name), 3 + i, 5000));
        }
        // A posting shared by every location
        for name in names {
            search
                .listings
                .get_mut(name)
                .unwrap()
                .push(listing("shared", 10));
        }
        let fetcher = CountingFetcher::default();
        let mut cfg = config(2);
        cfg.location_concurrency = 3;
        let engine = CrawlEngine::new(&db, &search, &fetcher, &cfg);

        let seen = Mutex::new(Vec::new());
        let stats = engine
            .crawl("engineer", &locations(&names), |l| {
                seen.lock().unwrap().push(l.to_string())
            })
            .await;

        assert!(stats.errors.is_empty());
        let order: Vec<_> = stats.locations.iter().map(|l| l.location.as_str()).collect();
        assert_eq!(order, names.to_vec());
        assert_eq!(*seen.lock().unwrap(), locations(&names));

        // Locations racing on the shared key may each fetch it, but it is stored once
        assert_eq!(stats.inserted(), 3 + 4 + 5 + 6 + 1);
        let shared = db.get_posting("shared").await.unwrap().unwrap();
        assert_eq!(shared.search_locations.len(), names.len());
    }

    #[tokio::test]
    async fn test_merges_survive_a_later_page_failure() {
        let (db, _tmp) = setup_db().await;
        let mut seattle = listings("s", 4, 1000);
        seattle[1] = listing("b0", 990);
        let search = ScriptedSearch::default()
            .with("Boston", listings("b", 1, 2000))
            .with("Seattle", seattle);
        let fetcher = CountingFetcher::default();
        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(2));

        engine.crawl_location("engineer", "Boston").await.unwrap();

        // Page 0 is [s0, b0]; page 1 fails while fetching s2
        fetcher.fail_on("s2");
        let err = engine.crawl_location("engineer", "Seattle").await.unwrap_err();
        assert!(matches!(err, Error::Fetch(_)));

        let shared = db.get_posting("b0").await.unwrap().unwrap();
        assert!(shared.search_locations.contains("Boston"));
        assert!(shared.search_locations.contains("Seattle"));
        assert!(db.get_posting("s0").await.unwrap().is_some());

        // The retry stops at page 0, so nothing from the failed page is replayed
        fetcher.recover();
        let retry = engine.crawl_location("engineer", "Seattle").await.unwrap();
        assert_eq!(retry.pages_processed, 0);
        assert_eq!(retry.merged, 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_isolated_to_its_location() {
        let (db, _tmp) = setup_db().await;
        sqlx::query(
            r#"
            CREATE TRIGGER reject_denver BEFORE INSERT ON posting_locations
            WHEN NEW.location = 'Denver'
            BEGIN
                SELECT RAISE(ABORT, 'location rejected');
            END
            "#,
        )
        .execute(db.pool())
        .await
        .unwrap();

        let search = ScriptedSearch::default()
            .with("Denver", listings("d", 2, 1000))
            .with("Boston", listings("b", 2, 1000));
        let fetcher = CountingFetcher::default();
        let engine = CrawlEngine::new(&db, &search, &fetcher, &config(25));

        let stats = engine
            .crawl("engineer", &locations(&["Denver", "Boston"]), |_| {})
            .await;

        assert_eq!(stats.errors.len(), 1);
        assert!(stats.errors[0].starts_with("Denver: Database error"));
        assert_eq!(stats.locations.len(), 1);
        assert_eq!(stats.locations[0].location, "Boston");
        assert_eq!(stats.inserted(), 2);
        // The failed page's transaction rolled back as a whole
        assert!(db.get_posting("d0").await.unwrap().is_none());
    }
}
