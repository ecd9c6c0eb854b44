//! Scrape command - crawl a job title across locations

use crate::config::Config;
use crate::crawl::{CrawlEngine, CrawlStats, HttpFetcher, PostingFetcher};
use crate::error::{Error, Result};
use crate::geo::CityList;
use crate::meta::MetaDb;
use crate::progress::{advance_progress, finish_progress, start_progress_bar};
use crate::search::{IndeedClient, SearchService};
use tracing::info;

/// Scrape options
#[derive(Debug, Clone, Default)]
pub struct ScrapeOptions {
    pub title: String,
    /// Locations to search; the reference city names when empty
    pub locations: Vec<String>,
}

/// Crawl the configured search service for a title
pub async fn cmd_scrape(config: &Config, db: &MetaDb, options: ScrapeOptions) -> Result<CrawlStats> {
    let publisher = config.publisher_id().ok_or_else(|| {
        Error::Config(format!(
            "Search publisher id not set; export {}",
            config.search.publisher_env
        ))
    })?;

    let search = IndeedClient::new(&config.search, publisher)?;
    let fetcher = HttpFetcher::new(&config.search)?;

    scrape_with(config, db, &search, &fetcher, options).await
}

/// Crawl with explicit search and fetch backends
pub async fn scrape_with(
    config: &Config,
    db: &MetaDb,
    search: &dyn SearchService,
    fetcher: &dyn PostingFetcher,
    options: ScrapeOptions,
) -> Result<CrawlStats> {
    let title = options.title.trim();
    if title.is_empty() {
        return Err(Error::Config("Job title must not be empty".to_string()));
    }

    let locations = if options.locations.is_empty() {
        CityList::load(&config.geo)?.names()
    } else {
        options.locations
    };

    info!("Scraping '{}' in {} locations", title, locations.len());

    let progress = start_progress_bar(locations.len(), "Crawling locations");
    let engine = CrawlEngine::new(db, search, fetcher, &config.search);
    let stats = engine
        .crawl(title, &locations, |location| {
            advance_progress(&progress, location)
        })
        .await;
    finish_progress(progress, "Locations crawled");

    Ok(stats)
}

/// Print crawl stats to console
pub fn print_scrape_stats(stats: &CrawlStats) {
    println!("\n🔎 Scrape Complete: {}\n", stats.title);
    for location in &stats.locations {
        println!(
            "  {}: {} new, {} merged ({} pages)",
            location.location, location.inserted, location.merged, location.pages_processed
        );
    }
    println!("\nNew postings: {}", stats.inserted());
    println!("Merged postings: {}", stats.merged());

    if !stats.errors.is_empty() {
        println!("\nErrors:");
        for error in &stats.errors {
            println!("- {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup() -> (Config, MetaDb, TempDir) {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.init_paths(Some(tmp.path().to_path_buf()));
        let db = MetaDb::connect(&config).await.unwrap();
        (config, db, tmp)
    }

    #[tokio::test]
    async fn test_scrape_end_to_end_over_http() {
        let server = MockServer::start().await;
        let (mut config, db, _tmp) = setup().await;
        config.search = SearchConfig {
            base_url: format!("{}/ads/apisearch", server.uri()),
            timeout_secs: 5,
            ..SearchConfig::default()
        };

        Mock::given(method("GET"))
            .and(path("/ads/apisearch"))
            .and(query_param("l", "Boston, MA"))
            .and(query_param("start", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "totalResults": 2,
                "results": [
                    {
                        "jobkey": "k1",
                        "url": format!("{}/viewjob/k1", server.uri()),
                        "date": "Tue, 03 Oct 2017 09:00:00 GMT",
                        "latitude": 42.36,
                        "longitude": -71.06
                    },
                    {
                        "jobkey": "k2",
                        "url": format!("{}/viewjob/k2", server.uri()),
                        "date": "Mon, 02 Oct 2017 18:24:53 GMT"
                    }
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/viewjob/k1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>PhD preferred</body></html>", "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/viewjob/k2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html><body>Bachelors degree</body></html>", "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let search = IndeedClient::new(&config.search, "pub-1").unwrap();
        let fetcher = HttpFetcher::new(&config.search).unwrap();
        let options = ScrapeOptions {
            title: " data scientist ".to_string(),
            locations: vec!["Boston, MA".to_string()],
        };

        let stats = scrape_with(&config, &db, &search, &fetcher, options)
            .await
            .unwrap();

        assert!(stats.errors.is_empty());
        assert_eq!(stats.title, "data scientist");
        assert_eq!(stats.inserted(), 2);

        let posting = db.get_posting("k1").await.unwrap().unwrap();
        assert!(posting.html_posting.contains("PhD preferred"));
        assert!(posting.search_titles.contains("data scientist"));
        assert!(posting.search_locations.contains("Boston, MA"));
        assert_eq!(posting.posted_at, 1_507_021_200);
    }

    #[tokio::test]
    async fn test_scrape_rejects_blank_title() {
        let (config, db, _tmp) = setup().await;
        let search = IndeedClient::new(&config.search, "pub-1").unwrap();
        let fetcher = HttpFetcher::new(&config.search).unwrap();

        let err = scrape_with(
            &config,
            &db,
            &search,
            &fetcher,
            ScrapeOptions {
                title: "   ".to_string(),
                locations: Vec::new(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
