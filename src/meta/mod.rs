//! Posting storage using SQLite
//!
//! This module handles the job posting record store:
//! - Postings keyed by the search service's job key
//! - Search title and location label sets (append-only join tables)
//! - Cached degree classifications (set once, cleared only on request)
//!
//! Every mutation is a single atomic statement or transaction (insert or
//! ignore, conditional update), so concurrent writers never lose labels.

mod labels;
mod schema;

pub use labels::*;
pub use schema::*;

use crate::classify::DegreeLabel;
use crate::config::Config;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// A stored job posting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub job_key: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub url: String,
    pub formatted_location: Option<String>,
    /// Unix seconds
    pub posted_at: i64,
    #[serde(skip_serializing, default)]
    pub html_posting: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub degree_classification: Option<String>,
    pub search_titles: LabelSet,
    pub search_locations: LabelSet,
    pub created_at: String,
}

impl JobPosting {
    /// Coordinates, when the search service reported both
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }
}

#[derive(Debug, FromRow)]
struct PostingRow {
    job_key: String,
    job_title: Option<String>,
    company: Option<String>,
    url: String,
    formatted_location: Option<String>,
    posted_at: i64,
    html_posting: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    degree_classification: Option<String>,
    created_at: String,
}

impl PostingRow {
    fn into_posting(self, search_titles: LabelSet, search_locations: LabelSet) -> JobPosting {
        JobPosting {
            job_key: self.job_key,
            job_title: self.job_title,
            company: self.company,
            url: self.url,
            formatted_location: self.formatted_location,
            posted_at: self.posted_at,
            html_posting: self.html_posting,
            latitude: self.latitude,
            longitude: self.longitude,
            degree_classification: self.degree_classification,
            search_titles,
            search_locations,
            created_at: self.created_at,
        }
    }
}

/// Label sets of a stored posting, without its HTML
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingLabels {
    pub titles: LabelSet,
    pub locations: LabelSet,
}

/// Posting count for one search location
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct LocationCount {
    pub location: String,
    pub count: i64,
}

/// Global statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalStats {
    pub posting_count: usize,
    pub classified_count: usize,
    pub title_count: usize,
    pub location_count: usize,
    pub label_counts: BTreeMap<String, usize>,
}

/// Posting database handle
#[derive(Clone)]
pub struct MetaDb {
    pool: SqlitePool,
}

impl MetaDb {
    /// Connect to the posting database
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::new(&config.paths.db_file).await
    }

    /// Create database with path directly (without full config)
    pub async fn new(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        debug!("Connecting to SQLite database at {:?}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let db = Self { pool };

        if !db.is_initialized().await? {
            db.init_schema().await?;
        }

        Ok(db)
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the database schema
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    /// Check if database is initialized
    pub async fn is_initialized(&self) -> Result<bool> {
        let result: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM sqlite_master WHERE type='table' AND name='postings'")
                .fetch_optional(&self.pool)
                .await?;
        Ok(result.is_some())
    }

    // ===== Posting Operations =====

    /// Insert new postings with their label sets in one transaction
    ///
    /// Keys already in the store keep their stored fields and only gain any
    /// missing labels. Returns the number of postings actually inserted.
    pub async fn insert_postings(&self, postings: &[JobPosting]) -> Result<usize> {
        if postings.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for posting in postings {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO postings (job_key, job_title, company, url, formatted_location, posted_at, html_posting, latitude, longitude, degree_classification, created_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&posting.job_key)
            .bind(&posting.job_title)
            .bind(&posting.company)
            .bind(&posting.url)
            .bind(&posting.formatted_location)
            .bind(posting.posted_at)
            .bind(&posting.html_posting)
            .bind(posting.latitude)
            .bind(posting.longitude)
            .bind(&posting.degree_classification)
            .bind(&posting.created_at)
            .execute(&mut *tx)
            .await?;

            // A concurrent crawl may have stored the key first; its fields win,
            // but the search labels are still unioned in
            if result.rows_affected() == 0 {
                debug!("Posting {} already stored, merging labels only", posting.job_key);
            } else {
                inserted += 1;
            }

            for title in posting.search_titles.iter() {
                sqlx::query("INSERT OR IGNORE INTO posting_titles (job_key, title) VALUES (?, ?)")
                    .bind(&posting.job_key)
                    .bind(title)
                    .execute(&mut *tx)
                    .await?;
            }
            for location in posting.search_locations.iter() {
                sqlx::query(
                    "INSERT OR IGNORE INTO posting_locations (job_key, location) VALUES (?, ?)",
                )
                .bind(&posting.job_key)
                .bind(location)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(inserted)
    }

    /// Add missing labels to a stored posting
    ///
    /// Returns true if any label was actually added.
    pub async fn apply_merge(&self, job_key: &str, update: &MergeUpdate) -> Result<bool> {
        if update.is_empty() {
            return Ok(false);
        }

        let mut tx = self.pool.begin().await?;
        let mut changed = 0;

        if let Some(title) = &update.add_title {
            changed += sqlx::query(
                "INSERT OR IGNORE INTO posting_titles (job_key, title) VALUES (?, ?)",
            )
            .bind(job_key)
            .bind(title)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }
        if let Some(location) = &update.add_location {
            changed += sqlx::query(
                "INSERT OR IGNORE INTO posting_locations (job_key, location) VALUES (?, ?)",
            )
            .bind(job_key)
            .bind(location)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;
        Ok(changed > 0)
    }

    /// Get a posting with its label sets
    pub async fn get_posting(&self, job_key: &str) -> Result<Option<JobPosting>> {
        let row = sqlx::query_as::<_, PostingRow>("SELECT * FROM postings WHERE job_key = ?")
            .bind(job_key)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let labels = self.load_labels(job_key).await?;
        Ok(Some(row.into_posting(labels.titles, labels.locations)))
    }

    /// Get only the label sets of a posting, if it is stored
    pub async fn get_posting_labels(&self, job_key: &str) -> Result<Option<PostingLabels>> {
        let exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM postings WHERE job_key = ?")
            .bind(job_key)
            .fetch_optional(&self.pool)
            .await?;

        if exists.is_none() {
            return Ok(None);
        }
        Ok(Some(self.load_labels(job_key).await?))
    }

    async fn load_labels(&self, job_key: &str) -> Result<PostingLabels> {
        let titles: Vec<String> =
            sqlx::query_scalar("SELECT title FROM posting_titles WHERE job_key = ?")
                .bind(job_key)
                .fetch_all(&self.pool)
                .await?;
        let locations: Vec<String> =
            sqlx::query_scalar("SELECT location FROM posting_locations WHERE job_key = ?")
                .bind(job_key)
                .fetch_all(&self.pool)
                .await?;

        Ok(PostingLabels {
            titles: titles.into_iter().collect(),
            locations: locations.into_iter().collect(),
        })
    }

    /// List every posting discovered under a search title, newest first
    pub async fn list_postings_for_title(&self, title: &str) -> Result<Vec<JobPosting>> {
        let rows = sqlx::query_as::<_, PostingRow>(
            r#"
            SELECT p.* FROM postings p
            JOIN posting_titles t ON t.job_key = p.job_key
            WHERE t.title = ?
            ORDER BY p.posted_at DESC, p.job_key
            "#,
        )
        .bind(title)
        .fetch_all(&self.pool)
        .await?;

        let title_rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT a.job_key, a.title FROM posting_titles a
            JOIN posting_titles t ON t.job_key = a.job_key
            WHERE t.title = ?
            "#,
        )
        .bind(title)
        .fetch_all(&self.pool)
        .await?;

        let location_rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT l.job_key, l.location FROM posting_locations l
            JOIN posting_titles t ON t.job_key = l.job_key
            WHERE t.title = ?
            "#,
        )
        .bind(title)
        .fetch_all(&self.pool)
        .await?;

        let mut labels: HashMap<String, PostingLabels> = HashMap::new();
        for (job_key, value) in title_rows {
            labels.entry(job_key).or_default().titles.insert(value);
        }
        for (job_key, value) in location_rows {
            labels.entry(job_key).or_default().locations.insert(value);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let entry = labels.remove(&row.job_key).unwrap_or_default();
                row.into_posting(entry.titles, entry.locations)
            })
            .collect())
    }

    /// Most recent posting time among postings found under both labels
    pub async fn newest_posted_at(&self, title: &str, location: &str) -> Result<Option<i64>> {
        let newest: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT MAX(p.posted_at) FROM postings p
            JOIN posting_titles t ON t.job_key = p.job_key
            JOIN posting_locations l ON l.job_key = p.job_key
            WHERE t.title = ? AND l.location = ?
            "#,
        )
        .bind(title)
        .bind(location)
        .fetch_one(&self.pool)
        .await?;
        Ok(newest)
    }

    /// Search locations for a title ranked by posting count, ties by name descending
    pub async fn top_locations(&self, title: &str, limit: usize) -> Result<Vec<LocationCount>> {
        let rows = sqlx::query_as::<_, LocationCount>(
            r#"
            SELECT l.location AS location, COUNT(*) AS count
            FROM posting_locations l
            JOIN posting_titles t ON t.job_key = l.job_key
            WHERE t.title = ?
            GROUP BY l.location
            ORDER BY count DESC, l.location DESC
            LIMIT ?
            "#,
        )
        .bind(title)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // ===== Classification Operations =====

    /// Store a label unless the posting already has one
    ///
    /// Returns true if this call wrote the label.
    pub async fn set_classification_if_absent(
        &self,
        job_key: &str,
        label: DegreeLabel,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE postings SET degree_classification = ?
            WHERE job_key = ? AND degree_classification IS NULL
            "#,
        )
        .bind(label.as_str())
        .bind(job_key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get the stored label of a posting
    pub async fn get_classification(&self, job_key: &str) -> Result<Option<String>> {
        let label: Option<Option<String>> =
            sqlx::query_scalar("SELECT degree_classification FROM postings WHERE job_key = ?")
                .bind(job_key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(label.flatten())
    }

    /// Drop cached labels for every posting under a title
    pub async fn clear_classifications(&self, title: &str) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE postings SET degree_classification = NULL
            WHERE degree_classification IS NOT NULL
              AND job_key IN (SELECT job_key FROM posting_titles WHERE title = ?)
            "#,
        )
        .bind(title)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    // ===== Statistics =====

    /// Get global statistics
    pub async fn get_global_stats(&self) -> Result<GlobalStats> {
        let posting_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM postings")
            .fetch_one(&self.pool)
            .await?;

        let classified_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM postings WHERE degree_classification IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        let title_count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT title) FROM posting_titles")
            .fetch_one(&self.pool)
            .await?;

        let location_count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT location) FROM posting_locations")
                .fetch_one(&self.pool)
                .await?;

        let label_rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT degree_classification, COUNT(*) FROM postings
            WHERE degree_classification IS NOT NULL
            GROUP BY degree_classification
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(GlobalStats {
            posting_count: posting_count as usize,
            classified_count: classified_count as usize,
            title_count: title_count as usize,
            location_count: location_count as usize,
            label_counts: label_rows
                .into_iter()
                .map(|(label, count)| (label, count as usize))
                .collect(),
        })
    }
}
