//! SQLite schema definition

/// SQL schema for the posting database
pub const SCHEMA_SQL: &str = r#"
-- Postings: one row per unique job key
CREATE TABLE IF NOT EXISTS postings (
    job_key TEXT PRIMARY KEY,
    job_title TEXT,
    company TEXT,
    url TEXT NOT NULL,
    formatted_location TEXT,
    posted_at INTEGER NOT NULL,
    html_posting TEXT NOT NULL,
    latitude REAL,
    longitude REAL,
    degree_classification TEXT,
    created_at TEXT NOT NULL
);

-- Search titles a posting was discovered under
CREATE TABLE IF NOT EXISTS posting_titles (
    job_key TEXT NOT NULL REFERENCES postings(job_key),
    title TEXT NOT NULL,
    PRIMARY KEY (job_key, title)
);

-- Search locations a posting was discovered under
CREATE TABLE IF NOT EXISTS posting_locations (
    job_key TEXT NOT NULL REFERENCES postings(job_key),
    location TEXT NOT NULL,
    PRIMARY KEY (job_key, location)
);

-- Indexes for performance
CREATE INDEX IF NOT EXISTS idx_postings_posted_at ON postings(posted_at);
CREATE INDEX IF NOT EXISTS idx_titles_title ON posting_titles(title);
CREATE INDEX IF NOT EXISTS idx_locations_location ON posting_locations(location);
"#;
