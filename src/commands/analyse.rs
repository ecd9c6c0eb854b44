//! Analyse command - classify, bin, and count postings for a title

use crate::aggregate::{
    DegreeSummary, LabelCounts, LocationBreakdown, SignalTallies, SignalTally, OTHER_CITY,
};
use crate::classify::{
    ClassificationCache, Classifier, DegreeLabel, RuleClassifier, SignalExtractor, SignalRules,
};
use crate::config::Config;
use crate::error::Result;
use crate::geo::{bin_posting, CityList};
use crate::meta::MetaDb;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

/// Analyse options
#[derive(Debug, Clone, Default)]
pub struct AnalyseOptions {
    pub title: String,
    /// Locations in the breakdown; the configured default when unset
    pub top: Option<usize>,
    /// Drop cached labels for the title before classifying
    pub reclassify: bool,
    /// Re-extract degree mentions from every posting's HTML and tally them
    pub signals: bool,
}

/// Everything the analyse command reports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub title: String,
    pub postings: usize,
    pub newly_classified: usize,
    pub cleared: u64,
    pub summary: DegreeSummary,
    pub top_locations: Vec<LocationBreakdown>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signal_tallies: Vec<SignalTally>,
}

/// Analyse stored postings using the configured rules and cities
pub async fn cmd_analyse(config: &Config, db: &MetaDb, options: AnalyseOptions) -> Result<Analysis> {
    let rules = SignalRules::from_config(&config.classify)?;
    let classifier = RuleClassifier::new(rules.clone());
    let cities = CityList::load(&config.geo)?;
    let top = options.top.unwrap_or(config.geo.top_locations);

    analyse_with(
        db,
        &classifier,
        &rules,
        &cities,
        config.geo.max_distance,
        top,
        options,
    )
    .await
}

/// Analyse with an explicit classifier, signal extractor and city list.
///
/// The extractor only runs when `options.signals` is set, so a run over
/// cached labels never touches posting HTML.
pub async fn analyse_with(
    db: &MetaDb,
    classifier: &dyn Classifier,
    extractor: &dyn SignalExtractor,
    cities: &CityList,
    max_distance: f64,
    top: usize,
    options: AnalyseOptions,
) -> Result<Analysis> {
    let title = options.title.trim();

    let cleared = if options.reclassify {
        let cleared = db.clear_classifications(title).await?;
        info!("Cleared {} cached labels for '{}'", cleared, title);
        cleared
    } else {
        0
    };

    let postings = db.list_postings_for_title(title).await?;
    info!("Analysing {} postings for '{}'", postings.len(), title);

    let cache = ClassificationCache::new(db, classifier);
    let mut summary = DegreeSummary::default();
    let mut tallies = SignalTallies::new();
    let mut labels: HashMap<&str, DegreeLabel> = HashMap::new();
    let mut newly_classified = 0;

    for posting in &postings {
        if posting.degree_classification.is_none() {
            newly_classified += 1;
        }
        let label = cache.classify(posting).await?;

        let city = bin_posting(posting, cities, max_distance).map(|c| c.name.as_str());
        summary.record(city, label);

        if options.signals {
            let signals = extractor.extract_signals(&posting.html_posting);
            for location in posting.search_locations.iter() {
                tallies.record(location, &signals);
            }
        }

        labels.insert(posting.job_key.as_str(), label);
    }
    debug!(
        "{} postings fell outside every city and count as '{}'",
        summary.by_city.get(OTHER_CITY).map(|c| c.values().sum::<usize>()).unwrap_or(0),
        OTHER_CITY
    );

    let mut top_locations = Vec::new();
    for ranked in db.top_locations(title, top).await? {
        let location_labels = postings
            .iter()
            .filter(|p| p.search_locations.contains(&ranked.location))
            .filter_map(|p| labels.get(p.job_key.as_str()).copied());
        top_locations.push(LocationBreakdown::new(ranked.location.as_str(), location_labels));
    }

    Ok(Analysis {
        title: title.to_string(),
        postings: postings.len(),
        newly_classified,
        cleared,
        summary,
        top_locations,
        signal_tallies: tallies.into_vec(),
    })
}

fn format_counts(counts: &LabelCounts) -> String {
    DegreeLabel::ALL
        .iter()
        .map(|label| format!("{:>9}", counts.get(label).copied().unwrap_or(0)))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Print analysis to console
pub fn print_analysis(analysis: &Analysis) {
    println!("\n🎓 Degree Requirements: {}\n", analysis.title);
    println!(
        "Postings: {} ({} newly classified)",
        analysis.postings, analysis.newly_classified
    );
    if analysis.cleared > 0 {
        println!("Cleared labels: {}", analysis.cleared);
    }

    if analysis.postings == 0 {
        println!("\nNo postings stored for this title. Run 'gradjobs scrape' first.");
        return;
    }

    let header = DegreeLabel::ALL
        .iter()
        .map(|label| format!("{:>9}", label.as_str()))
        .collect::<Vec<_>>()
        .join(" ");

    println!("\nBy city:");
    println!("  {:<20} {}", "", header);
    for (city, counts) in &analysis.summary.by_city {
        println!("  {:<20} {}", city, format_counts(counts));
    }
    println!("  {:<20} {}", "total", format_counts(&analysis.summary.totals));

    if !analysis.top_locations.is_empty() {
        println!("\nTop search locations:");
        for breakdown in &analysis.top_locations {
            println!(
                "  {:<20} {} ({} postings)",
                breakdown.location,
                format_counts(&breakdown.counts),
                breakdown.total
            );
        }
    }

    if !analysis.signal_tallies.is_empty() {
        println!("\nSignals by search location:");
        for tally in &analysis.signal_tallies {
            println!(
                "  {}: {} postings, PhD {}, MS {}, undergrad {}",
                tally.location, tally.postings, tally.phd, tally.ms, tally.undergrad
            );
        }
    }
}
