//! Label counts by city, by search location, and by signal

use crate::classify::{DegreeLabel, DegreeSignals};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bucket for postings not near any reference city
pub const OTHER_CITY: &str = "other";

/// Count per degree label, always holding every label
pub type LabelCounts = BTreeMap<DegreeLabel, usize>;

fn zeroed_counts() -> LabelCounts {
    DegreeLabel::ALL.iter().map(|label| (*label, 0)).collect()
}

/// Label counts per city bucket plus overall totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeSummary {
    pub by_city: BTreeMap<String, LabelCounts>,
    pub totals: LabelCounts,
}

impl Default for DegreeSummary {
    fn default() -> Self {
        Self {
            by_city: BTreeMap::new(),
            totals: zeroed_counts(),
        }
    }
}

impl DegreeSummary {
    /// Summarize (city, label) pairs; a missing city counts as [`OTHER_CITY`]
    pub fn from_postings<I, S>(postings: I) -> Self
    where
        I: IntoIterator<Item = (Option<S>, DegreeLabel)>,
        S: AsRef<str>,
    {
        let mut summary = Self::default();
        for (city, label) in postings {
            summary.record(city.as_ref().map(|c| c.as_ref()), label);
        }
        summary
    }

    pub fn record(&mut self, city: Option<&str>, label: DegreeLabel) {
        let city = city.unwrap_or(OTHER_CITY);
        *self
            .by_city
            .entry(city.to_string())
            .or_insert_with(zeroed_counts)
            .entry(label)
            .or_default() += 1;
        *self.totals.entry(label).or_default() += 1;
    }

    pub fn count(&self, city: &str, label: DegreeLabel) -> usize {
        self.by_city
            .get(city)
            .and_then(|counts| counts.get(&label))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self, label: DegreeLabel) -> usize {
        self.totals.get(&label).copied().unwrap_or(0)
    }

    pub fn posting_count(&self) -> usize {
        self.totals.values().sum()
    }
}

/// Label counts for one search location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationBreakdown {
    pub location: String,
    pub total: usize,
    pub counts: LabelCounts,
}

impl LocationBreakdown {
    pub fn new(location: impl Into<String>, labels: impl IntoIterator<Item = DegreeLabel>) -> Self {
        let mut counts = zeroed_counts();
        let mut total = 0;
        for label in labels {
            *counts.entry(label).or_default() += 1;
            total += 1;
        }
        Self {
            location: location.into(),
            total,
            counts,
        }
    }
}

/// How many postings in a search location showed each kind of signal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTally {
    pub location: String,
    pub postings: usize,
    pub phd: usize,
    pub ms: usize,
    pub undergrad: usize,
}

/// Per-location signal tallies, ordered by location name
#[derive(Debug, Clone, Default)]
pub struct SignalTallies {
    tallies: BTreeMap<String, SignalTally>,
}

impl SignalTallies {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, location: &str, signals: &DegreeSignals) {
        let tally = self
            .tallies
            .entry(location.to_string())
            .or_insert_with(|| SignalTally {
                location: location.to_string(),
                ..Default::default()
            });
        tally.postings += 1;
        tally.phd += usize::from(!signals.phd.is_empty());
        tally.ms += usize::from(!signals.ms.is_empty());
        tally.undergrad += usize::from(!signals.undergrad.is_empty());
    }

    pub fn get(&self, location: &str) -> Option<&SignalTally> {
        self.tallies.get(location)
    }

    pub fn into_vec(self) -> Vec<SignalTally> {
        self.tallies.into_values().collect()
    }
}
