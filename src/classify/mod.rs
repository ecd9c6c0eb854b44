//! Degree requirement classification
//!
//! This module provides:
//! - Signal extraction from the visible text of a posting
//! - Reduction of the signals to a single degree label
//! - A cache layer that stores each label on its posting exactly once

mod signals;

pub use signals::*;

use crate::error::{Error, Result};
use crate::meta::{JobPosting, MetaDb};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// Advertised degree requirement of a posting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DegreeLabel {
    #[serde(rename = "unknown")]
    Unknown,
    #[serde(rename = "undergrad")]
    Undergrad,
    #[serde(rename = "ms/phd")]
    MsPhd,
    #[serde(rename = "ms")]
    Ms,
    #[serde(rename = "phd")]
    Phd,
}

impl DegreeLabel {
    /// Every label, in reporting order (matches the derived `Ord`)
    pub const ALL: [DegreeLabel; 5] = [
        DegreeLabel::Unknown,
        DegreeLabel::Undergrad,
        DegreeLabel::MsPhd,
        DegreeLabel::Ms,
        DegreeLabel::Phd,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DegreeLabel::Unknown => "unknown",
            DegreeLabel::Undergrad => "undergrad",
            DegreeLabel::Ms => "ms",
            DegreeLabel::Phd => "phd",
            DegreeLabel::MsPhd => "ms/phd",
        }
    }
}

impl std::fmt::Display for DegreeLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DegreeLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(DegreeLabel::Unknown),
            "undergrad" => Ok(DegreeLabel::Undergrad),
            "ms" => Ok(DegreeLabel::Ms),
            "phd" => Ok(DegreeLabel::Phd),
            "ms/phd" => Ok(DegreeLabel::MsPhd),
            _ => Err(Error::Parse(format!("Unknown degree label: {}", s))),
        }
    }
}

impl DegreeSignals {
    /// Reduce the signals to one label; graduate mentions suppress undergraduate ones
    pub fn label(&self) -> DegreeLabel {
        let has_phd = !self.phd.is_empty();
        let has_ms = !self.ms.is_empty();
        let is_grad = has_ms || has_phd;
        let is_undergrad = !self.undergrad.is_empty() && !is_grad;

        if is_undergrad {
            DegreeLabel::Undergrad
        } else if is_grad {
            match (has_ms, has_phd) {
                (true, true) => DegreeLabel::MsPhd,
                (true, false) => DegreeLabel::Ms,
                _ => DegreeLabel::Phd,
            }
        } else {
            DegreeLabel::Unknown
        }
    }
}

/// Anything that can turn posting HTML into a degree label
pub trait Classifier: Send + Sync {
    fn classify_html(&self, html: &str) -> DegreeLabel;
}

/// Pattern-table classifier
#[derive(Debug, Clone, Default)]
pub struct RuleClassifier {
    rules: SignalRules,
}

impl RuleClassifier {
    pub fn new(rules: SignalRules) -> Self {
        Self { rules }
    }
}

impl Classifier for RuleClassifier {
    fn classify_html(&self, html: &str) -> DegreeLabel {
        self.rules.extract(html).label()
    }
}

/// Memoizes labels on stored postings
///
/// A label already on the record is returned as-is. Otherwise the classifier
/// runs once and the result is written with a set-if-absent update, so racing
/// callers cannot overwrite each other.
pub struct ClassificationCache<'a> {
    db: &'a MetaDb,
    classifier: &'a dyn Classifier,
}

impl<'a> ClassificationCache<'a> {
    pub fn new(db: &'a MetaDb, classifier: &'a dyn Classifier) -> Self {
        Self { db, classifier }
    }

    /// Return the posting's label, computing and storing it on first use
    pub async fn classify(&self, posting: &JobPosting) -> Result<DegreeLabel> {
        if let Some(stored) = &posting.degree_classification {
            return stored.parse();
        }

        let label = self.classifier.classify_html(&posting.html_posting);

        if self
            .db
            .set_classification_if_absent(&posting.job_key, label)
            .await?
        {
            debug!("Classified {} as {}", posting.job_key, label);
            return Ok(label);
        }

        // Another writer got there first; its value is authoritative
        match self.db.get_classification(&posting.job_key).await? {
            Some(stored) => stored.parse(),
            None => Ok(label),
        }
    }
}
