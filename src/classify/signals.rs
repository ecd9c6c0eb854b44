//! Degree signal extraction from posting HTML

use crate::config::{ClassifyConfig, UndergradRule};
use crate::error::Result;
use regex::Regex;
use scraper::Html;
use serde::{Deserialize, Serialize};

const PHD_PATTERN: &str = r"(?i)\bp\.?h\.?d\.?\b";
const MS_PATTERN: &str = r"(?i)\bm\.?s\.?\b";
const UNDERGRAD_CLASSIC_PATTERN: &str = r"(?i)\b(degree|bachelors|b\.?s)\b";
const UNDERGRAD_DEGREE_ONLY_PATTERN: &str = r"(?i)\bdegree\b";

/// Tags whose text never counts as visible posting text
const HIDDEN_TAGS: [&str; 2] = ["script", "style"];

/// Text fragments matched per degree category
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DegreeSignals {
    pub phd: Vec<String>,
    pub ms: Vec<String>,
    pub undergrad: Vec<String>,
}

/// Compiled pattern table for the three degree categories
#[derive(Debug, Clone)]
pub struct SignalRules {
    phd: Vec<Regex>,
    ms: Vec<Regex>,
    undergrad: Vec<Regex>,
}

impl Default for SignalRules {
    fn default() -> Self {
        Self::for_rule(UndergradRule::Classic)
    }
}

impl SignalRules {
    /// Built-in patterns with the given undergraduate rule
    pub fn for_rule(rule: UndergradRule) -> Self {
        let undergrad = match rule {
            UndergradRule::Classic => UNDERGRAD_CLASSIC_PATTERN,
            UndergradRule::DegreeOnly => UNDERGRAD_DEGREE_ONLY_PATTERN,
        };
        // The built-in patterns are constants known to compile
        Self {
            phd: vec![Regex::new(PHD_PATTERN).unwrap()],
            ms: vec![Regex::new(MS_PATTERN).unwrap()],
            undergrad: vec![Regex::new(undergrad).unwrap()],
        }
    }

    /// Build rules from configuration; explicit pattern lists replace the presets
    pub fn from_config(config: &ClassifyConfig) -> Result<Self> {
        let mut rules = Self::for_rule(config.undergrad_rule);

        if !config.phd_patterns.is_empty() {
            rules.phd = compile_all(&config.phd_patterns)?;
        }
        if !config.ms_patterns.is_empty() {
            rules.ms = compile_all(&config.ms_patterns)?;
        }
        if !config.undergrad_patterns.is_empty() {
            rules.undergrad = compile_all(&config.undergrad_patterns)?;
        }

        Ok(rules)
    }

    /// Scan the visible text of a posting for degree mentions
    pub fn extract(&self, html: &str) -> DegreeSignals {
        let mut signals = DegreeSignals::default();

        for fragment in visible_text_nodes(html) {
            if matches_any(&self.phd, &fragment) {
                signals.phd.push(fragment.clone());
            }
            if matches_any(&self.ms, &fragment) {
                signals.ms.push(fragment.clone());
            }
            if matches_any(&self.undergrad, &fragment) {
                signals.undergrad.push(fragment);
            }
        }

        signals
    }
}

/// Anything that can report the raw degree mentions in posting HTML
pub trait SignalExtractor: Send + Sync {
    fn extract_signals(&self, html: &str) -> DegreeSignals;
}

impl SignalExtractor for SignalRules {
    fn extract_signals(&self, html: &str) -> DegreeSignals {
        self.extract(html)
    }
}

fn compile_all(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).map_err(Into::into))
        .collect()
}

fn matches_any(patterns: &[Regex], text: &str) -> bool {
    patterns.iter().any(|re| re.is_match(text))
}

/// Collect every text node that is not inside a script or style element
fn visible_text_nodes(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .tree
        .nodes()
        .filter_map(|node| {
            let text: &str = node.value().as_text()?;
            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| HIDDEN_TAGS.contains(&el.name()))
            });
            if hidden || text.trim().is_empty() {
                None
            } else {
                Some(text.to_string())
            }
        })
        .collect()
}
