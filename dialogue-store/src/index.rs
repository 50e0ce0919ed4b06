//! In-memory corpus index and its filter queries.
//!
//! Filtering is a linear scan with one compiled regex per query; there is
//! no inverted index. Result order is always the original accumulation
//! order (chunk order, then within-chunk order) and is never re-ranked.

use std::collections::{BTreeMap, HashMap, HashSet};

use regex::RegexBuilder;
use tracing::trace;

use crate::errors::{Result, SearchError};
use crate::record::{DialogueRecord, ScenarioType};

/// The full assembled collection of dialogue records for one data version.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub dialogues: Vec<DialogueRecord>,
    /// Event identifier to display name, from the manifest or cache.
    pub event_names: BTreeMap<String, String>,
}

/// One filter query. Empty dimensions pass every record.
#[derive(Debug, Clone, Default)]
pub struct SearchFilter {
    /// OR-set of speaker substrings, matched case-sensitively. Speaker
    /// names are controlled vocabulary; do not "fix" this to be
    /// case-insensitive like the content match.
    pub speakers: Vec<String>,
    /// Scenario types the record must be one of.
    pub scenario_types: HashSet<ScenarioType>,
    /// Case-insensitive regex over `content`.
    pub content_pattern: Option<String>,
}

impl Corpus {
    /// Runs one filter query over the whole corpus.
    ///
    /// # Errors
    /// Returns [`SearchError::InvalidPattern`] when `content_pattern` does
    /// not compile; the corpus itself is untouched.
    pub fn search(&self, filter: &SearchFilter) -> Result<Vec<DialogueRecord>> {
        let pattern = match filter.content_pattern.as_deref().filter(|p| !p.is_empty()) {
            Some(p) => Some(
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| SearchError::InvalidPattern(e.to_string()))?,
            ),
            None => None,
        };

        let mut hits = Vec::new();
        for d in &self.dialogues {
            if !filter.speakers.is_empty()
                && !filter.speakers.iter().any(|s| d.speaker.contains(s.as_str()))
            {
                continue;
            }
            if !filter.scenario_types.is_empty()
                && !filter.scenario_types.contains(&d.scenario_type)
            {
                continue;
            }
            if let Some(re) = &pattern {
                if !re.is_match(&d.content) {
                    continue;
                }
            }
            hits.push(d.clone());
        }
        trace!(total = self.dialogues.len(), hits = hits.len(), "search done");
        Ok(hits)
    }
}

/// One scenario's worth of matched records, for display.
#[derive(Debug, Clone)]
pub struct ResultGroup {
    pub scenario_type: ScenarioType,
    pub scenario_id: String,
    /// Title of the first matched record in the scenario.
    pub title: String,
    pub records: Vec<DialogueRecord>,
}

/// Groups search hits by `(scenario_type, scenario_id)` preserving
/// first-seen order. Pure post-processing over a result set, not a
/// property of the index.
pub fn group_results(records: &[DialogueRecord]) -> Vec<ResultGroup> {
    let mut groups: Vec<ResultGroup> = Vec::new();
    let mut by_key: HashMap<(ScenarioType, String), usize> = HashMap::new();

    for r in records {
        let key = (r.scenario_type, r.scenario_id.clone());
        match by_key.get(&key) {
            Some(&i) => groups[i].records.push(r.clone()),
            None => {
                by_key.insert(key, groups.len());
                groups.push(ResultGroup {
                    scenario_type: r.scenario_type,
                    scenario_id: r.scenario_id.clone(),
                    title: r.title.clone(),
                    records: vec![r.clone()],
                });
            }
        }
    }
    groups
}
