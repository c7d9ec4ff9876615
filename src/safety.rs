//! Safety Tables (`spec.md` §4.11): static configuration consumed by the
//! validators and post-processors. Shipped as embedded data and treated as
//! immutable after process start (`spec.md` §9), matching the "safety tables
//! are read-only after process start" design note and `wg-bastion`'s
//! preference for config-as-data over scattered literals.

use std::fs;
use std::path::Path;

use aho_corasick::AhoCorasick;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Minimum paragraph counts per long field (`spec.md` §4.4).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParagraphMinimums {
    pub summary: usize,
    pub detailed_review: usize,
    pub character_journey: usize,
    pub cinematography_analysis: usize,
    pub thematic_explanation: usize,
}

impl Default for ParagraphMinimums {
    fn default() -> Self {
        Self {
            summary: 4,
            detailed_review: 5,
            character_journey: 3,
            cinematography_analysis: 3,
            thematic_explanation: 2,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyTables {
    /// Blacklisted vocabulary for key-moment names and SEO keywords
    /// (matched case-insensitively as a substring).
    pub blacklist_vocabulary: Vec<String>,
    /// Explicit term → polite paraphrase, applied by plain-string replacement.
    pub substitution_map: FxHashMap<String, String>,
    /// Interrogative marker list, keyed by target-language locale.
    pub interrogative_markers: FxHashMap<String, Vec<String>>,
    /// Supported (source, target) translation-language pairs.
    pub supported_language_pairs: Vec<(String, String)>,
    pub paragraph_minimums: ParagraphMinimums,
    /// Configurable pronoun used by the pronoun-substitution post-processor
    /// (`spec.md` §4.5), keyed by locale.
    pub pronoun_by_locale: FxHashMap<String, String>,
    /// Small seed list of key moments used to top up stage 2 output when
    /// fewer than the configured minimum survive post-processing.
    pub key_moment_seed: Vec<SeedKeyMoment>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeedKeyMoment {
    pub name: String,
    pub start_offset: f64,
    pub end_offset: f64,
}

impl Default for SafetyTables {
    fn default() -> Self {
        let mut substitution_map = FxHashMap::default();
        substitution_map.insert("kill".to_string(), "confront".to_string());
        substitution_map.insert("hate".to_string(), "strongly dislike".to_string());
        substitution_map.insert("stupid".to_string(), "unwise".to_string());

        let mut interrogative_markers = FxHashMap::default();
        interrogative_markers.insert(
            "en".to_string(),
            vec![
                "?".to_string(),
                "what".to_string(),
                "why".to_string(),
                "how".to_string(),
                "who".to_string(),
                "when".to_string(),
                "where".to_string(),
                "which".to_string(),
                "is".to_string(),
                "does".to_string(),
                "do".to_string(),
            ],
        );

        let mut pronoun_by_locale = FxHashMap::default();
        pronoun_by_locale.insert("en".to_string(), "she".to_string());
        pronoun_by_locale.insert("th".to_string(), "เธอ".to_string());

        Self {
            blacklist_vocabulary: vec!["explicit".to_string(), "banned-term".to_string()],
            substitution_map,
            interrogative_markers,
            supported_language_pairs: vec![
                ("ja".to_string(), "en".to_string()),
                ("ko".to_string(), "en".to_string()),
            ],
            paragraph_minimums: ParagraphMinimums::default(),
            pronoun_by_locale,
            key_moment_seed: vec![
                SeedKeyMoment {
                    name: "Opening scene".to_string(),
                    start_offset: 0.0,
                    end_offset: 30.0,
                },
                SeedKeyMoment {
                    name: "Mid-point turn".to_string(),
                    start_offset: 150.0,
                    end_offset: 180.0,
                },
                SeedKeyMoment {
                    name: "Closing scene".to_string(),
                    start_offset: 300.0,
                    end_offset: 330.0,
                },
            ],
        }
    }
}

impl SafetyTables {
    /// Loads from `path` (JSON) when configured (`spec.md` §6: "safety
    /// tables (paths or inline)"), falling back to [`SafetyTables::default`]
    /// when no path is configured.
    pub fn load(path: Option<&str>) -> Result<Self, SafetyTablesError> {
        match path {
            Some(p) => Self::from_path(p),
            None => Ok(Self::default()),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SafetyTablesError> {
        let raw = fs::read_to_string(path.as_ref()).map_err(|e| SafetyTablesError::Io {
            path: path.as_ref().display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&raw).map_err(|e| SafetyTablesError::Parse {
            path: path.as_ref().display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn interrogative_markers_for(&self, locale: &str) -> &[String] {
        self.interrogative_markers
            .get(locale)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn pronoun_for(&self, locale: &str) -> &str {
        self.pronoun_by_locale
            .get(locale)
            .map(String::as_str)
            .unwrap_or("they")
    }

    /// Case-insensitive, single-pass multi-pattern match against
    /// [`Self::blacklist_vocabulary`], matching the Aho-Corasick automaton
    /// idiom `wg-bastion`'s honeytoken detector builds over its own pattern
    /// set (`prompt/honeytoken.rs::build_automaton`), rather than scanning
    /// the text once per term.
    pub fn is_blacklisted(&self, text: &str) -> bool {
        if self.blacklist_vocabulary.is_empty() {
            return false;
        }
        let automaton = AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&self.blacklist_vocabulary)
            .expect("blacklist terms are valid literals");
        automaton.is_match(text)
    }
}

#[derive(Debug, thiserror::Error, Clone)]
pub enum SafetyTablesError {
    #[error("could not read safety tables at {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("could not parse safety tables at {path}: {reason}")]
    Parse { path: String, reason: String },
}
