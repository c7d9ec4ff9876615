//! Vocabulary substitution and the blacklisted-keyword filter (`spec.md`
//! §4.5, stages 4/6/7).

use aho_corasick::{AhoCorasick, MatchKind};

use crate::safety::SafetyTables;

/// A fixed map of explicit terms → polite paraphrases, applied in a single
/// pass with an Aho-Corasick automaton (`wg-bastion`'s
/// `prompt/honeytoken.rs::build_automaton` multi-pattern idiom) instead of
/// one `str::replace` per term. `LeftmostLongest` match semantics mean a
/// term that is a substring of another shipped term never steals a match
/// that should go to the longer one.
pub fn substitute_vocabulary(text: &str, tables: &SafetyTables) -> String {
    if tables.substitution_map.is_empty() {
        return text.to_string();
    }
    let (patterns, replacements): (Vec<&str>, Vec<&str>) = tables
        .substitution_map
        .iter()
        .map(|(term, replacement)| (term.as_str(), replacement.as_str()))
        .unzip();
    let automaton = AhoCorasick::builder()
        .match_kind(MatchKind::LeftmostLongest)
        .build(&patterns)
        .expect("vocabulary terms are valid literals");
    automaton.replace_all(text, &replacements)
}

/// Drops keywords containing any disallowed term (case-insensitive substring).
pub fn filter_blacklisted_keywords(keywords: Vec<String>, tables: &SafetyTables) -> Vec<String> {
    keywords.into_iter().filter(|k| !tables.is_blacklisted(k)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_explicit_terms() {
        let tables = SafetyTables::default();
        let result = substitute_vocabulary("I hate when characters kill each other", &tables);
        assert!(result.contains("strongly dislike"));
        assert!(result.contains("confront"));
        assert!(!result.contains("hate"));
        assert!(!result.contains("kill"));
    }

    #[test]
    fn leaves_clean_text_unchanged() {
        let tables = SafetyTables::default();
        let text = "A heartwarming story about friendship";
        assert_eq!(substitute_vocabulary(text, &tables), text);
    }

    #[test]
    fn is_idempotent() {
        let tables = SafetyTables::default();
        let once = substitute_vocabulary("they kill and hate", &tables);
        let twice = substitute_vocabulary(&once, &tables);
        assert_eq!(once, twice);
    }

    #[test]
    fn filters_blacklisted_keywords() {
        let tables = SafetyTables::default();
        let keywords = vec!["explicit content".to_string(), "romantic comedy".to_string()];
        let result = filter_blacklisted_keywords(keywords, &tables);
        assert_eq!(result, vec!["romantic comedy".to_string()]);
    }
}
