//! Validators (`spec.md` §4.4): per-stage structural/length checks plus the
//! cross-cutting paragraph-structure and name-spam rules. Character counts
//! are over Unicode code points (`str::chars().count()`), not bytes.

use crate::chunks::{
    ChunkOutput1, ChunkOutput2, ChunkOutput3, ChunkOutput4, ChunkOutput5, ChunkOutput6, ChunkOutput7,
};
use crate::error::ValidationIssue;
use crate::job::CastEntry;
use crate::safety::SafetyTables;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationResult {
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self::default()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    fn push_error(&mut self, field: &str, rule: &str, detail: impl Into<String>) {
        self.errors.push(ValidationIssue {
            field: field.to_string(),
            rule: rule.to_string(),
            detail: detail.into(),
        });
    }

    fn push_warning(&mut self, field: &str, rule: &str, detail: impl Into<String>) {
        self.warnings.push(ValidationIssue {
            field: field.to_string(),
            rule: rule.to_string(),
            detail: detail.into(),
        });
    }

    fn merge(&mut self, other: ValidationResult) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }
}

fn chars(s: &str) -> usize {
    s.chars().count()
}

fn words(s: &str) -> Vec<&str> {
    s.split_whitespace().collect()
}

fn paragraphs(s: &str) -> Vec<&str> {
    s.split("\n\n").map(str::trim).filter(|p| !p.is_empty()).collect()
}

/// Paragraph structure: a long field has at least its declared minimum
/// number of paragraphs; no paragraph exceeds 200 words.
fn check_paragraphs(result: &mut ValidationResult, field: &str, text: &str, min_paragraphs: usize) {
    let paras = paragraphs(text);
    if paras.len() < min_paragraphs {
        result.push_error(
            field,
            "min_paragraphs",
            format!("expected at least {min_paragraphs} paragraphs, found {}", paras.len()),
        );
    }
    for (i, p) in paras.iter().enumerate() {
        let word_count = words(p).len();
        if word_count > 200 {
            result.push_error(
                field,
                "max_paragraph_words",
                format!("paragraph {i} has {word_count} words, exceeds 200"),
            );
        }
    }
}

/// Name-spam: a cast's full name occurs no more than 5 times per 100 words
/// of any long field (warning-level).
fn check_name_spam(result: &mut ValidationResult, field: &str, text: &str, casts: &[CastEntry]) {
    let total_words = words(text).len().max(1);
    for cast in casts {
        let occurrences = text.matches(cast.full_name.as_str()).count();
        let per_100 = (occurrences as f64) * 100.0 / (total_words as f64);
        if per_100 > 5.0 {
            result.push_warning(
                field,
                "name_spam",
                format!("'{}' appears {occurrences} times ({per_100:.1} per 100 words)", cast.full_name),
            );
        }
    }
}

pub fn validate_stage1(out: &ChunkOutput1, casts: &[CastEntry]) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if chars(&out.summary) < 800 {
        result.push_error("summary", "min_length", format!("{} chars, need ≥800", chars(&out.summary)));
    }
    if chars(&out.title) < 20 {
        result.push_error("title", "min_length", format!("{} chars, need ≥20", chars(&out.title)));
    }
    if out.main_theme.trim().is_empty() {
        result.push_error("main_theme", "non_empty", "main theme is empty");
    }
    if out.main_tone.trim().is_empty() {
        result.push_error("main_tone", "non_empty", "main tone is empty");
    }
    check_paragraphs(&mut result, "summary", &out.summary, 4);
    check_name_spam(&mut result, "summary", &out.summary, casts);
    result
}

pub fn validate_stage2(out: &ChunkOutput2, casts: &[CastEntry]) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if out.highlights.len() < 3 {
        result.push_error("highlights", "min_count", format!("{} highlights, need ≥3", out.highlights.len()));
    }
    for highlight in &out.highlights {
        let matches_cast = casts.iter().any(|c| c.full_name == *highlight);
        if matches_cast {
            result.push_warning("highlights", "equals_cast_name", highlight.clone());
        }
        if chars(highlight) < 15 {
            result.push_warning("highlights", "min_length", format!("'{highlight}' is {} chars", chars(highlight)));
        }
    }
    result
}

/// Stage 3's §4.4 table entry is non-exhaustive in the spec; this enforces
/// the one hard requirement spelled out in its §4.2 description (4-5 top
/// quotes) and leaves in-range timestamps to the stage-3 post-processor
/// ([`crate::postprocess::quotes::gate_top_quotes`]), which runs afterward.
pub fn validate_stage3(out: &ChunkOutput3) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if out.top_quotes.len() < 4 {
        result.push_error("top_quotes", "min_count", format!("{} quotes, need ≥4", out.top_quotes.len()));
    }
    if out.language_notes.trim().is_empty() {
        result.push_error("language_notes", "non_empty", "language notes are empty");
    }
    result
}

/// Stage 5's one hard requirement from its §4.2 description: the comparison
/// note must reference at least one external video code drawn from the
/// job's previous works or related-article candidates.
pub fn validate_stage5(out: &ChunkOutput5, known_external_codes: &[String]) -> ValidationResult {
    let mut result = ValidationResult::ok();
    let references_a_code = known_external_codes.iter().any(|code| out.comparison_note.contains(code.as_str()));
    if !known_external_codes.is_empty() && !references_a_code {
        result.push_error(
            "comparison_note",
            "missing_external_code_reference",
            "comparison note does not reference any known external video code",
        );
    }
    if out.contextual_links.len() < 2 || out.contextual_links.len() > 4 {
        result.push_warning(
            "contextual_links",
            "count_out_of_range",
            format!("{} links, expected 2-4", out.contextual_links.len()),
        );
    }
    result
}

pub fn validate_stage4(out: &ChunkOutput4, casts: &[CastEntry]) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if chars(&out.detailed_review) < 1000 {
        result.push_error(
            "detailed_review",
            "min_length",
            format!("{} chars, need ≥1000", chars(&out.detailed_review)),
        );
    }
    if chars(&out.expert_analysis) < 100 {
        result.push_error(
            "expert_analysis",
            "min_length",
            format!("{} chars, need ≥100", chars(&out.expert_analysis)),
        );
    }
    for td in &out.tag_descriptions {
        if chars(td.description.trim()) < 10 {
            result.push_error(
                "tag_descriptions",
                "min_length",
                format!("tag '{}' description is {} chars", td.id, chars(td.description.trim())),
            );
        }
    }
    check_paragraphs(&mut result, "detailed_review", &out.detailed_review, 5);
    check_name_spam(&mut result, "detailed_review", &out.detailed_review, casts);
    result
}

pub fn validate_stage6(out: &ChunkOutput6, casts: &[CastEntry], tables: &SafetyTables, locale: &str) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if out.general_faqs.len() < 5 {
        result.push_error(
            "general_faqs",
            "min_count",
            format!("{} general FAQs, need ≥5", out.general_faqs.len()),
        );
    }
    let markers = tables.interrogative_markers_for(locale);
    let all_faqs = out.technical_faqs.iter().chain(out.general_faqs.iter());
    for faq in all_faqs {
        let normalized = faq.question.trim().trim_end_matches('?').to_lowercase();
        let matches_cast = casts
            .iter()
            .any(|c| c.full_name.to_lowercase() == normalized);
        if matches_cast {
            result.push_warning("faq_question", "equals_cast_name", faq.question.clone());
        }
        if chars(&faq.question) < 15 {
            result.push_warning("faq_question", "min_length", faq.question.clone());
        }
        let has_marker = markers.iter().any(|m| faq.question.to_lowercase().contains(m.as_str()));
        if !has_marker {
            result.push_warning("faq_question", "no_interrogative_marker", faq.question.clone());
        }
    }
    result
}

pub fn validate_stage7(out: &ChunkOutput7, casts: &[CastEntry]) -> ValidationResult {
    let mut result = ValidationResult::ok();
    if chars(&out.cinematography_analysis) < 500 {
        result.push_error(
            "cinematography_analysis",
            "min_length",
            format!("{} chars, need ≥500", chars(&out.cinematography_analysis)),
        );
    }
    if chars(&out.character_journey) < 600 {
        result.push_error(
            "character_journey",
            "min_length",
            format!("{} chars, need ≥600", chars(&out.character_journey)),
        );
    }
    if chars(&out.thematic_explanation) < 400 {
        result.push_error(
            "thematic_explanation",
            "min_length",
            format!("{} chars, need ≥400", chars(&out.thematic_explanation)),
        );
    }
    if chars(&out.viewing_tips) < 300 {
        result.push_error("viewing_tips", "min_length", format!("{} chars, need ≥300", chars(&out.viewing_tips)));
    }
    if out.emotional_arc.len() < 3 {
        result.push_error("emotional_arc", "min_count", format!("{} entries, need ≥3", out.emotional_arc.len()));
    }
    if out.atmosphere_notes.len() < 3 {
        result.push_error("atmosphere_notes", "min_count", format!("{} entries, need ≥3", out.atmosphere_notes.len()));
    }
    if out.best_moments.len() < 3 {
        result.push_error("best_moments", "min_count", format!("{} entries, need ≥3", out.best_moments.len()));
    }
    check_paragraphs(&mut result, "cinematography_analysis", &out.cinematography_analysis, 3);
    check_paragraphs(&mut result, "character_journey", &out.character_journey, 3);
    check_paragraphs(&mut result, "thematic_explanation", &out.thematic_explanation, 2);
    check_name_spam(&mut result, "cinematography_analysis", &out.cinematography_analysis, casts);
    check_name_spam(&mut result, "character_journey", &out.character_journey, casts);
    check_name_spam(&mut result, "thematic_explanation", &out.thematic_explanation, casts);
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast(name: &str) -> CastEntry {
        CastEntry {
            id: name.to_string(),
            full_name: name.to_string(),
            localized_name: None,
            slug: name.to_lowercase().replace(' ', "-"),
        }
    }

    fn long_paragraphs(n: usize, words_per_paragraph: usize) -> String {
        (0..n)
            .map(|i| format!("paragraph {i} ") + &"word ".repeat(words_per_paragraph))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    #[test]
    fn stage1_rejects_short_summary_and_title() {
        let out = ChunkOutput1 {
            title: "short".into(),
            meta_title: "m".into(),
            meta_description: "d".into(),
            summary: "too short".into(),
            short_summary: "s".into(),
            thumbnail_alt: "a".into(),
            quality_score: 5,
            main_theme: "".into(),
            main_tone: "tone".into(),
        };
        let result = validate_stage1(&out, &[]);
        assert!(result.has_errors());
        let rules: Vec<_> = result.errors.iter().map(|e| e.rule.as_str()).collect();
        assert!(rules.contains(&"min_length"));
        assert!(rules.contains(&"non_empty"));
    }

    #[test]
    fn stage1_accepts_well_formed_summary() {
        let out = ChunkOutput1 {
            title: "A sufficiently long article title".into(),
            meta_title: "m".into(),
            meta_description: "d".into(),
            summary: long_paragraphs(4, 50),
            short_summary: "s".into(),
            thumbnail_alt: "a".into(),
            quality_score: 8,
            main_theme: "drama".into(),
            main_tone: "hopeful".into(),
        };
        let result = validate_stage1(&out, &[]);
        assert!(!result.has_errors(), "{:?}", result.errors);
    }

    #[test]
    fn stage1_warns_on_name_spam_in_summary() {
        let casts = vec![cast("Alex Doe")];
        let spammy = (0..20).map(|_| "Alex Doe went on an adventure today").collect::<Vec<_>>().join(". ");
        let out = ChunkOutput1 {
            title: "A sufficiently long article title".into(),
            meta_title: "m".into(),
            meta_description: "d".into(),
            summary: long_paragraphs(4, 50) + "\n\n" + &spammy,
            short_summary: "s".into(),
            thumbnail_alt: "a".into(),
            quality_score: 8,
            main_theme: "drama".into(),
            main_tone: "hopeful".into(),
        };
        let result = validate_stage1(&out, &casts);
        assert!(result.warnings.iter().any(|w| w.rule == "name_spam"));
    }

    #[test]
    fn stage2_warns_on_short_or_cast_name_highlight() {
        let casts = vec![cast("Alex Doe")];
        let out = ChunkOutput2 {
            highlights: vec!["Alex Doe".into(), "short".into(), "a perfectly fine highlight here".into()],
            key_moments: vec![],
            scene_locations: vec![],
            gallery_alts: vec![],
        };
        let result = validate_stage2(&out, &casts);
        assert!(!result.has_errors());
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn stage3_requires_minimum_quotes() {
        let out = ChunkOutput3 {
            dialogue_analysis: "a".into(),
            character_insight: "b".into(),
            top_quotes: vec![],
            language_notes: "notes".into(),
            actor_performance_trend: "t".into(),
        };
        let result = validate_stage3(&out);
        assert!(result.errors.iter().any(|e| e.field == "top_quotes"));
    }

    #[test]
    fn stage5_requires_external_code_reference() {
        let out = ChunkOutput5 {
            character_dynamic: "a".into(),
            plot_analysis: "b".into(),
            recommendation_blurb: "c".into(),
            audience_list: vec![],
            comparison_note: "A fine film with no references".into(),
            contextual_links: vec![],
            setting_description: "d".into(),
            mood_tone: vec![],
            thematic_keywords: vec![],
        };
        let result = validate_stage5(&out, &["ABC-123".to_string()]);
        assert!(result.errors.iter().any(|e| e.field == "comparison_note"));
    }

    #[test]
    fn stage5_accepts_note_with_external_code() {
        let out = ChunkOutput5 {
            character_dynamic: "a".into(),
            plot_analysis: "b".into(),
            recommendation_blurb: "c".into(),
            audience_list: vec![],
            comparison_note: "Similar in tone to ABC-123".into(),
            contextual_links: vec![],
            setting_description: "d".into(),
            mood_tone: vec![],
            thematic_keywords: vec![],
        };
        let result = validate_stage5(&out, &["ABC-123".to_string()]);
        assert!(!result.errors.iter().any(|e| e.field == "comparison_note"));
    }

    #[test]
    fn stage4_flags_short_tag_description() {
        let out = ChunkOutput4 {
            detailed_review: long_paragraphs(5, 120),
            biographies: vec![],
            tag_descriptions: vec![crate::chunks::TagDescription {
                id: "t1".into(),
                name: "Action".into(),
                description: "short".into(),
            }],
            expert_analysis: "word ".repeat(30),
        };
        let result = validate_stage4(&out, &[]);
        assert!(result.errors.iter().any(|e| e.field == "tag_descriptions"));
    }

    #[test]
    fn stage6_requires_five_general_faqs() {
        let out = ChunkOutput6 {
            translation_method: "m".into(),
            translation_note: "n".into(),
            subtitle_quality: "q".into(),
            video_quality: "q".into(),
            audio_quality: "q".into(),
            technical_faqs: vec![],
            general_faqs: vec![
                crate::chunks::FAQItem { question: "What happens next?".into(), answer: "a".into() },
                crate::chunks::FAQItem { question: "Why is this good?".into(), answer: "a".into() },
            ],
            seo_keywords: vec![],
            long_tail_keywords: vec![],
        };
        let tables = SafetyTables::default();
        let result = validate_stage6(&out, &[], &tables, "en");
        assert!(result.errors.iter().any(|e| e.field == "general_faqs"));
    }

    #[test]
    fn stage7_requires_minimum_lengths_and_counts() {
        let out = ChunkOutput7 {
            cinematography_analysis: "too short".into(),
            visual_style: "s".into(),
            atmosphere_notes: vec!["one".into()],
            character_journey: "too short".into(),
            emotional_arc: vec![],
            thematic_explanation: "too short".into(),
            cultural_context: "c".into(),
            genre_insights: "g".into(),
            studio_comparison: "s".into(),
            actor_evolution: "a".into(),
            genre_ranking: "r".into(),
            viewing_tips: "too short".into(),
            best_moments: vec![],
            audience_match: "m".into(),
            replay_value: "v".into(),
        };
        let result = validate_stage7(&out, &[]);
        assert!(result.errors.len() >= 7);
    }

    #[test]
    fn stage7_warns_on_name_spam_in_cinematography_and_thematic_fields() {
        let casts = vec![cast("Alex Doe")];
        let spammy = |base: String| {
            base + "\n\n" + &(0..20).map(|_| "Alex Doe appears here again").collect::<Vec<_>>().join(". ")
        };
        let out = ChunkOutput7 {
            cinematography_analysis: spammy(long_paragraphs(3, 80)),
            visual_style: "s".into(),
            atmosphere_notes: vec!["one".into(), "two".into(), "three".into()],
            character_journey: long_paragraphs(3, 100),
            emotional_arc: vec![
                crate::chunks::EmotionalArcPoint { phase: "p".into(), emotion: "e".into(), description: "d".into() },
                crate::chunks::EmotionalArcPoint { phase: "p2".into(), emotion: "e2".into(), description: "d2".into() },
                crate::chunks::EmotionalArcPoint { phase: "p3".into(), emotion: "e3".into(), description: "d3".into() },
            ],
            thematic_explanation: spammy(long_paragraphs(2, 100)),
            cultural_context: "c".into(),
            genre_insights: "g".into(),
            studio_comparison: "s".into(),
            actor_evolution: "a".into(),
            genre_ranking: "r".into(),
            viewing_tips: "word ".repeat(60),
            best_moments: vec!["m1".into(), "m2".into(), "m3".into()],
            audience_match: "m".into(),
            replay_value: "v".into(),
        };
        let result = validate_stage7(&out, &casts);
        assert!(result.warnings.iter().any(|w| w.field == "cinematography_analysis" && w.rule == "name_spam"));
        assert!(result.warnings.iter().any(|w| w.field == "thematic_explanation" && w.rule == "name_spam"));
    }
}
