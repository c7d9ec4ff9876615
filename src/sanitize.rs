//! Link/Name Sanitization (`spec.md` §4.5 last paragraph, §4.9): the
//! aggregator-level contextual-link allow-list plus self-reference rejection,
//! and the final mixed-language cast-name repair pass over every text-bearing
//! field of the assembled [`crate::aggregate::Article`].

use std::collections::HashSet;

use regex::Regex;
use rustc_hash::FxHashMap;
use unicode_normalization::UnicodeNormalization;

use crate::chunks::ContextualLink;
use crate::job::RelatedArticleCandidate;

/// Normalizes to NFC before lowercasing, so a cast name and a Latin run pulled
/// out of generated prose compare equal regardless of which Unicode
/// normalization form either side happens to use (e.g. a precomposed vs.
/// combining-mark rendition of the same accented letter).
fn normalize_key(s: &str) -> String {
    s.nfc().collect::<String>().to_lowercase()
}

/// Drops any link whose `linkedSlug` equals the article's own slug
/// (self-reference) or is absent from the allowed-slug set; for survivors,
/// copies `thumbnailUrl`/`qualityScore` from the matching candidate.
pub fn filter_and_enrich_links(
    links: Vec<ContextualLink>,
    candidates: &[RelatedArticleCandidate],
    article_slug: &str,
) -> Vec<ContextualLink> {
    let by_slug: FxHashMap<&str, &RelatedArticleCandidate> =
        candidates.iter().map(|c| (c.slug.as_str(), c)).collect();

    links
        .into_iter()
        .filter(|l| l.linked_slug != article_slug)
        .filter_map(|mut l| {
            let candidate = by_slug.get(l.linked_slug.as_str())?;
            l.thumbnail_url = candidate.thumbnail_url.clone();
            l.quality_score = Some(candidate.quality_score);
            Some(l)
        })
        .collect()
}

/// Builds the case-insensitive Latin-token → canonical-full-name map used by
/// [`repair_mixed_language_names`]: every cast full name, plus its individual
/// whitespace-separated tokens, each mapping back to the full name.
fn canonical_name_map(full_names: &[String]) -> FxHashMap<String, String> {
    let mut map = FxHashMap::default();
    for name in full_names {
        map.insert(normalize_key(name), name.clone());
        for tok in name.split_whitespace() {
            map.entry(normalize_key(tok)).or_insert_with(|| name.clone());
        }
    }
    map
}

fn mixed_script_pattern() -> &'static Regex {
    static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    RE.get_or_init(|| {
        // Non-Latin run (1-10 code points) adjacent to a Latin run (2-15 code
        // points), in either order, separated by at most one space.
        Regex::new(
            r"(?x)
            (?P<a>[^\x00-\x7F\s]{1,10})\s?(?P<b>[A-Za-z][A-Za-z\s]{0,14})
            |
            (?P<b2>[A-Za-z][A-Za-z\s]{1,14})\s?(?P<a2>[^\x00-\x7F\s]{1,10})
            ",
        )
        .expect("static regex")
    })
}

/// For each match of a short non-Latin run adjacent to a short Latin run:
/// looks the Latin substring up (case-insensitively) in a map built from all
/// cast full names plus individual tokens; if it resolves to a canonical full
/// name AND the non-Latin substring is no longer than 4 code points, replaces
/// the whole match with the canonical full name; otherwise leaves the text
/// alone (avoids overwriting ordinary prose sitting next to a Latin word).
pub fn repair_mixed_language_names(text: &str, full_names: &[String]) -> String {
    if full_names.is_empty() {
        return text.to_string();
    }
    let map = canonical_name_map(full_names);
    let re = mixed_script_pattern();

    re.replace_all(text, |caps: &regex::Captures| {
        let whole = caps.get(0).unwrap().as_str();
        let (latin, non_latin) = if let (Some(a), Some(b)) = (caps.name("a"), caps.name("b")) {
            (b.as_str(), a.as_str())
        } else if let (Some(b2), Some(a2)) = (caps.name("b2"), caps.name("a2")) {
            (b2.as_str(), a2.as_str())
        } else {
            return whole.to_string();
        };

        let latin_key = normalize_key(latin.trim());
        match map.get(&latin_key) {
            Some(canonical) if non_latin.chars().count() <= 4 => canonical.clone(),
            _ => whole.to_string(),
        }
    })
    .into_owned()
}

/// Builds the allowed-slug set from a job's related-article candidates.
pub fn allowed_slugs(candidates: &[RelatedArticleCandidate]) -> HashSet<String> {
    candidates.iter().map(|c| c.slug.clone()).collect()
}

/// The final pass mandated by `spec.md` §4.5's last paragraph: mixed-language
/// cast-name repair "applied after aggregation as a final pass over every
/// text-bearing field of the Article". Walks every prose/string field —
/// including nested structures like quotes, FAQs, and biographies — but
/// leaves identifiers (slug, linked slugs, URLs) and numeric fields alone.
pub fn repair_article_names(article: &mut crate::aggregate::Article, full_names: &[String]) {
    if full_names.is_empty() {
        return;
    }
    let repair = |s: &mut String| *s = repair_mixed_language_names(s, full_names);
    let repair_vec = |v: &mut [String]| {
        for s in v.iter_mut() {
            *s = repair_mixed_language_names(s, full_names);
        }
    };

    repair(&mut article.title);
    repair(&mut article.meta_title);
    repair(&mut article.meta_description);
    repair(&mut article.summary);
    repair(&mut article.short_summary);
    repair(&mut article.thumbnail_alt);
    repair(&mut article.main_theme);
    repair(&mut article.main_tone);
    repair_vec(&mut article.highlights);
    repair_vec(&mut article.scene_locations);
    for g in &mut article.gallery_images {
        repair(&mut g.alt);
    }
    for m in &mut article.key_moments {
        repair(&mut m.name);
    }
    repair(&mut article.dialogue_analysis);
    repair(&mut article.character_insight);
    for q in &mut article.top_quotes {
        repair(&mut q.text);
        repair(&mut q.emotion);
        repair(&mut q.context);
    }
    repair(&mut article.language_notes);
    repair(&mut article.actor_performance_trend);
    repair(&mut article.detailed_review);
    for b in &mut article.biographies {
        repair(&mut b.text);
    }
    for t in &mut article.tag_descriptions {
        repair(&mut t.name);
        repair(&mut t.description);
    }
    repair(&mut article.expert_analysis);
    repair(&mut article.character_dynamic);
    repair(&mut article.plot_analysis);
    repair(&mut article.recommendation_blurb);
    repair_vec(&mut article.audience_list);
    repair(&mut article.comparison_note);
    for l in &mut article.contextual_links {
        repair(&mut l.text);
        repair(&mut l.linked_title);
    }
    repair(&mut article.setting_description);
    repair_vec(&mut article.mood_tone);
    repair_vec(&mut article.thematic_keywords);
    repair(&mut article.translation_method);
    repair(&mut article.translation_note);
    repair(&mut article.subtitle_quality);
    repair(&mut article.video_quality);
    repair(&mut article.audio_quality);
    for f in article.technical_faqs.iter_mut().chain(article.general_faqs.iter_mut()) {
        repair(&mut f.question);
        repair(&mut f.answer);
    }
    repair_vec(&mut article.seo_keywords);
    repair_vec(&mut article.long_tail_keywords);
    repair(&mut article.cinematography_analysis);
    repair(&mut article.visual_style);
    repair_vec(&mut article.atmosphere_notes);
    repair(&mut article.character_journey);
    for e in &mut article.emotional_arc {
        repair(&mut e.phase);
        repair(&mut e.emotion);
        repair(&mut e.description);
    }
    repair(&mut article.thematic_explanation);
    repair(&mut article.cultural_context);
    repair(&mut article.genre_insights);
    repair(&mut article.studio_comparison);
    repair(&mut article.actor_evolution);
    repair(&mut article.genre_ranking);
    repair(&mut article.viewing_tips);
    repair_vec(&mut article.best_moments);
    repair(&mut article.audience_match);
    repair(&mut article.replay_value);
}
