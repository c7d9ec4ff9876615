//! Context Builder (`spec.md` §4.3): pure functions deriving `CoreContext`
//! from stage 1, and `ExtendedContext` from stage 1/2/4.

use crate::chunks::{ChunkOutput1, ChunkOutput2, ChunkOutput4};
use crate::job::CastEntry;
use crate::state::{ActorEntry, CoreContext, EntityList, ExtendedContext};

/// `firstName` is the first whitespace-separated token of `fullName`.
pub fn first_name(full_name: &str) -> String {
    full_name
        .split_whitespace()
        .next()
        .unwrap_or(full_name)
        .to_string()
}

/// Tokenize by whitespace; if `tokens.len() <= n`, return unchanged;
/// otherwise join the first `n` tokens with a single space and append an
/// ellipsis.
pub fn truncate_words(text: &str, n: usize) -> String {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    if tokens.len() <= n {
        text.to_string()
    } else {
        format!("{}…", tokens[..n].join(" "))
    }
}

/// `buildCoreContext(stage1, casts)`. The actor list is exactly the job's
/// cast list (invariant in `spec.md` §3); `locations` starts empty and is
/// rewritten from stage 2 once phase 3 runs (see [`rewrite_locations`]).
pub fn build_core_context(stage1: &ChunkOutput1, casts: &[CastEntry]) -> CoreContext {
    let actors = casts
        .iter()
        .map(|c| ActorEntry {
            full_name: c.full_name.clone(),
            first_name: first_name(&c.full_name),
            role: "cast".to_string(),
        })
        .collect();

    CoreContext {
        title: stage1.title.clone(),
        summary: stage1.summary.clone(),
        main_theme: stage1.main_theme.clone(),
        main_tone: stage1.main_tone.clone(),
        entities: EntityList {
            actors,
            locations: Vec::new(),
            keywords: Vec::new(),
        },
    }
}

/// Phase 3 step: "Update CoreContext locations from stage 2" (`spec.md` §4.7).
pub fn rewrite_locations(core: &mut CoreContext, stage2: &ChunkOutput2) {
    core.entities.locations = stage2.scene_locations.clone();
}

/// `buildExtendedContext(core, stage2, stage4)`.
pub fn build_extended_context(
    core: &CoreContext,
    stage2: &ChunkOutput2,
    stage4: &ChunkOutput4,
) -> ExtendedContext {
    ExtendedContext {
        title: core.title.clone(),
        truncated_summary: truncate_words(&core.summary, 200),
        entities: core.entities.clone(),
        top_highlights: stage2.highlights.iter().take(3).cloned().collect(),
        scene_locations: stage2.scene_locations.clone(),
        expert_summary: truncate_words(&stage4.detailed_review, 100),
        expert_analysis: stage4.expert_analysis.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cast(name: &str) -> CastEntry {
        CastEntry {
            id: name.to_string(),
            full_name: name.to_string(),
            localized_name: None,
            slug: name.to_lowercase(),
        }
    }

    fn stage1() -> ChunkOutput1 {
        ChunkOutput1 {
            title: "A Great Film".into(),
            meta_title: "A Great Film".into(),
            meta_description: "desc".into(),
            summary: "word ".repeat(50).trim().to_string(),
            short_summary: "short".into(),
            thumbnail_alt: "alt".into(),
            quality_score: 8,
            main_theme: "adventure".into(),
            main_tone: "upbeat".into(),
        }
    }

    #[test]
    fn first_name_is_first_token() {
        let ctx = build_core_context(&stage1(), &[cast("Alex Doe")]);
        assert_eq!(ctx.entities.actors[0].first_name, "Alex");
    }

    #[test]
    fn core_context_actor_set_matches_cast_list_exactly() {
        let casts = vec![cast("Alex Doe"), cast("Sam Lee")];
        let ctx = build_core_context(&stage1(), &casts);
        let names: Vec<_> = ctx.entities.actors.iter().map(|a| a.full_name.as_str()).collect();
        assert_eq!(names, vec!["Alex Doe", "Sam Lee"]);
    }

    #[test]
    fn truncate_words_short_text_unchanged() {
        assert_eq!(truncate_words("one two three", 10), "one two three");
    }

    #[test]
    fn truncate_words_long_text_gets_ellipsis() {
        let text = "one two three four five";
        assert_eq!(truncate_words(text, 3), "one two three…");
    }

    #[test]
    fn rewrite_locations_replaces_empty_list() {
        let mut ctx = build_core_context(&stage1(), &[cast("Alex Doe")]);
        assert!(ctx.entities.locations.is_empty());
        let stage2 = ChunkOutput2 {
            highlights: vec!["h1".into(), "h2".into(), "h3".into()],
            key_moments: vec![],
            scene_locations: vec!["Paris".into(), "Rome".into()],
            gallery_alts: vec![],
        };
        rewrite_locations(&mut ctx, &stage2);
        assert_eq!(ctx.entities.locations, vec!["Paris", "Rome"]);
    }
}
