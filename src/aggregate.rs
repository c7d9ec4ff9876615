//! Aggregator (`spec.md` §4.9): combines the 7 completed chunk outputs into
//! the final [`Article`] — slug, ISO-8601 duration, reading time, gallery alt
//! assignment, contextual-link filtering and key-moment URL injection.
//!
//! Grounded on the pipeline's own §4.9 rules; link filtering and the final
//! mixed-language name repair pass are delegated to [`crate::sanitize`]
//! (`spec.md` §4.12), which has its own regex-driven matching and tests.

use serde::{Deserialize, Serialize};

use crate::chunks::{
    CastBiography, ContextualLink, EmotionalArcPoint, FAQItem, KeyMoment, TagDescription, TopQuote,
};
use crate::job::Job;
use crate::sanitize::{filter_and_enrich_links, repair_article_names};
use crate::state::PipelineState;

/// One gallery image with its assigned alt text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GalleryImage {
    pub index: usize,
    pub alt: String,
}

/// The final assembled article, ready for an external publisher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub slug: String,
    pub title: String,
    pub meta_title: String,
    pub meta_description: String,
    pub summary: String,
    pub short_summary: String,
    pub thumbnail_alt: String,
    pub quality_score: u8,
    pub main_theme: String,
    pub main_tone: String,
    pub duration_iso8601: String,
    pub reading_time_minutes: u32,
    pub highlights: Vec<String>,
    pub key_moments: Vec<KeyMoment>,
    pub scene_locations: Vec<String>,
    pub gallery_images: Vec<GalleryImage>,
    pub dialogue_analysis: String,
    pub character_insight: String,
    pub top_quotes: Vec<TopQuote>,
    pub language_notes: String,
    pub actor_performance_trend: String,
    pub detailed_review: String,
    pub biographies: Vec<CastBiography>,
    pub tag_descriptions: Vec<TagDescription>,
    pub expert_analysis: String,
    pub character_dynamic: String,
    pub plot_analysis: String,
    pub recommendation_blurb: String,
    pub audience_list: Vec<String>,
    pub comparison_note: String,
    pub contextual_links: Vec<ContextualLink>,
    pub setting_description: String,
    pub mood_tone: Vec<String>,
    pub thematic_keywords: Vec<String>,
    pub translation_method: String,
    pub translation_note: String,
    pub subtitle_quality: String,
    pub video_quality: String,
    pub audio_quality: String,
    pub technical_faqs: Vec<FAQItem>,
    pub general_faqs: Vec<FAQItem>,
    pub seo_keywords: Vec<String>,
    pub long_tail_keywords: Vec<String>,
    pub cinematography_analysis: String,
    pub visual_style: String,
    pub atmosphere_notes: Vec<String>,
    pub character_journey: String,
    pub emotional_arc: Vec<EmotionalArcPoint>,
    pub thematic_explanation: String,
    pub cultural_context: String,
    pub genre_insights: String,
    pub studio_comparison: String,
    pub actor_evolution: String,
    pub genre_ranking: String,
    pub viewing_tips: String,
    pub best_moments: Vec<String>,
    pub audience_match: String,
    pub replay_value: String,
}

/// Assembles an [`Article`] from a complete [`PipelineState`]. Every chunk
/// must be present; callers (the Job Coordinator) only invoke this once
/// `state.is_complete()` holds.
pub fn aggregate(job: &Job, state: &PipelineState) -> Article {
    let chunk1 = state.chunk1.as_ref().expect("stage 1 complete");
    let chunk2 = state.chunk2.as_ref().expect("stage 2 complete");
    let chunk3 = state.chunk3.as_ref().expect("stage 3 complete");
    let chunk4 = state.chunk4.as_ref().expect("stage 4 complete");
    let chunk5 = state.chunk5.as_ref().expect("stage 5 complete");
    let chunk6 = state.chunk6.as_ref().expect("stage 6 complete");
    let chunk7 = state.chunk7.as_ref().expect("stage 7 complete");

    let code = job.preferred_code();
    let slug = code.to_lowercase();

    let contextual_links = filter_and_enrich_links(chunk5.contextual_links.clone(), &job.related_article_candidates, &slug);
    let key_moments = chunk2
        .key_moments
        .iter()
        .cloned()
        .map(|mut m| {
            m.url = Some(format!("/videos/{code}?t={}", m.start_offset));
            m
        })
        .collect::<Vec<_>>();

    let gallery_images = (0..job.gallery_image_count)
        .map(|i| GalleryImage {
            index: i,
            alt: chunk2
                .gallery_alts
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("scene from {code}")),
        })
        .collect();

    let full_names: Vec<String> = job.casts.iter().map(|c| c.full_name.clone()).collect();

    let mut article = Article {
        slug,
        title: chunk1.title.clone(),
        meta_title: chunk1.meta_title.clone(),
        meta_description: chunk1.meta_description.clone(),
        summary: chunk1.summary.clone(),
        short_summary: chunk1.short_summary.clone(),
        thumbnail_alt: chunk1.thumbnail_alt.clone(),
        quality_score: chunk1.quality_score,
        main_theme: chunk1.main_theme.clone(),
        main_tone: chunk1.main_tone.clone(),
        duration_iso8601: iso8601_duration(job.duration_seconds),
        reading_time_minutes: reading_time_minutes(&chunk1.summary, &chunk4.detailed_review),
        highlights: chunk2.highlights.clone(),
        key_moments,
        scene_locations: chunk2.scene_locations.clone(),
        gallery_images,
        dialogue_analysis: chunk3.dialogue_analysis.clone(),
        character_insight: chunk3.character_insight.clone(),
        top_quotes: chunk3.top_quotes.clone(),
        language_notes: chunk3.language_notes.clone(),
        actor_performance_trend: chunk3.actor_performance_trend.clone(),
        detailed_review: chunk4.detailed_review.clone(),
        biographies: chunk4.biographies.clone(),
        tag_descriptions: chunk4.tag_descriptions.clone(),
        expert_analysis: chunk4.expert_analysis.clone(),
        character_dynamic: chunk5.character_dynamic.clone(),
        plot_analysis: chunk5.plot_analysis.clone(),
        recommendation_blurb: chunk5.recommendation_blurb.clone(),
        audience_list: chunk5.audience_list.clone(),
        comparison_note: chunk5.comparison_note.clone(),
        contextual_links,
        setting_description: chunk5.setting_description.clone(),
        mood_tone: chunk5.mood_tone.clone(),
        thematic_keywords: chunk5.thematic_keywords.clone(),
        translation_method: chunk6.translation_method.clone(),
        translation_note: chunk6.translation_note.clone(),
        subtitle_quality: chunk6.subtitle_quality.clone(),
        video_quality: chunk6.video_quality.clone(),
        audio_quality: chunk6.audio_quality.clone(),
        technical_faqs: chunk6.technical_faqs.clone(),
        general_faqs: chunk6.general_faqs.clone(),
        seo_keywords: chunk6.seo_keywords.clone(),
        long_tail_keywords: chunk6.long_tail_keywords.clone(),
        cinematography_analysis: chunk7.cinematography_analysis.clone(),
        visual_style: chunk7.visual_style.clone(),
        atmosphere_notes: chunk7.atmosphere_notes.clone(),
        character_journey: chunk7.character_journey.clone(),
        emotional_arc: chunk7.emotional_arc.clone(),
        thematic_explanation: chunk7.thematic_explanation.clone(),
        cultural_context: chunk7.cultural_context.clone(),
        genre_insights: chunk7.genre_insights.clone(),
        studio_comparison: chunk7.studio_comparison.clone(),
        actor_evolution: chunk7.actor_evolution.clone(),
        genre_ranking: chunk7.genre_ranking.clone(),
        viewing_tips: chunk7.viewing_tips.clone(),
        best_moments: chunk7.best_moments.clone(),
        audience_match: chunk7.audience_match.clone(),
        replay_value: chunk7.replay_value.clone(),
    };

    // Final pass over every text-bearing field (`spec.md` §4.5 last para).
    repair_article_names(&mut article, &full_names);
    article
}

/// `PT[<H>H][<M>M][<S>S]`, with the seconds component always present when no
/// other component is (so a zero-length job still yields `PT0S`, never `PT`).
fn iso8601_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let mut out = String::from("PT");
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if seconds > 0 || (hours == 0 && minutes == 0) {
        out.push_str(&format!("{seconds}S"));
    }
    out
}

fn reading_time_minutes(summary: &str, detailed_review: &str) -> u32 {
    let len = summary.chars().count() + detailed_review.chars().count();
    ((len as f64 / 200.0).ceil() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunks::{ChunkOutput1, ChunkOutput2, ChunkOutput3, ChunkOutput4, ChunkOutput5, ChunkOutput6, ChunkOutput7};
    use crate::job::{CastEntry, RelatedArticleCandidate, TagEntry, TranscriptLine};

    fn job() -> Job {
        Job {
            job_id: "job-1".into(),
            internal_code: "internal-1".into(),
            external_code: Some("ABC-123".into()),
            transcript: vec![TranscriptLine { start_seconds: 0.0, text: "hi".into() }],
            duration_seconds: 3725,
            casts: vec![CastEntry { id: "c1".into(), full_name: "Alex Doe".into(), localized_name: None, slug: "alex-doe".into() }],
            tags: vec![TagEntry { id: "t1".into(), display_name: "Drama".into() }],
            maker: None,
            previous_works: vec![],
            gallery_image_count: 2,
            related_article_candidates: vec![RelatedArticleCandidate {
                slug: "other-1".into(),
                title: "Other".into(),
                external_code: "OTHER-1".into(),
                cast_names: vec![],
                tag_names: vec![],
                thumbnail_url: Some("thumb.jpg".into()),
                quality_score: 0.9,
            }],
            generate_tts: false,
        }
    }

    fn complete_state(job: &Job) -> PipelineState {
        let mut state = PipelineState::new(job.preferred_code());
        state.chunk1 = Some(ChunkOutput1 {
            title: "Title".into(),
            meta_title: "Meta".into(),
            meta_description: "Desc".into(),
            summary: "word ".repeat(100),
            short_summary: "short".into(),
            thumbnail_alt: "alt".into(),
            quality_score: 9,
            main_theme: "drama".into(),
            main_tone: "hopeful".into(),
        });
        state.chunk2 = Some(ChunkOutput2 {
            highlights: vec!["h1".into()],
            key_moments: vec![KeyMoment { name: "Opening".into(), start_offset: 12.0, end_offset: 40.0, url: None }],
            scene_locations: vec!["Paris".into()],
            gallery_alts: vec!["first alt".into()],
        });
        state.chunk3 = Some(ChunkOutput3 {
            dialogue_analysis: "a".into(),
            character_insight: "b".into(),
            top_quotes: vec![],
            language_notes: "n".into(),
            actor_performance_trend: "t".into(),
        });
        state.chunk4 = Some(ChunkOutput4 {
            detailed_review: "word ".repeat(100),
            biographies: vec![],
            tag_descriptions: vec![],
            expert_analysis: "x".into(),
        });
        state.chunk5 = Some(ChunkOutput5 {
            character_dynamic: "a".into(),
            plot_analysis: "b".into(),
            recommendation_blurb: "c".into(),
            audience_list: vec![],
            comparison_note: "d".into(),
            contextual_links: vec![
                ContextualLink { text: "see".into(), linked_slug: "other-1".into(), linked_title: "Other".into(), thumbnail_url: None, quality_score: None },
                ContextualLink { text: "self".into(), linked_slug: "abc-123".into(), linked_title: "Self".into(), thumbnail_url: None, quality_score: None },
                ContextualLink { text: "unknown".into(), linked_slug: "not-a-candidate".into(), linked_title: "Unknown".into(), thumbnail_url: None, quality_score: None },
            ],
            setting_description: "e".into(),
            mood_tone: vec![],
            thematic_keywords: vec![],
        });
        state.chunk6 = Some(ChunkOutput6 {
            translation_method: "m".into(),
            translation_note: "n".into(),
            subtitle_quality: "q".into(),
            video_quality: "q".into(),
            audio_quality: "q".into(),
            technical_faqs: vec![],
            general_faqs: vec![],
            seo_keywords: vec![],
            long_tail_keywords: vec![],
        });
        state.chunk7 = Some(ChunkOutput7 {
            cinematography_analysis: "a".into(),
            visual_style: "s".into(),
            atmosphere_notes: vec![],
            character_journey: "b".into(),
            emotional_arc: vec![],
            thematic_explanation: "c".into(),
            cultural_context: "d".into(),
            genre_insights: "e".into(),
            studio_comparison: "f".into(),
            actor_evolution: "g".into(),
            genre_ranking: "h".into(),
            viewing_tips: "i".into(),
            best_moments: vec![],
            audience_match: "j".into(),
            replay_value: "k".into(),
        });
        state.recompute_last_stage();
        state
    }

    #[test]
    fn slug_is_lowercased_external_code() {
        let job = job();
        let article = aggregate(&job, &complete_state(&job));
        assert_eq!(article.slug, "abc-123");
    }

    #[test]
    fn slug_falls_back_to_internal_code() {
        let mut job = job();
        job.external_code = None;
        let article = aggregate(&job, &complete_state(&job));
        assert_eq!(article.slug, "internal-1");
    }

    #[test]
    fn duration_includes_hours_minutes_and_seconds() {
        assert_eq!(iso8601_duration(3725), "PT1H2M5S");
        assert_eq!(iso8601_duration(0), "PT0S");
        assert_eq!(iso8601_duration(90), "PT1M30S");
        assert_eq!(iso8601_duration(3600), "PT1H");
    }

    #[test]
    fn reading_time_is_at_least_one_minute() {
        assert_eq!(reading_time_minutes("short", "short"), 1);
        assert_eq!(reading_time_minutes(&"x".repeat(400), ""), 2);
    }

    #[test]
    fn gallery_alts_fall_back_when_missing() {
        let job = job();
        let article = aggregate(&job, &complete_state(&job));
        assert_eq!(article.gallery_images.len(), 2);
        assert_eq!(article.gallery_images[0].alt, "first alt");
        assert_eq!(article.gallery_images[1].alt, "scene from ABC-123");
    }

    #[test]
    fn contextual_links_drop_self_reference_and_unknown_slugs() {
        let job = job();
        let article = aggregate(&job, &complete_state(&job));
        assert_eq!(article.contextual_links.len(), 1);
        assert_eq!(article.contextual_links[0].linked_slug, "other-1");
        assert_eq!(article.contextual_links[0].thumbnail_url.as_deref(), Some("thumb.jpg"));
    }

    #[test]
    fn key_moments_get_video_urls() {
        let job = job();
        let article = aggregate(&job, &complete_state(&job));
        assert_eq!(article.key_moments[0].url.as_deref(), Some("/videos/ABC-123?t=12"));
    }
}
