//! Per-stage output shapes (`spec.md` §3, §4.2).
//!
//! Each `ChunkOutputN` is both the schema the LLM Adaptor is asked to fill
//! and the persisted representation stored in [`crate::state::PipelineState`].
//! All shared semantic value types (`KeyMoment`, `TopQuote`, ...) live here
//! too since several stages and the aggregator reference them.

use serde::{Deserialize, Serialize};

/// A named segment of the video with start/end offsets in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyMoment {
    pub name: String,
    pub start_offset: f64,
    pub end_offset: f64,
    /// Populated by the aggregator (`spec.md` §4.9 "KeyMoment URL injection");
    /// absent on the stage runner's raw post-processed output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl KeyMoment {
    pub fn duration(&self) -> f64 {
        self.end_offset - self.start_offset
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TopQuote {
    pub text: String,
    pub timestamp: f64,
    pub emotion: String,
    pub context: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TagDescription {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FAQItem {
    pub question: String,
    pub answer: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextualLink {
    pub text: String,
    pub linked_slug: String,
    pub linked_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmotionalArcPoint {
    pub phase: String,
    pub emotion: String,
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CastBiography {
    pub cast_id: String,
    pub text: String,
}

/// Stage 1 — Core Identity.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutput1 {
    pub title: String,
    pub meta_title: String,
    pub meta_description: String,
    pub summary: String,
    pub short_summary: String,
    pub thumbnail_alt: String,
    pub quality_score: u8,
    pub main_theme: String,
    pub main_tone: String,
}

/// Stage 2 — Scene & Moments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutput2 {
    pub highlights: Vec<String>,
    pub key_moments: Vec<KeyMoment>,
    pub scene_locations: Vec<String>,
    pub gallery_alts: Vec<String>,
}

/// Stage 3 — Expertise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutput3 {
    pub dialogue_analysis: String,
    pub character_insight: String,
    pub top_quotes: Vec<TopQuote>,
    pub language_notes: String,
    pub actor_performance_trend: String,
}

/// Stage 4 — Authority.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutput4 {
    pub detailed_review: String,
    pub biographies: Vec<CastBiography>,
    pub tag_descriptions: Vec<TagDescription>,
    pub expert_analysis: String,
}

/// Stage 5 — Recommendations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutput5 {
    pub character_dynamic: String,
    pub plot_analysis: String,
    pub recommendation_blurb: String,
    pub audience_list: Vec<String>,
    pub comparison_note: String,
    pub contextual_links: Vec<ContextualLink>,
    pub setting_description: String,
    pub mood_tone: Vec<String>,
    pub thematic_keywords: Vec<String>,
}

/// Stage 6 — Technical & FAQ.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutput6 {
    pub translation_method: String,
    pub translation_note: String,
    pub subtitle_quality: String,
    pub video_quality: String,
    pub audio_quality: String,
    pub technical_faqs: Vec<FAQItem>,
    pub general_faqs: Vec<FAQItem>,
    pub seo_keywords: Vec<String>,
    pub long_tail_keywords: Vec<String>,
}

/// Stage 7 — Deep Analysis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChunkOutput7 {
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

/// Type-erased stage output, used where the registry/scheduler need to move
/// any stage's result through the same code path (persistence, barrier
/// merge into [`crate::state::PipelineState`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage")]
pub enum ChunkOutput {
    #[serde(rename = "1")]
    Stage1(ChunkOutput1),
    #[serde(rename = "2")]
    Stage2(ChunkOutput2),
    #[serde(rename = "3")]
    Stage3(ChunkOutput3),
    #[serde(rename = "4")]
    Stage4(ChunkOutput4),
    #[serde(rename = "5")]
    Stage5(ChunkOutput5),
    #[serde(rename = "6")]
    Stage6(ChunkOutput6),
    #[serde(rename = "7")]
    Stage7(ChunkOutput7),
}

impl ChunkOutput {
    pub fn stage_index(&self) -> u8 {
        match self {
            ChunkOutput::Stage1(_) => 1,
            ChunkOutput::Stage2(_) => 2,
            ChunkOutput::Stage3(_) => 3,
            ChunkOutput::Stage4(_) => 4,
            ChunkOutput::Stage5(_) => 5,
            ChunkOutput::Stage6(_) => 6,
            ChunkOutput::Stage7(_) => 7,
        }
    }
}
