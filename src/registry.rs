//! Chunk Registry (`spec.md` §4.2, §9 design note): a static, table-driven
//! record per stage — schema, prompt builder, parser, validator, and ordered
//! post-processors — so the Phase Scheduler and Stage Runner are a plain
//! traversal over data rather than a dispatch hierarchy (`weavegraph`'s own
//! `GraphBuilder`/`Node` registration generalized the same way).

use serde_json::{json, Value};

use crate::chunks::*;
use crate::config::PipelineConfig;
use crate::context::first_name;
use crate::error::ParseError;
use crate::job::{CastEntry, Job};
use crate::postprocess::faq::enforce_faq_integrity;
use crate::postprocess::namespam::collapse_name_spam;
use crate::postprocess::paragraphs::expand_paragraph_markers;
use crate::postprocess::pronoun::{substitute_pronouns, CastNames};
use crate::postprocess::quotes::gate_top_quotes;
use crate::postprocess::timestamps::apply_timestamp_safety;
use crate::postprocess::vocabulary::{filter_blacklisted_keywords, substitute_vocabulary};
use crate::postprocess::remove_leading_name;
use crate::safety::SafetyTables;
use crate::state::{CoreContext, ExtendedContext};
use crate::validators::{
    validate_stage1, validate_stage2, validate_stage3, validate_stage4, validate_stage5,
    validate_stage6, validate_stage7, ValidationResult,
};

/// Bundles everything a post-processor needs besides the chunk output
/// itself: the job (for casts/video duration/locale inputs), the resolved
/// config (retry-adjacent tunables that also gate post-processing, such as
/// the timestamp cutoff), and the safety tables.
pub struct PostProcessInputs<'a> {
    pub job: &'a Job,
    pub config: &'a PipelineConfig,
    pub tables: &'a SafetyTables,
}

/// One entry in the Chunk Registry.
pub struct ChunkSpec {
    pub stage: u8,
    pub deps: &'static [u8],
    pub schema: fn() -> Value,
    pub build_prompt: fn(&Job, Option<&CoreContext>, Option<&ExtendedContext>) -> String,
    pub parse: fn(Value) -> Result<ChunkOutput, ParseError>,
    pub validate: fn(&ChunkOutput, &Job, &SafetyTables, &str) -> ValidationResult,
    pub postprocess: fn(ChunkOutput, &PostProcessInputs<'_>) -> ChunkOutput,
}

pub static CHUNK_REGISTRY: [ChunkSpec; 7] = [
    ChunkSpec {
        stage: 1,
        deps: &[],
        schema: schema_stage1,
        build_prompt: build_prompt_stage1,
        parse: parse_stage1,
        validate: validate_dispatch_stage1,
        postprocess: postprocess_stage1,
    },
    ChunkSpec {
        stage: 2,
        deps: &[1],
        schema: schema_stage2,
        build_prompt: build_prompt_stage2,
        parse: parse_stage2,
        validate: validate_dispatch_stage2,
        postprocess: postprocess_stage2,
    },
    ChunkSpec {
        stage: 3,
        deps: &[1],
        schema: schema_stage3,
        build_prompt: build_prompt_stage3,
        parse: parse_stage3,
        validate: validate_dispatch_stage3,
        postprocess: postprocess_stage3,
    },
    ChunkSpec {
        stage: 4,
        deps: &[1],
        schema: schema_stage4,
        build_prompt: build_prompt_stage4,
        parse: parse_stage4,
        validate: validate_dispatch_stage4,
        postprocess: postprocess_stage4,
    },
    ChunkSpec {
        stage: 5,
        deps: &[1],
        schema: schema_stage5,
        build_prompt: build_prompt_stage5,
        parse: parse_stage5,
        validate: validate_dispatch_stage5,
        postprocess: postprocess_stage5,
    },
    ChunkSpec {
        stage: 6,
        deps: &[1, 2, 4],
        schema: schema_stage6,
        build_prompt: build_prompt_stage6,
        parse: parse_stage6,
        validate: validate_dispatch_stage6,
        postprocess: postprocess_stage6,
    },
    ChunkSpec {
        stage: 7,
        deps: &[1, 2, 4],
        schema: schema_stage7,
        build_prompt: build_prompt_stage7,
        parse: parse_stage7,
        validate: validate_dispatch_stage7,
        postprocess: postprocess_stage7,
    },
];

pub fn spec_for(stage: u8) -> &'static ChunkSpec {
    CHUNK_REGISTRY
        .iter()
        .find(|s| s.stage == stage)
        .unwrap_or_else(|| panic!("no chunk spec registered for stage {stage}"))
}

// ---------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------

fn cast_full_names(casts: &[CastEntry]) -> Vec<String> {
    casts.iter().map(|c| c.full_name.clone()).collect()
}

fn cast_names_for_pronoun(casts: &[CastEntry]) -> Vec<(String, String)> {
    casts.iter().map(|c| (c.full_name.clone(), first_name(&c.full_name))).collect()
}

fn apply_pronoun(text: &str, pairs: &[(String, String)], pronoun: &str) -> String {
    let refs: Vec<CastNames<'_>> = pairs
        .iter()
        .map(|(full, first)| CastNames { full_name: full.as_str(), first_name: first.as_str() })
        .collect();
    substitute_pronouns(text, &refs, pronoun)
}

/// The standard three-step cleanup applied to every long-form field: expand
/// paragraph markers, collapse name-spam repetition, then rotate cast names
/// into pronouns/first names where they overrun the name-spam budget.
fn clean_long_field(text: &str, pairs: &[(String, String)], pronoun: &str) -> String {
    let expanded = expand_paragraph_markers(text);
    let collapsed = collapse_name_spam(&expanded);
    apply_pronoun(&collapsed, pairs, pronoun)
}

fn known_external_codes(job: &Job) -> Vec<String> {
    let mut codes = job.previous_works.clone();
    codes.extend(job.related_article_candidates.iter().map(|c| c.external_code.clone()));
    codes
}

// ---------------------------------------------------------------------
// Stage 1 — Core Identity
// ---------------------------------------------------------------------

fn schema_stage1() -> Value {
    json!({
        "stage": 1,
        "type": "object",
        "required": ["title", "meta_title", "meta_description", "summary", "short_summary",
                     "thumbnail_alt", "quality_score", "main_theme", "main_tone"],
    })
}

fn build_prompt_stage1(job: &Job, _core: Option<&CoreContext>, _ext: Option<&ExtendedContext>) -> String {
    format!(
        "You are writing the core identity section of an SEO article for video {code}.\n\
         Cast: {casts}.\n\
         Tags: {tags}.\n\
         Transcript excerpt:\n{transcript}\n\n\
         Write a title (>=20 chars), meta title, meta description, a long summary \
         (>=800 chars, at least 4 paragraphs separated by [PARA]), a short summary \
         suitable for text-to-speech narration, thumbnail alt text, a quality score \
         from 1 to 10, and the main theme and tone.",
        code = job.preferred_code(),
        casts = job.casts.iter().map(|c| c.full_name.as_str()).collect::<Vec<_>>().join(", "),
        tags = job.tags.iter().map(|t| t.display_name.as_str()).collect::<Vec<_>>().join(", "),
        transcript = job.transcript_text(),
    )
}

fn parse_stage1(v: Value) -> Result<ChunkOutput, ParseError> {
    serde_json::from_value::<ChunkOutput1>(v)
        .map(ChunkOutput::Stage1)
        .map_err(|e| ParseError { stage: 1, reason: e.to_string() })
}

fn validate_dispatch_stage1(out: &ChunkOutput, job: &Job, _tables: &SafetyTables, _locale: &str) -> ValidationResult {
    match out {
        ChunkOutput::Stage1(c) => validate_stage1(c, &job.casts),
        _ => unreachable!("stage 1 validator invoked on non-stage-1 output"),
    }
}

fn postprocess_stage1(out: ChunkOutput, inputs: &PostProcessInputs<'_>) -> ChunkOutput {
    let ChunkOutput::Stage1(mut c) = out else {
        unreachable!("stage 1 post-processor invoked on non-stage-1 output")
    };
    let pairs = cast_names_for_pronoun(&inputs.job.casts);
    let pronoun = inputs.tables.pronoun_for(&inputs.config.target_locale);
    c.summary = clean_long_field(&c.summary, &pairs, pronoun);
    ChunkOutput::Stage1(c)
}

// ---------------------------------------------------------------------
// Stage 2 — Scene & Moments
// ---------------------------------------------------------------------

fn schema_stage2() -> Value {
    json!({
        "stage": 2,
        "type": "object",
        "required": ["highlights", "key_moments", "scene_locations", "gallery_alts"],
    })
}

fn build_prompt_stage2(job: &Job, core: Option<&CoreContext>, _ext: Option<&ExtendedContext>) -> String {
    let theme = core.map(|c| c.main_theme.as_str()).unwrap_or("unspecified");
    format!(
        "Article title: {title}. Main theme: {theme}.\n\
         Video duration: {duration}s. Gallery images available: {gallery}.\n\
         Transcript excerpt:\n{transcript}\n\n\
         Write 5-8 highlights (15-30 words each, do not start with a cast member's \
         name), 3-5 key moments with start/end offsets in seconds, 3-5 scene \
         locations, and one gallery alt-text entry per available gallery image.",
        title = core.map(|c| c.title.as_str()).unwrap_or(&job.internal_code),
        theme = theme,
        duration = job.duration_seconds,
        gallery = job.gallery_image_count,
        transcript = job.transcript_text(),
    )
}

fn parse_stage2(v: Value) -> Result<ChunkOutput, ParseError> {
    serde_json::from_value::<ChunkOutput2>(v)
        .map(ChunkOutput::Stage2)
        .map_err(|e| ParseError { stage: 2, reason: e.to_string() })
}

fn validate_dispatch_stage2(out: &ChunkOutput, job: &Job, _tables: &SafetyTables, _locale: &str) -> ValidationResult {
    match out {
        ChunkOutput::Stage2(c) => validate_stage2(c, &job.casts),
        _ => unreachable!("stage 2 validator invoked on non-stage-2 output"),
    }
}

fn postprocess_stage2(out: ChunkOutput, inputs: &PostProcessInputs<'_>) -> ChunkOutput {
    let ChunkOutput::Stage2(mut c) = out else {
        unreachable!("stage 2 post-processor invoked on non-stage-2 output")
    };
    c.key_moments = apply_timestamp_safety(
        c.key_moments,
        inputs.job.duration_seconds as f64,
        inputs.config.timestamp_safety_cutoff_secs as f64,
        inputs.config.min_key_moments,
        inputs.config.max_key_moments,
        inputs.tables,
    );
    let names = cast_full_names(&inputs.job.casts);
    c.highlights = c.highlights.into_iter().map(|h| remove_leading_name(&h, &names)).collect();
    ChunkOutput::Stage2(c)
}

// ---------------------------------------------------------------------
// Stage 3 — Expertise
// ---------------------------------------------------------------------

fn schema_stage3() -> Value {
    json!({
        "stage": 3,
        "type": "object",
        "required": ["dialogue_analysis", "character_insight", "top_quotes", "language_notes",
                     "actor_performance_trend"],
    })
}

fn build_prompt_stage3(job: &Job, core: Option<&CoreContext>, _ext: Option<&ExtendedContext>) -> String {
    format!(
        "Article title: {title}.\nTranscript excerpt:\n{transcript}\n\n\
         Write a dialogue analysis, a character insight paragraph, 4-5 top quotes \
         with timestamp/emotion/context, language notes, and an actor performance \
         trend summary.",
        title = core.map(|c| c.title.as_str()).unwrap_or(&job.internal_code),
        transcript = job.transcript_text(),
    )
}

fn parse_stage3(v: Value) -> Result<ChunkOutput, ParseError> {
    serde_json::from_value::<ChunkOutput3>(v)
        .map(ChunkOutput::Stage3)
        .map_err(|e| ParseError { stage: 3, reason: e.to_string() })
}

fn validate_dispatch_stage3(out: &ChunkOutput, _job: &Job, _tables: &SafetyTables, _locale: &str) -> ValidationResult {
    match out {
        ChunkOutput::Stage3(c) => validate_stage3(c),
        _ => unreachable!("stage 3 validator invoked on non-stage-3 output"),
    }
}

fn postprocess_stage3(out: ChunkOutput, inputs: &PostProcessInputs<'_>) -> ChunkOutput {
    let ChunkOutput::Stage3(mut c) = out else {
        unreachable!("stage 3 post-processor invoked on non-stage-3 output")
    };
    c.top_quotes = gate_top_quotes(c.top_quotes, inputs.config.timestamp_safety_cutoff_secs as f64);
    ChunkOutput::Stage3(c)
}

// ---------------------------------------------------------------------
// Stage 4 — Authority
// ---------------------------------------------------------------------

fn schema_stage4() -> Value {
    json!({
        "stage": 4,
        "type": "object",
        "required": ["detailed_review", "biographies", "tag_descriptions", "expert_analysis"],
    })
}

fn build_prompt_stage4(job: &Job, core: Option<&CoreContext>, _ext: Option<&ExtendedContext>) -> String {
    format!(
        "Article title: {title}.\nCast: {casts}.\nTags: {tags}.\n\
         Write a detailed review (500-700 words, [PARA]-separated, at least 5 \
         paragraphs), one short biography per cast member, a description per tag, \
         and a 150-200 word expert analysis.",
        title = core.map(|c| c.title.as_str()).unwrap_or(&job.internal_code),
        casts = job.casts.iter().map(|c| c.full_name.as_str()).collect::<Vec<_>>().join(", "),
        tags = job.tags.iter().map(|t| t.display_name.as_str()).collect::<Vec<_>>().join(", "),
    )
}

fn parse_stage4(v: Value) -> Result<ChunkOutput, ParseError> {
    serde_json::from_value::<ChunkOutput4>(v)
        .map(ChunkOutput::Stage4)
        .map_err(|e| ParseError { stage: 4, reason: e.to_string() })
}

fn validate_dispatch_stage4(out: &ChunkOutput, job: &Job, _tables: &SafetyTables, _locale: &str) -> ValidationResult {
    match out {
        ChunkOutput::Stage4(c) => validate_stage4(c, &job.casts),
        _ => unreachable!("stage 4 validator invoked on non-stage-4 output"),
    }
}

fn postprocess_stage4(out: ChunkOutput, inputs: &PostProcessInputs<'_>) -> ChunkOutput {
    let ChunkOutput::Stage4(mut c) = out else {
        unreachable!("stage 4 post-processor invoked on non-stage-4 output")
    };
    let pairs = cast_names_for_pronoun(&inputs.job.casts);
    let pronoun = inputs.tables.pronoun_for(&inputs.config.target_locale);
    c.detailed_review = substitute_vocabulary(&c.detailed_review, inputs.tables);
    c.detailed_review = clean_long_field(&c.detailed_review, &pairs, pronoun);
    c.expert_analysis = substitute_vocabulary(&c.expert_analysis, inputs.tables);
    c.expert_analysis = expand_paragraph_markers(&c.expert_analysis);
    for bio in &mut c.biographies {
        bio.text = substitute_vocabulary(&bio.text, inputs.tables);
    }
    for tag in &mut c.tag_descriptions {
        tag.description = substitute_vocabulary(&tag.description, inputs.tables);
    }
    ChunkOutput::Stage4(c)
}

// ---------------------------------------------------------------------
// Stage 5 — Recommendations
// ---------------------------------------------------------------------

fn schema_stage5() -> Value {
    json!({
        "stage": 5,
        "type": "object",
        "required": ["character_dynamic", "plot_analysis", "recommendation_blurb", "audience_list",
                     "comparison_note", "contextual_links", "setting_description", "mood_tone",
                     "thematic_keywords"],
    })
}

fn build_prompt_stage5(job: &Job, core: Option<&CoreContext>, _ext: Option<&ExtendedContext>) -> String {
    let candidates = job
        .related_article_candidates
        .iter()
        .map(|c| format!("{} ({})", c.title, c.slug))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Article title: {title}.\nPrevious works: {previous}.\nRelated article candidates: {candidates}.\n\
         Write a character dynamic paragraph, a plot analysis, a recommendation \
         blurb, an audience list, a comparison note that references at least one \
         external video code from the previous works, 2-4 contextual links to the \
         candidates above (by slug), a setting description, a mood/tone list, and \
         thematic keywords.",
        title = core.map(|c| c.title.as_str()).unwrap_or(&job.internal_code),
        previous = job.previous_works.join(", "),
        candidates = candidates,
    )
}

fn parse_stage5(v: Value) -> Result<ChunkOutput, ParseError> {
    serde_json::from_value::<ChunkOutput5>(v)
        .map(ChunkOutput::Stage5)
        .map_err(|e| ParseError { stage: 5, reason: e.to_string() })
}

fn validate_dispatch_stage5(out: &ChunkOutput, job: &Job, _tables: &SafetyTables, _locale: &str) -> ValidationResult {
    match out {
        ChunkOutput::Stage5(c) => validate_stage5(c, &known_external_codes(job)),
        _ => unreachable!("stage 5 validator invoked on non-stage-5 output"),
    }
}

fn postprocess_stage5(out: ChunkOutput, _inputs: &PostProcessInputs<'_>) -> ChunkOutput {
    // No stage-level post-processor is declared for stage 5 in `spec.md`
    // §4.5; link allow-listing and self-reference rejection happen at
    // aggregation time (`crate::sanitize`), once the article's slug exists.
    out
}

// ---------------------------------------------------------------------
// Stage 6 — Technical & FAQ
// ---------------------------------------------------------------------

fn schema_stage6() -> Value {
    json!({
        "stage": 6,
        "type": "object",
        "required": ["translation_method", "translation_note", "subtitle_quality", "video_quality",
                     "audio_quality", "technical_faqs", "general_faqs", "seo_keywords",
                     "long_tail_keywords"],
    })
}

fn build_prompt_stage6(job: &Job, _core: Option<&CoreContext>, ext: Option<&ExtendedContext>) -> String {
    format!(
        "Article title: {title}.\nTop highlights: {highlights}.\n\
         Write a translation method/note, subtitle/video/audio quality \
         descriptions, 2-3 technical FAQs, 5-8 general FAQs, SEO keywords, and \
         long-tail keywords.",
        title = ext.map(|e| e.title.as_str()).unwrap_or(&job.internal_code),
        highlights = ext.map(|e| e.top_highlights.join("; ")).unwrap_or_default(),
    )
}

fn parse_stage6(v: Value) -> Result<ChunkOutput, ParseError> {
    serde_json::from_value::<ChunkOutput6>(v)
        .map(ChunkOutput::Stage6)
        .map_err(|e| ParseError { stage: 6, reason: e.to_string() })
}

fn validate_dispatch_stage6(out: &ChunkOutput, job: &Job, tables: &SafetyTables, locale: &str) -> ValidationResult {
    match out {
        ChunkOutput::Stage6(c) => validate_stage6(c, &job.casts, tables, locale),
        _ => unreachable!("stage 6 validator invoked on non-stage-6 output"),
    }
}

fn postprocess_stage6(out: ChunkOutput, inputs: &PostProcessInputs<'_>) -> ChunkOutput {
    let ChunkOutput::Stage6(mut c) = out else {
        unreachable!("stage 6 post-processor invoked on non-stage-6 output")
    };
    for faq in c.technical_faqs.iter_mut().chain(c.general_faqs.iter_mut()) {
        faq.answer = substitute_vocabulary(&faq.answer, inputs.tables);
    }
    c.translation_note = substitute_vocabulary(&c.translation_note, inputs.tables);
    c.subtitle_quality = substitute_vocabulary(&c.subtitle_quality, inputs.tables);
    c.video_quality = substitute_vocabulary(&c.video_quality, inputs.tables);
    c.audio_quality = substitute_vocabulary(&c.audio_quality, inputs.tables);

    c.seo_keywords = filter_blacklisted_keywords(c.seo_keywords, inputs.tables);
    c.long_tail_keywords = filter_blacklisted_keywords(c.long_tail_keywords, inputs.tables);

    let names = cast_full_names(&inputs.job.casts);
    let markers = inputs.tables.interrogative_markers_for(&inputs.config.target_locale).to_vec();
    c.technical_faqs = enforce_faq_integrity(c.technical_faqs, &names, &markers);
    c.general_faqs = enforce_faq_integrity(c.general_faqs, &names, &markers);
    ChunkOutput::Stage6(c)
}

// ---------------------------------------------------------------------
// Stage 7 — Deep Analysis
// ---------------------------------------------------------------------

fn schema_stage7() -> Value {
    json!({
        "stage": 7,
        "type": "object",
        "required": ["cinematography_analysis", "visual_style", "atmosphere_notes",
                     "character_journey", "emotional_arc", "thematic_explanation",
                     "cultural_context", "genre_insights", "studio_comparison",
                     "actor_evolution", "genre_ranking", "viewing_tips", "best_moments",
                     "audience_match", "replay_value"],
    })
}

fn build_prompt_stage7(job: &Job, _core: Option<&CoreContext>, ext: Option<&ExtendedContext>) -> String {
    format!(
        "Article title: {title}.\nExpert summary: {summary}.\nExpert analysis: {analysis}.\n\
         Write a cinematography analysis (250-350 words, 3-4 [PARA]-separated \
         paragraphs), visual style notes, atmosphere notes, a character journey \
         (300-400 words, 3-5 paragraphs), an emotional arc, a thematic \
         explanation, cultural context, genre insights, a studio comparison, \
         actor evolution notes, a genre ranking, viewing tips, best moments, an \
         audience-match note, and a replay-value note.",
        title = ext.map(|e| e.title.as_str()).unwrap_or(&job.internal_code),
        summary = ext.map(|e| e.expert_summary.as_str()).unwrap_or(""),
        analysis = ext.map(|e| e.expert_analysis.as_str()).unwrap_or(""),
    )
}

fn parse_stage7(v: Value) -> Result<ChunkOutput, ParseError> {
    serde_json::from_value::<ChunkOutput7>(v)
        .map(ChunkOutput::Stage7)
        .map_err(|e| ParseError { stage: 7, reason: e.to_string() })
}

fn validate_dispatch_stage7(out: &ChunkOutput, job: &Job, _tables: &SafetyTables, _locale: &str) -> ValidationResult {
    match out {
        ChunkOutput::Stage7(c) => validate_stage7(c, &job.casts),
        _ => unreachable!("stage 7 validator invoked on non-stage-7 output"),
    }
}

fn postprocess_stage7(out: ChunkOutput, inputs: &PostProcessInputs<'_>) -> ChunkOutput {
    let ChunkOutput::Stage7(mut c) = out else {
        unreachable!("stage 7 post-processor invoked on non-stage-7 output")
    };
    let pairs = cast_names_for_pronoun(&inputs.job.casts);
    let pronoun = inputs.tables.pronoun_for(&inputs.config.target_locale);

    c.cinematography_analysis = substitute_vocabulary(&c.cinematography_analysis, inputs.tables);
    c.cinematography_analysis = clean_long_field(&c.cinematography_analysis, &pairs, pronoun);

    c.character_journey = substitute_vocabulary(&c.character_journey, inputs.tables);
    c.character_journey = clean_long_field(&c.character_journey, &pairs, pronoun);

    c.thematic_explanation = substitute_vocabulary(&c.thematic_explanation, inputs.tables);
    c.thematic_explanation = clean_long_field(&c.thematic_explanation, &pairs, pronoun);

    c.cultural_context = substitute_vocabulary(&c.cultural_context, inputs.tables);
    c.genre_insights = substitute_vocabulary(&c.genre_insights, inputs.tables);
    c.studio_comparison = substitute_vocabulary(&c.studio_comparison, inputs.tables);
    c.actor_evolution = substitute_vocabulary(&c.actor_evolution, inputs.tables);
    c.viewing_tips = substitute_vocabulary(&c.viewing_tips, inputs.tables);
    c.audience_match = substitute_vocabulary(&c.audience_match, inputs.tables);
    c.replay_value = substitute_vocabulary(&c.replay_value, inputs.tables);

    let names = cast_full_names(&inputs.job.casts);
    c.best_moments = c.best_moments.into_iter().map(|m| remove_leading_name(&m, &names)).collect();
    ChunkOutput::Stage7(c)
}
