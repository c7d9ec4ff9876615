//! Full pipeline runs and resume scenarios through [`Coordinator`]
//! (`spec.md` §4.10, §8's end-to-end scenarios), matching the teacher's
//! `tests/runtimes_runner.rs` split of whole-session integration tests out
//! of their owning module's unit-test block.

use std::sync::Arc;

use article_pipeline::config::PipelineConfig;
use article_pipeline::coordinator::Coordinator;
use article_pipeline::error::{PipelineError, ProviderError};
use article_pipeline::job::{CastEntry, Job, TagEntry, TranscriptLine};
use article_pipeline::llm::{FixtureLlmAdaptor, FixtureResponse};
use article_pipeline::progress::ProgressBroadcaster;
use article_pipeline::safety::SafetyTables;
use article_pipeline::state::PipelineState;
use article_pipeline::store::{InMemoryStateStore, StateStore};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn sample_job() -> Job {
    Job {
        job_id: "job-1".into(),
        internal_code: "internal-1".into(),
        external_code: Some("EXT-1".into()),
        transcript: vec![TranscriptLine { start_seconds: 0.0, text: "hi".into() }],
        duration_seconds: 120,
        casts: vec![CastEntry {
            id: "c1".into(),
            full_name: "Alex Doe".into(),
            localized_name: None,
            slug: "alex-doe".into(),
        }],
        tags: vec![TagEntry { id: "t1".into(), display_name: "Drama".into() }],
        maker: None,
        previous_works: vec![],
        gallery_image_count: 0,
        related_article_candidates: vec![],
        generate_tts: false,
    }
}

fn long_paragraphs(n: usize, words: usize) -> String {
    (0..n).map(|i| format!("p{i} ") + &"word ".repeat(words)).collect::<Vec<_>>().join("\n\n")
}

fn script_all_stages(adaptor: &FixtureLlmAdaptor) {
    adaptor.always_ok(
        1,
        json!({
            "title": "A sufficiently long article title here",
            "meta_title": "m", "meta_description": "d",
            "summary": long_paragraphs(4, 50),
            "short_summary": "s", "thumbnail_alt": "a", "quality_score": 8,
            "main_theme": "drama", "main_tone": "hopeful",
        }),
    );
    adaptor.always_ok(
        2,
        json!({
            "highlights": ["a perfectly fine highlight here", "another decent highlight line", "a third fine highlight entry"],
            "key_moments": [{"name": "Opening", "start_offset": 10.0, "end_offset": 40.0}],
            "scene_locations": ["Paris"],
            "gallery_alts": [],
        }),
    );
    adaptor.always_ok(
        3,
        json!({
            "dialogue_analysis": "a", "character_insight": "b",
            "top_quotes": [
                {"text": "q1", "timestamp": 1.0, "emotion": "joy", "context": "c"},
                {"text": "q2", "timestamp": 2.0, "emotion": "joy", "context": "c"},
                {"text": "q3", "timestamp": 3.0, "emotion": "joy", "context": "c"},
                {"text": "q4", "timestamp": 4.0, "emotion": "joy", "context": "c"},
            ],
            "language_notes": "notes", "actor_performance_trend": "t",
        }),
    );
    adaptor.always_ok(
        4,
        json!({
            "detailed_review": long_paragraphs(5, 120),
            "biographies": [],
            "tag_descriptions": [],
            "expert_analysis": "word ".repeat(30),
        }),
    );
    adaptor.always_ok(
        5,
        json!({
            "character_dynamic": "a", "plot_analysis": "b", "recommendation_blurb": "c",
            "audience_list": [], "comparison_note": "A plain note",
            "contextual_links": [], "setting_description": "d",
            "mood_tone": [], "thematic_keywords": [],
        }),
    );
    adaptor.always_ok(
        6,
        json!({
            "translation_method": "m", "translation_note": "n",
            "subtitle_quality": "q", "video_quality": "q", "audio_quality": "q",
            "technical_faqs": [],
            "general_faqs": (0..5).map(|i| json!({"question": format!("What happens in scene {i}?"), "answer": "a"})).collect::<Vec<_>>(),
            "seo_keywords": [], "long_tail_keywords": [],
        }),
    );
    adaptor.always_ok(
        7,
        json!({
            "cinematography_analysis": long_paragraphs(3, 80),
            "visual_style": "s", "atmosphere_notes": ["a", "b", "c"],
            "character_journey": long_paragraphs(3, 100),
            "emotional_arc": [{"phase": "p", "emotion": "e", "description": "d"}, {"phase": "p2", "emotion": "e2", "description": "d2"}, {"phase": "p3", "emotion": "e3", "description": "d3"}],
            "thematic_explanation": long_paragraphs(2, 100),
            "cultural_context": "c", "genre_insights": "g", "studio_comparison": "s",
            "actor_evolution": "a", "genre_ranking": "r",
            "viewing_tips": "word ".repeat(60),
            "best_moments": ["m1", "m2", "m3"],
            "audience_match": "m", "replay_value": "v",
        }),
    );
}

#[tokio::test]
async fn process_job_returns_an_assembled_article() {
    let fixture = FixtureLlmAdaptor::new();
    script_all_stages(&fixture);
    let coordinator = Coordinator::new(
        Arc::new(fixture),
        Arc::new(PipelineConfig::default()),
        Arc::new(SafetyTables::default()),
        Arc::new(InMemoryStateStore::new()),
    );
    let broadcaster = ProgressBroadcaster::new();

    let article = coordinator.process_job(sample_job(), &broadcaster, CancellationToken::new()).await.unwrap();
    assert_eq!(article.slug, "ext-1");
}

#[tokio::test]
async fn resume_with_no_saved_state_behaves_like_process_job() {
    let fixture = FixtureLlmAdaptor::new();
    script_all_stages(&fixture);
    let coordinator = Coordinator::new(
        Arc::new(fixture),
        Arc::new(PipelineConfig::default()),
        Arc::new(SafetyTables::default()),
        Arc::new(InMemoryStateStore::new()),
    );
    let broadcaster = ProgressBroadcaster::new();

    let article = coordinator.resume(sample_job(), &broadcaster, CancellationToken::new()).await.unwrap();
    assert_eq!(article.slug, "ext-1");
}

#[tokio::test]
async fn resume_continues_from_a_saved_partial_state() {
    let fixture = FixtureLlmAdaptor::new();
    script_all_stages(&fixture);

    let job = sample_job();
    let store = InMemoryStateStore::new();
    let stage1 = fixture.generate_for_stage(1).await.unwrap();
    let chunk1: article_pipeline::chunks::ChunkOutput1 = serde_json::from_value(stage1).unwrap();
    let mut state = PipelineState::new(job.preferred_code());
    state.core_context = Some(article_pipeline::context::build_core_context(&chunk1, &job.casts));
    state.chunk1 = Some(chunk1);
    state.recompute_last_stage();
    store.save(&state).await.unwrap();

    let coordinator = Coordinator::new(
        Arc::new(fixture),
        Arc::new(PipelineConfig::default()),
        Arc::new(SafetyTables::default()),
        Arc::new(store),
    );
    let broadcaster = ProgressBroadcaster::new();

    let article = coordinator.resume(job, &broadcaster, CancellationToken::new()).await.unwrap();
    assert_eq!(article.slug, "ext-1");
}

#[tokio::test]
async fn failed_job_then_resume_succeeds_and_deletes_state() {
    let fixture = FixtureLlmAdaptor::new();
    script_all_stages(&fixture);
    // Stage 3 fails on its first three attempts (the full retry budget),
    // then starts succeeding — simulating a one-time upstream outage.
    fixture.script(
        3,
        vec![
            FixtureResponse::Err(ProviderError::Rejected { message: "blocked".into() }),
            FixtureResponse::Err(ProviderError::Rejected { message: "blocked".into() }),
            FixtureResponse::Err(ProviderError::Rejected { message: "blocked".into() }),
        ],
    );

    let store = Arc::new(InMemoryStateStore::new());
    let config = Arc::new(PipelineConfig::default());
    let tables = Arc::new(SafetyTables::default());
    let coordinator = Coordinator::new(Arc::new(fixture), Arc::clone(&config), Arc::clone(&tables), Arc::clone(&store));
    let broadcaster = ProgressBroadcaster::new();
    let job = sample_job();
    let code = job.preferred_code().to_string();

    let first = coordinator.process_job(job.clone(), &broadcaster, CancellationToken::new()).await;
    match first {
        Err(PipelineError::Partial(e)) => assert_eq!(e.failed_stage, 3),
        other => panic!("expected a partial error, got {other:?}"),
    }
    let saved = store.load(&code).await.unwrap();
    assert!(saved.is_some(), "state must survive a partial failure");
    assert!(saved.unwrap().chunk1.is_some());

    // Reset stage 3 to always succeed, mirroring the upstream recovering.
    let fixture2 = FixtureLlmAdaptor::new();
    script_all_stages(&fixture2);
    let coordinator = Coordinator::new(Arc::new(fixture2), config, tables, Arc::clone(&store));

    let article = coordinator.resume(job, &broadcaster, CancellationToken::new()).await.unwrap();
    assert_eq!(article.slug, "ext-1");
    assert_eq!(store.load(&code).await.unwrap(), None, "success deletes the saved state");
}
