//! Inbound job description (`spec.md` §3, §6).

use serde::{Deserialize, Serialize};

/// One cast member attached to the video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastEntry {
    pub id: String,
    pub full_name: String,
    pub localized_name: Option<String>,
    pub slug: String,
}

/// One tag attached to the video.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagEntry {
    pub id: String,
    pub display_name: String,
}

/// A candidate for a contextual link, pre-fetched by an external collaborator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelatedArticleCandidate {
    pub slug: String,
    pub title: String,
    pub external_code: String,
    pub cast_names: Vec<String>,
    pub tag_names: Vec<String>,
    pub thumbnail_url: Option<String>,
    pub quality_score: f32,
}

/// A single line of subtitle text with its start offset in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranscriptLine {
    pub start_seconds: f64,
    pub text: String,
}

/// The job handed to the coordinator. Opaque beyond what the pipeline needs;
/// every field here is read-only input for the duration of the run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub internal_code: String,
    pub external_code: Option<String>,
    pub transcript: Vec<TranscriptLine>,
    pub duration_seconds: u64,
    pub casts: Vec<CastEntry>,
    pub tags: Vec<TagEntry>,
    pub maker: Option<String>,
    pub previous_works: Vec<String>,
    pub gallery_image_count: usize,
    pub related_article_candidates: Vec<RelatedArticleCandidate>,
    pub generate_tts: bool,
}

impl Job {
    /// Full transcript text, concatenated with its embedded timestamps
    /// preserved as `[start]` markers — this is the raw material every
    /// stage's prompt builder draws from.
    pub fn transcript_text(&self) -> String {
        self.transcript
            .iter()
            .map(|line| format!("[{:.2}] {}", line.start_seconds, line.text))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The code used to key persisted state and, by default, the article
    /// slug: external code if present, otherwise the internal code
    /// (`spec.md` §9 open question (a)).
    pub fn preferred_code(&self) -> &str {
        self.external_code
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(&self.internal_code)
    }
}
