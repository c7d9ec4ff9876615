//! Pipeline working state: [`PipelineState`], [`CoreContext`],
//! [`ExtendedContext`] (`spec.md` §3).
//!
//! `PipelineState` plays the role the teacher's `state::VersionedState`
//! plays for a chat workflow — the single mutable record threaded through
//! execution — but its shape is this pipeline's own: one optional chunk per
//! stage plus the derived contexts, not message/extra/error channels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chunks::{
    ChunkOutput1, ChunkOutput2, ChunkOutput3, ChunkOutput4, ChunkOutput5, ChunkOutput6, ChunkOutput7,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorEntry {
    pub full_name: String,
    pub first_name: String,
    pub role: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityList {
    pub actors: Vec<ActorEntry>,
    pub locations: Vec<String>,
    pub keywords: Vec<String>,
}

/// Derived from stage 1, read by stages 2–5. Invariant: `entities.actors`
/// names are exactly the job's cast list (see [`crate::context::build_core_context`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoreContext {
    pub title: String,
    pub summary: String,
    pub main_theme: String,
    pub main_tone: String,
    pub entities: EntityList,
}

/// Derived after stage 4, read by stages 6–7.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtendedContext {
    pub title: String,
    pub truncated_summary: String,
    pub entities: EntityList,
    pub top_highlights: Vec<String>,
    pub scene_locations: Vec<String>,
    pub expert_summary: String,
    pub expert_analysis: String,
}

/// Per-job, persisted after every completed stage (`spec.md` §3, §4.8).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    pub job_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_stage: u8,
    pub chunk1: Option<ChunkOutput1>,
    pub chunk2: Option<ChunkOutput2>,
    pub chunk3: Option<ChunkOutput3>,
    pub chunk4: Option<ChunkOutput4>,
    pub chunk5: Option<ChunkOutput5>,
    pub chunk6: Option<ChunkOutput6>,
    pub chunk7: Option<ChunkOutput7>,
    pub core_context: Option<CoreContext>,
    pub extended_context: Option<ExtendedContext>,
}

impl PipelineState {
    pub fn new(job_code: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            job_code: job_code.into(),
            created_at: now,
            updated_at: now,
            last_stage: 0,
            chunk1: None,
            chunk2: None,
            chunk3: None,
            chunk4: None,
            chunk5: None,
            chunk6: None,
            chunk7: None,
            core_context: None,
            extended_context: None,
        }
    }

    /// Recomputes `last_stage` as the highest N such that `chunk_N` is
    /// present, per the invariant in `spec.md` §8: "for every persisted
    /// state, `lastStage` equals the highest index N such that `chunk_N` is
    /// non-nil, and for every 1 ≤ k ≤ lastStage, `chunk_k` is non-nil."
    pub fn recompute_last_stage(&mut self) {
        self.last_stage = [
            self.chunk1.is_some(),
            self.chunk2.is_some(),
            self.chunk3.is_some(),
            self.chunk4.is_some(),
            self.chunk5.is_some(),
            self.chunk6.is_some(),
            self.chunk7.is_some(),
        ]
        .iter()
        .enumerate()
        .filter(|(_, present)| **present)
        .map(|(i, _)| (i + 1) as u8)
        .max()
        .unwrap_or(0);
        self.updated_at = Utc::now();
    }

    /// True once every stage has produced output.
    pub fn is_complete(&self) -> bool {
        self.chunk1.is_some()
            && self.chunk2.is_some()
            && self.chunk3.is_some()
            && self.chunk4.is_some()
            && self.chunk5.is_some()
            && self.chunk6.is_some()
            && self.chunk7.is_some()
    }
}

/// Current on-disk envelope version written by [`PersistedPipelineState`].
pub const CURRENT_STATE_FORMAT_VERSION: u32 = 1;

/// On-disk envelope for [`PipelineState`], distinct from the in-memory type so
/// the persisted format carries its own version tag independent of however
/// `PipelineState` itself evolves (`SPEC_FULL.md` §3 [FULL]: "the on-disk
/// representation... is a distinct struct carrying an explicit
/// `format_version` field"). Unlike the teacher's `Checkpoint`, which falls
/// back permissively to `Utc::now()` on an unparseable timestamp, a state
/// store load treats any envelope-level decode failure — including a
/// `format_version` this crate does not recognize — as unreadable rather than
/// attempting a best-effort partial parse.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedPipelineState {
    pub format_version: u32,
    #[serde(flatten)]
    pub state: PipelineState,
}

impl From<&PipelineState> for PersistedPipelineState {
    fn from(state: &PipelineState) -> Self {
        Self { format_version: CURRENT_STATE_FORMAT_VERSION, state: state.clone() }
    }
}

/// Raised when a decoded envelope's `format_version` is not one this crate
/// understands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnsupportedFormatVersion(pub u32);

impl TryFrom<PersistedPipelineState> for PipelineState {
    type Error = UnsupportedFormatVersion;

    fn try_from(persisted: PersistedPipelineState) -> Result<Self, Self::Error> {
        if persisted.format_version != CURRENT_STATE_FORMAT_VERSION {
            return Err(UnsupportedFormatVersion(persisted.format_version));
        }
        Ok(persisted.state)
    }
}
