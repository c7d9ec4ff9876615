//! Phase Scheduler (`spec.md` §4.7): the fixed 4-phase DAG —
//! `[1] -> [2,3,4] -> [5] -> [6,7]` — with `tokio::task::JoinSet` fan-out
//! for the two parallel phases, a state persist after every completed
//! stage, and a progress event alongside each persist.
//!
//! Grounded on `runtimes/runner.rs`'s concurrent node execution within a
//! superstep and `app::App::apply_barrier`'s barrier-merge between supersteps
//! — generalized from "run every frontier node, merge into VersionedState"
//! to this pipeline's fixed four phases.

use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::chunks::ChunkOutput;
use crate::config::PipelineConfig;
use crate::context::{build_core_context, build_extended_context, rewrite_locations};
use crate::error::{FatalError, PartialError, StageError, StateStoreError};
use crate::job::Job;
use crate::llm::LlmAdaptor;
use crate::progress::{ProgressBroadcaster, ProgressEvent};
use crate::safety::SafetyTables;
use crate::stage_runner::run_stage_owned;
use crate::state::PipelineState;
use crate::store::StateStore;

/// Everything the scheduler needs besides the job and its mutable state.
pub struct SchedulerDeps<'a> {
    pub adaptor: Arc<dyn LlmAdaptor>,
    pub config: Arc<PipelineConfig>,
    pub tables: Arc<SafetyTables>,
    pub store: &'a dyn StateStore,
    pub broadcaster: &'a ProgressBroadcaster,
    pub cancel: CancellationToken,
}

/// What the scheduler returns when a phase cannot complete.
pub enum SchedulerError {
    /// Stage 1 failed after retries, or the store itself failed — either
    /// way, nothing in this run can be resumed past what was persisted.
    Fatal(FatalError),
    /// A stage ≥ 2 failed after retries; `state` still holds everything
    /// completed before the failure and has already been persisted.
    Partial(PartialError),
}

/// The outcome of one attempted stage completion within a phase.
enum StageFailure {
    Stage(u8, StageError),
    Store(StateStoreError),
}

/// Runs every phase from `state.last_stage + 1` onward, mutating `state` and
/// persisting it after each completed stage. Safe to call on a state loaded
/// mid-pipeline (resume): phases whose stages are all already present are
/// skipped entirely.
pub async fn run(job: Arc<Job>, state: &mut PipelineState, deps: &SchedulerDeps<'_>) -> Result<(), SchedulerError> {
    // Phase 1: stage 1.
    if state.chunk1.is_none() {
        let output = run_single_stage(1, &job, None, None, deps)
            .await
            .map_err(|e| SchedulerError::Fatal(FatalError::Stage1 { source: e }))?;
        let ChunkOutput::Stage1(chunk) = output else { unreachable!("stage 1 runner returned wrong variant") };
        state.core_context = Some(build_core_context(&chunk, &job.casts));
        state.chunk1 = Some(chunk);
        persist_and_advance(state, 1, deps)
            .await
            .map_err(|e| SchedulerError::Fatal(FatalError::Store(e)))?;
    }

    // Phase 2: stages 2, 3, 4 in parallel.
    let phase2 = pending_stages(&[2, 3, 4], state);
    if !phase2.is_empty() {
        run_phase(&phase2, &job, state, deps).await?;
    }
    if let (Some(core), Some(stage2), Some(stage4)) = (&mut state.core_context, &state.chunk2, &state.chunk4) {
        rewrite_locations(core, stage2);
        state.extended_context = Some(build_extended_context(core, stage2, stage4));
    }

    // Phase 3: stage 5.
    if state.chunk5.is_none() {
        let core = state.core_context.clone();
        let output = run_single_stage(5, &job, core.as_ref(), None, deps).await;
        match output {
            Ok(ChunkOutput::Stage5(chunk)) => {
                state.chunk5 = Some(chunk);
                persist_and_advance(state, 5, deps)
                    .await
                    .map_err(|e| to_scheduler_error(&job, state, StageFailure::Store(e)))?;
            }
            Ok(_) => unreachable!("stage 5 runner returned wrong variant"),
            Err(e) => return Err(to_scheduler_error(&job, state, StageFailure::Stage(5, e))),
        }
    }

    // Phase 4: stages 6, 7 in parallel.
    let phase4 = pending_stages(&[6, 7], state);
    if !phase4.is_empty() {
        run_phase(&phase4, &job, state, deps).await?;
    }

    // All seven stages succeeded: the saved state is no longer needed for
    // resume, so the scheduler (the state file's single writer) removes it.
    deps.store
        .delete(&state.job_code)
        .await
        .map_err(|e| SchedulerError::Fatal(FatalError::Store(e)))?;

    Ok(())
}

fn pending_stages(candidates: &[u8], state: &PipelineState) -> Vec<u8> {
    candidates.iter().copied().filter(|s| !has_chunk(state, *s)).collect()
}

fn has_chunk(state: &PipelineState, stage: u8) -> bool {
    match stage {
        1 => state.chunk1.is_some(),
        2 => state.chunk2.is_some(),
        3 => state.chunk3.is_some(),
        4 => state.chunk4.is_some(),
        5 => state.chunk5.is_some(),
        6 => state.chunk6.is_some(),
        7 => state.chunk7.is_some(),
        _ => unreachable!("stage index out of range: {stage}"),
    }
}

async fn run_single_stage(
    stage: u8,
    job: &Job,
    core: Option<&crate::state::CoreContext>,
    extended: Option<&crate::state::ExtendedContext>,
    deps: &SchedulerDeps<'_>,
) -> Result<ChunkOutput, StageError> {
    crate::stage_runner::run_stage(
        stage,
        job,
        core,
        extended,
        deps.adaptor.as_ref(),
        &deps.config,
        &deps.tables,
        &deps.cancel,
    )
    .await
}

/// Runs `stages` concurrently via `JoinSet`, merging and persisting each
/// result as soon as it arrives. On the first failure (stage or store),
/// cancels the remaining in-flight stages and returns once every spawned
/// task has unwound.
async fn run_phase(stages: &[u8], job: &Arc<Job>, state: &mut PipelineState, deps: &SchedulerDeps<'_>) -> Result<(), SchedulerError> {
    let core = state.core_context.clone();
    let extended = state.extended_context.clone();

    let mut set = JoinSet::new();
    for &stage in stages {
        let job = Arc::clone(job);
        let core = core.clone();
        let extended = extended.clone();
        let adaptor = Arc::clone(&deps.adaptor);
        let config = Arc::clone(&deps.config);
        let tables = Arc::clone(&deps.tables);
        let cancel = deps.cancel.clone();
        set.spawn(async move {
            let result = run_stage_owned(stage, job, core, extended, adaptor, config, tables, cancel).await;
            (stage, result)
        });
    }

    // Once `failure` is set, every still-inflight sibling is cancelled, but a
    // stage already past its last cancellation checkpoint may still land a
    // late `Ok` — that output is real and must still be merged and persisted
    // (`SPEC_FULL.md` §4.7: "other concurrently-run stages are allowed to
    // finish and their outputs persist into state"). Only the first failure
    // is kept as the phase's outcome; a later failure from another sibling
    // is not a second source of truth and is dropped.
    let mut failure: Option<StageFailure> = None;
    while let Some(joined) = set.join_next().await {
        let (stage, result) = joined.expect("stage task panicked");
        match result {
            Ok(output) => {
                merge_chunk(state, output);
                if let Err(e) = persist_and_advance(state, stage, deps).await {
                    if failure.is_none() {
                        failure = Some(StageFailure::Store(e));
                        deps.cancel.cancel();
                    }
                }
            }
            Err(e) => {
                if failure.is_none() {
                    failure = Some(StageFailure::Stage(stage, e));
                    deps.cancel.cancel();
                }
            }
        }
    }

    match failure {
        None => Ok(()),
        Some(f) => Err(to_scheduler_error(job, state, f)),
    }
}

fn merge_chunk(state: &mut PipelineState, output: ChunkOutput) {
    match output {
        ChunkOutput::Stage1(c) => state.chunk1 = Some(c),
        ChunkOutput::Stage2(c) => state.chunk2 = Some(c),
        ChunkOutput::Stage3(c) => state.chunk3 = Some(c),
        ChunkOutput::Stage4(c) => state.chunk4 = Some(c),
        ChunkOutput::Stage5(c) => state.chunk5 = Some(c),
        ChunkOutput::Stage6(c) => state.chunk6 = Some(c),
        ChunkOutput::Stage7(c) => state.chunk7 = Some(c),
    }
}

async fn persist_and_advance(state: &mut PipelineState, stage: u8, deps: &SchedulerDeps<'_>) -> Result<(), StateStoreError> {
    state.recompute_last_stage();
    deps.store.save(state).await?;
    deps.broadcaster.emit(ProgressEvent::new(state.job_code.clone(), stage));
    Ok(())
}

/// A store failure is treated as fatal regardless of which stage triggered
/// it — a write failure is an infrastructure problem, not a content problem
/// a resume can route around. A stage failure after retries is partial: the
/// job's already-persisted progress remains resumable.
fn to_scheduler_error(job: &Job, state: &PipelineState, failure: StageFailure) -> SchedulerError {
    match failure {
        StageFailure::Store(e) => SchedulerError::Fatal(FatalError::Store(e)),
        StageFailure::Stage(stage, cause) => SchedulerError::Partial(PartialError {
            message: cause.to_string(),
            saved_state_path: format!("{}.json", job.preferred_code()),
            failed_stage: stage,
            completed_up_to: state.last_stage,
            cause: Box::new(cause),
        }),
    }
}
