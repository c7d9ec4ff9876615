//! Job Coordinator (`spec.md` §4.10): the crate's two public entry points,
//! `process_job` and `resume`. Wires the Phase Scheduler to a `StateStore`
//! and a `ProgressBroadcaster`, then hands the completed state to the
//! Aggregator.
//!
//! Grounded on `runtimes::runner::AppRunner` — a single entry point that
//! owns session lifecycle and checkpointer wiring — generalized from one
//! long-lived chat session to one job per call.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::aggregate::{aggregate, Article};
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::job::Job;
use crate::llm::LlmAdaptor;
use crate::progress::{ProgressBroadcaster, ProgressEvent};
use crate::safety::SafetyTables;
use crate::scheduler::{self, SchedulerDeps, SchedulerError};
use crate::state::PipelineState;
use crate::store::StateStore;

/// Fixed progress markers outside the Phase Scheduler's own per-stage events
/// (`spec.md` §4.10: "fetching, AI start, AI complete, publishing").
const STAGE_FETCHING: u8 = 0;
const STAGE_PUBLISHING: u8 = 8;

/// Shared collaborators for a coordinator call. Built once per process (or
/// per test) and reused across jobs — the coordinator itself is stateless.
pub struct Coordinator {
    pub adaptor: Arc<dyn LlmAdaptor>,
    pub config: Arc<PipelineConfig>,
    pub tables: Arc<SafetyTables>,
    pub store: Arc<dyn StateStore>,
}

impl Coordinator {
    pub fn new(adaptor: Arc<dyn LlmAdaptor>, config: Arc<PipelineConfig>, tables: Arc<SafetyTables>, store: Arc<dyn StateStore>) -> Self {
        Self { adaptor, config, tables, store }
    }

    /// Runs a brand-new job end to end: `[initial] -> stage1 -> stage234 ->
    /// stage5 -> stage67 -> [aggregated] -> [deleted-state]` (`spec.md`
    /// §4.10's state diagram).
    pub async fn process_job(&self, job: Job, broadcaster: &ProgressBroadcaster, cancel: CancellationToken) -> Result<Article, PipelineError> {
        let state = PipelineState::new(job.preferred_code());
        self.run(job, state, broadcaster, cancel).await
    }

    /// Loads the persisted state for `job.preferred_code()` and continues
    /// from `state.last_stage + 1`. If no state is on file, behaves exactly
    /// like [`Self::process_job`]; a store load failure is surfaced as
    /// [`PipelineError::StateUnreadable`] rather than silently restarting.
    pub async fn resume(&self, job: Job, broadcaster: &ProgressBroadcaster, cancel: CancellationToken) -> Result<Article, PipelineError> {
        let code = job.preferred_code().to_string();
        let loaded = self.store.load(&code).await;
        let state = match loaded {
            Ok(Some(state)) => state,
            Ok(None) => PipelineState::new(&code),
            Err(e) => {
                return Err(PipelineError::StateUnreadable { code, reason: e.to_string() });
            }
        };
        self.run(job, state, broadcaster, cancel).await
    }

    async fn run(&self, job: Job, mut state: PipelineState, broadcaster: &ProgressBroadcaster, cancel: CancellationToken) -> Result<Article, PipelineError> {
        broadcaster.emit(ProgressEvent::new(state.job_code.clone(), STAGE_FETCHING));

        let job = Arc::new(job);
        let deps = SchedulerDeps {
            adaptor: Arc::clone(&self.adaptor),
            config: Arc::clone(&self.config),
            tables: Arc::clone(&self.tables),
            store: self.store.as_ref(),
            broadcaster,
            cancel,
        };

        scheduler::run(Arc::clone(&job), &mut state, &deps)
            .await
            .map_err(|e| match e {
                SchedulerError::Fatal(f) => PipelineError::Fatal(f),
                SchedulerError::Partial(p) => PipelineError::Partial(p),
            })?;

        let article = aggregate(&job, &state);
        broadcaster.emit(ProgressEvent::new(state.job_code.clone(), STAGE_PUBLISHING));
        Ok(article)
    }
}

// Full pipeline runs, resume scenarios, and the delete-on-success behavior
// are covered by `tests/coordinator_integration.rs`, matching the teacher's
// own split of whole-session integration tests out of the owning module.
