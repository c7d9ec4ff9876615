//! Stage Runner (`spec.md` §4.6): executes a single stage end to end —
//! prompt build, generation, parse, validate, post-process — with linear
//! backoff retry on provider/parse/validation failure.
//!
//! Grounded on `node.rs`'s `Node::run` shape (snapshot + context in, partial
//! state or error out); the retry loop itself has no teacher analogue beyond
//! `tokio::time::sleep`-based backoff used elsewhere in the corpus.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::chunks::ChunkOutput;
use crate::config::{GenerationParams, PipelineConfig};
use crate::error::{StageError, ValidationError};
use crate::job::Job;
use crate::llm::LlmAdaptor;
use crate::registry::{spec_for, PostProcessInputs};
use crate::safety::SafetyTables;
use crate::state::{CoreContext, ExtendedContext};

/// Runs `stage` to completion, retrying up to `config.retry_count` times with
/// linear backoff (`base_backoff * attempt`). Every failure mode — provider
/// error, parse error, validation error — is retried uniformly within the
/// same budget; a malformed-prompt/safety rejection is not itself retriable
/// in the sense that retrying it is unlikely to help, but the stage runner
/// does not special-case it (`spec.md` §7: "malformed prompt / safety
/// rejection → not retriable — but the stage runner retries all errors
/// uniformly within its bound"). `ProviderError::retriable()` is an
/// informational hint surfaced to callers/logs, not a gate here.
pub async fn run_stage(
    stage: u8,
    job: &Job,
    core: Option<&CoreContext>,
    extended: Option<&ExtendedContext>,
    adaptor: &dyn LlmAdaptor,
    config: &PipelineConfig,
    tables: &SafetyTables,
    cancel: &CancellationToken,
) -> Result<ChunkOutput, StageError> {
    let spec = spec_for(stage);
    let prompt = (spec.build_prompt)(job, core, extended);
    let schema = (spec.schema)();
    let params = GenerationParams::from(config);

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        if cancel.is_cancelled() {
            return Err(StageError::Cancelled);
        }

        let outcome = run_attempt(stage, &prompt, &schema, adaptor, &params, job, config, tables).await;

        match outcome {
            Ok(output) => {
                info!(stage, attempt, "stage completed");
                return Ok(output);
            }
            Err(err) => {
                let retriable = is_retriable(&err);
                if !retriable || attempt >= config.retry_count {
                    warn!(stage, attempt, error = %err, "stage failed, giving up");
                    return Err(err);
                }
                warn!(stage, attempt, error = %err, "stage failed, retrying");
                let delay = config.base_backoff * attempt;
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Err(StageError::Cancelled),
                }
            }
        }
    }
}

async fn run_attempt(
    stage: u8,
    prompt: &str,
    schema: &serde_json::Value,
    adaptor: &dyn LlmAdaptor,
    params: &GenerationParams,
    job: &Job,
    config: &PipelineConfig,
    tables: &SafetyTables,
) -> Result<ChunkOutput, StageError> {
    let spec = spec_for(stage);

    let value = adaptor
        .generate(&config.model_id, schema, prompt, params)
        .await
        .map_err(StageError::Provider)?;

    let output = (spec.parse)(value).map_err(StageError::Parse)?;

    let result = (spec.validate)(&output, job, tables, &config.target_locale);
    if result.has_errors() {
        return Err(StageError::Validation(ValidationError { stage, issues: result.errors }));
    }
    for warning in &result.warnings {
        warn!(stage, %warning, "validator warning");
    }

    let inputs = PostProcessInputs { job, config, tables };
    Ok((spec.postprocess)(output, &inputs))
}

fn is_retriable(err: &StageError) -> bool {
    match err {
        StageError::Provider(_) | StageError::Parse(_) | StageError::Validation(_) => true,
        StageError::Cancelled => false,
    }
}

/// Thin convenience wrapper so the scheduler can pass a shared adaptor handle
/// without threading a lifetime through `tokio::task::JoinSet`'s `'static`
/// future bound.
pub async fn run_stage_owned(
    stage: u8,
    job: Arc<Job>,
    core: Option<CoreContext>,
    extended: Option<ExtendedContext>,
    adaptor: Arc<dyn LlmAdaptor>,
    config: Arc<PipelineConfig>,
    tables: Arc<SafetyTables>,
    cancel: CancellationToken,
) -> Result<ChunkOutput, StageError> {
    run_stage(
        stage,
        &job,
        core.as_ref(),
        extended.as_ref(),
        adaptor.as_ref(),
        &config,
        &tables,
        &cancel,
    )
    .await
}
