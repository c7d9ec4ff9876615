//! Crate-wide error taxonomy.
//!
//! Five kinds, exactly as specified: [`ProviderError`], [`ParseError`],
//! [`ValidationError`], [`FatalError`], [`PartialError`]. `PipelineError` is
//! the type that escapes [`crate::coordinator::process_job`] /
//! [`crate::coordinator::resume`]; it is always one of `FatalError` or
//! `PartialError`, the other three are retried away inside the stage runner.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Error surfaced by the LLM adaptor.
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ProviderError {
    #[error("provider request failed: {message}")]
    Request { message: String, retriable: bool },

    #[error("provider rejected prompt: {message}")]
    Rejected { message: String },
}

impl ProviderError {
    pub fn retriable(&self) -> bool {
        match self {
            ProviderError::Request { retriable, .. } => *retriable,
            ProviderError::Rejected { .. } => false,
        }
    }
}

/// Raised when the adaptor's JSON response does not match the stage schema.
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("response for stage {stage} did not match its schema: {reason}")]
pub struct ParseError {
    pub stage: u8,
    pub reason: String,
}

/// A single structural/semantic rule violation, used both for hard errors
/// and for warnings (see [`crate::validators::ValidationResult`]).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationIssue {
    pub field: String,
    pub rule: String,
    pub detail: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.field, self.rule, self.detail)
    }
}

/// Raised when a stage's validator reports one or more hard errors.
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("validation failed for stage {stage}: {}", format_issues(issues))]
pub struct ValidationError {
    pub stage: u8,
    pub issues: Vec<ValidationIssue>,
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The error a single stage execution returns after exhausting its retry
/// budget. Carried internally by the stage runner and phase scheduler; never
/// escapes the crate directly (it is folded into [`FatalError`] or
/// [`PartialError`] at the coordinator boundary).
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum StageError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("stage cancelled")]
    Cancelled,
}

impl StageError {
    pub fn stage(&self) -> Option<u8> {
        match self {
            StageError::Provider(_) => None,
            StageError::Parse(e) => Some(e.stage),
            StageError::Validation(e) => Some(e.stage),
            StageError::Cancelled => None,
        }
    }
}

/// Errors raised by a [`crate::store::StateStore`] implementation.
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum StateStoreError {
    #[error("state for {code} is unreadable: {reason}")]
    Unreadable { code: String, reason: String },

    #[error("state store backend error: {0}")]
    Backend(String),
}

/// Stage 1 failed after all retries, or the state store itself failed before
/// any state could be persisted.
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum FatalError {
    #[error("stage 1 failed: {source}")]
    Stage1 {
        #[source]
        source: StageError,
    },
    #[error("state store failed: {0}")]
    Store(StateStoreError),
}

/// Any stage ≥ 2 failed after all retries. The queue consumer's signal to
/// stop retrying this message; a saved state remains on disk for resume.
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[error("job partially completed: stage {failed_stage} failed ({message})")]
pub struct PartialError {
    pub message: String,
    pub saved_state_path: String,
    pub failed_stage: u8,
    pub completed_up_to: u8,
    #[source]
    pub cause: Box<StageError>,
}

/// Top-level error returned from the coordinator boundary.
#[derive(Debug, Error, Clone)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum PipelineError {
    #[error(transparent)]
    Fatal(#[from] FatalError),
    #[error(transparent)]
    Partial(#[from] PartialError),
    #[error("state for {code} is unreadable, starting fresh is required: {reason}")]
    StateUnreadable { code: String, reason: String },
}
