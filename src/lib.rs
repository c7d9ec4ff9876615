//! # article-pipeline: multi-stage LLM article generation
//!
//! Turns a subtitle transcript plus video metadata into a publish-ready
//! article through a fixed seven-stage chunk pipeline, run as four
//! sequential phases (`[1] -> [2,3,4] -> [5] -> [6,7]`), with per-stage
//! retry, resumable state, and a content-safety post-processing pass on
//! every stage's output before it is persisted.
//!
//! ## Module guide
//!
//! - [`job`] — the inbound job description (transcript, cast, tags, related
//!   articles)
//! - [`chunks`] — the seven per-stage output shapes plus their shared value
//!   types
//! - [`state`] — [`state::PipelineState`], [`state::CoreContext`],
//!   [`state::ExtendedContext`]
//! - [`registry`] — the table-driven [`registry::ChunkSpec`] per stage:
//!   schema, prompt builder, parser, validator, post-processor
//! - [`context`] — pure functions deriving the core/extended contexts
//! - [`validators`] — per-stage structural and semantic checks
//! - [`safety`] — safety tables (blacklists, substitutions, locale markers)
//! - [`postprocess`] — the post-processing passes the registry composes per
//!   stage
//! - [`sanitize`] — contextual-link allow-listing and mixed-language name
//!   repair
//! - [`llm`] — the [`llm::LlmAdaptor`] trait plus a scripted fixture
//!   implementation used throughout the test suite
//! - [`stage_runner`] — runs one stage end to end with retry/backoff
//! - [`scheduler`] — the fixed four-phase DAG executor
//! - [`store`] — [`store::StateStore`] and its in-memory/file
//!   implementations
//! - [`progress`] — [`progress::ProgressEvent`] and its sinks
//! - [`aggregate`] — assembles the seven completed chunks into the final
//!   [`aggregate::Article`]
//! - [`coordinator`] — the crate's two public entry points, `process_job`
//!   and `resume`
//! - [`error`] — the crate-wide error taxonomy
//! - [`config`] — [`config::PipelineConfig`]

pub mod aggregate;
pub mod chunks;
pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod job;
pub mod llm;
pub mod postprocess;
pub mod progress;
pub mod registry;
pub mod safety;
pub mod sanitize;
pub mod scheduler;
pub mod stage_runner;
pub mod state;
pub mod store;
pub mod validators;
