//! # Natural Language to SQL
//!
//! This crate turns a natural-language question plus a registered data
//! source into a validated, executed, read-only SQL query and a
//! human-readable answer. The pipeline assembles grounding context from a
//! vector index (schema fragments and saved Q→SQL examples), asks a
//! configurable LLM backend for SQL, enforces a read-only safety policy,
//! optionally rewrites the statement for row-level access control, executes
//! it under a row cap and timeout, and feeds execution errors back into
//! bounded retries.

pub mod analysis;
pub mod config;
pub mod context;
pub mod errors;
pub mod execute;
pub mod generate;
pub mod permission;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod retrieval;
pub mod suggest;
pub mod sync;
pub mod types;
pub mod validate;

pub use config::{AppConfig, ConfigHandle};
pub use errors::PipelineError;
pub use pipeline::{ChatPipeline, PipelineOutcome};
pub use types::{ExecutionOutcome, SqlCandidate, SqlDialect};
