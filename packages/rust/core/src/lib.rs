//! Content generation orchestration for devlog.
//!
//! This crate turns repository metadata into a multi-section article:
//! retrying text generation, the section outline, tag normalization, the
//! publish gate, commit analytics, and the deterministic document assembler,
//! tied together by the batch [`pipeline`].

pub mod analytics;
pub mod assembler;
pub mod gate;
pub mod generator;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod reading_time;
pub mod retry;
pub mod sections;
pub mod source;
pub mod tags;

#[cfg(test)]
mod testing;

pub use llm::{CompletionBackend, GenerationClient, OpenAiCompatibleBackend};
pub use pipeline::{BatchReport, Pipeline, ProgressReporter, SilentProgress};
pub use retry::{Backoff, RetryExhausted, RetryPolicy};
