//! Completion orchestration for Lore.
//!
//! Drives one retrieval-augmented completion per request: assembles a
//! bounded prompt from knowledge-base context plus recent conversation,
//! attempts the primary model under a wall-clock deadline, falls back
//! to the secondary model, and degrades to a fixed apology so the
//! caller always receives content rather than an error.
mod factory;
mod outcome;
mod pipeline;
mod prompt;

pub use factory::{ClientFactory, OpenRouterFactory};
pub use outcome::{CompletionOutcome, Diagnostics, FailureStage, StageFailure};
pub use pipeline::{
    CompletionPipeline, ModelRoute, PipelineConfig, DEFAULT_MAX_CONTEXT_CHUNKS,
    DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_PRIMARY_MODEL, DEFAULT_PRIMARY_TIMEOUT_MS,
    DEFAULT_SECONDARY_MODEL, DEFAULT_SECONDARY_TIMEOUT_MS, DEFAULT_TEMPERATURE, DEGRADED_RESPONSE,
    RATE_LIMIT_GUIDANCE,
};
pub use prompt::{
    build_system_message, conversation_window, history_lines, is_caller_role, prompt_char_count,
    retrieval_query, HISTORY_CONTEXT_TURNS, MAX_HISTORY_MESSAGES,
};
