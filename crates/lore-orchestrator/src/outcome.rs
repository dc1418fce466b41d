use serde::Serialize;

use lore_ai::ChatUsage;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `FailureStage` values.
pub enum FailureStage {
    Configuration,
    Primary,
    Fallback,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Configuration => "configuration",
            FailureStage::Primary => "primary",
            FailureStage::Fallback => "fallback",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// One recorded stage failure, kept for caller diagnostics.
pub struct StageFailure {
    pub stage: FailureStage,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
/// Per-request diagnostic fields carried alongside the outcome.
///
/// Observability only; nothing here participates in the correctness
/// contract.
pub struct Diagnostics {
    pub context_chars: usize,
    pub chunk_ids: Vec<String>,
    pub estimated_input_tokens: usize,
    pub using_user_api_key: bool,
    pub stage_errors: Vec<StageFailure>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
/// The single value a caller observes per request. Exhaustive by
/// design: every call site is forced to handle all outcome kinds, and
/// no error crosses the orchestrator boundary.
pub enum CompletionOutcome {
    /// A real answer; `fallback` marks that the secondary model
    /// produced it.
    Success {
        content: String,
        model: String,
        fallback: bool,
        usage: ChatUsage,
        diagnostics: Diagnostics,
    },
    /// Provider quota exhausted; `details` tells the caller to supply
    /// a personal credential. No fallback was attempted.
    RateLimited { details: String },
    /// Request-fatal configuration error (missing credential, engine
    /// not initialized). Reported immediately, nothing attempted.
    Failure {
        stage: FailureStage,
        message: String,
    },
    /// Both providers exhausted for non-rate-limit reasons; fixed
    /// apology text with both stage failures in diagnostics.
    Degraded {
        message: String,
        diagnostics: Diagnostics,
    },
}
