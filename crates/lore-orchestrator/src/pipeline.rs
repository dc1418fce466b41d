use std::sync::Arc;
use std::time::Duration;

use lore_ai::{
    estimate_tokens, is_rate_limit_error, ChatRequest, ChatResponse, LlmClient, Message,
};
use lore_retrieval::EngineCell;

use crate::factory::ClientFactory;
use crate::outcome::{CompletionOutcome, Diagnostics, FailureStage, StageFailure};
use crate::prompt::{
    build_system_message, conversation_window, history_lines, prompt_char_count, retrieval_query,
};

pub const DEFAULT_PRIMARY_MODEL: &str = "deepseek/deepseek-chat-v3-0324:free";
pub const DEFAULT_SECONDARY_MODEL: &str = "openai/gpt-3.5-turbo";
pub const DEFAULT_PRIMARY_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_SECONDARY_TIMEOUT_MS: u64 = 25_000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 800;
pub const DEFAULT_MAX_CONTEXT_CHUNKS: usize = 3;

/// Fixed text returned when both models fail for non-rate-limit
/// reasons. Callers always get an answer body, never a bare error.
pub const DEGRADED_RESPONSE: &str = "I'm sorry, but I'm having trouble reaching the language \
model right now. Please try again in a moment.";

/// Guidance attached to rate-limit outcomes.
pub const RATE_LIMIT_GUIDANCE: &str = "The shared free tier is rate limited right now. Supply \
your own OpenRouter API key to keep going without waiting.";

#[derive(Debug, Clone, PartialEq, Eq)]
/// One model attempt: which model, and its wall-clock deadline.
pub struct ModelRoute {
    pub model: String,
    pub timeout_ms: u64,
}

impl ModelRoute {
    pub fn new(model: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            model: model.into(),
            timeout_ms,
        }
    }
}

#[derive(Debug, Clone)]
/// Public struct `PipelineConfig` used across Lore components.
pub struct PipelineConfig {
    pub primary: ModelRoute,
    pub secondary: ModelRoute,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub max_context_chunks: usize,
    /// Server-held credential used when a request carries none.
    pub default_api_key: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            primary: ModelRoute::new(DEFAULT_PRIMARY_MODEL, DEFAULT_PRIMARY_TIMEOUT_MS),
            secondary: ModelRoute::new(DEFAULT_SECONDARY_MODEL, DEFAULT_SECONDARY_TIMEOUT_MS),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            max_context_chunks: DEFAULT_MAX_CONTEXT_CHUNKS,
            default_api_key: None,
        }
    }
}

/// Drives one retrieval-augmented completion per [`handle`] call.
///
/// Stage order is fixed: resolve credential, retrieve context, attempt
/// the primary model, fall back to the secondary, degrade. A rate
/// limit at either stage short-circuits the remaining attempts so the
/// caller can react to quota exhaustion immediately.
///
/// [`handle`]: CompletionPipeline::handle
pub struct CompletionPipeline {
    engine: Arc<EngineCell>,
    factory: Arc<dyn ClientFactory>,
    config: PipelineConfig,
}

enum StageOutcome {
    Completed(ChatResponse),
    RateLimited(String),
    Failed(String),
}

impl CompletionPipeline {
    pub fn new(
        engine: Arc<EngineCell>,
        factory: Arc<dyn ClientFactory>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            engine,
            factory,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Handles one completion request end to end. Never returns an
    /// error: every internal failure maps onto a [`CompletionOutcome`]
    /// variant.
    #[tracing::instrument(skip_all, fields(messages = messages.len()))]
    pub async fn handle(
        &self,
        messages: &[Message],
        user_api_key: Option<&str>,
    ) -> CompletionOutcome {
        let user_key = user_api_key.map(str::trim).filter(|key| !key.is_empty());
        let Some(api_key) = user_key.or(self.config.default_api_key.as_deref()) else {
            return CompletionOutcome::Failure {
                stage: FailureStage::Configuration,
                message: "no API key available; configure a default or supply one per request"
                    .to_string(),
            };
        };
        let using_user_api_key = user_key.is_some();

        let engine = match self.engine.get() {
            Ok(engine) => engine,
            Err(error) => {
                return CompletionOutcome::Failure {
                    stage: FailureStage::Configuration,
                    message: error.to_string(),
                };
            }
        };

        let retrieval = engine.relevant_context(
            retrieval_query(messages),
            &history_lines(messages),
            self.config.max_context_chunks,
        );

        let system_message = build_system_message(engine.system_prompt(), &retrieval.context_text);
        let mut outgoing = Vec::with_capacity(1 + messages.len().min(crate::MAX_HISTORY_MESSAGES));
        outgoing.push(system_message);
        outgoing.extend_from_slice(conversation_window(messages));

        let prompt_chars = prompt_char_count(&outgoing);
        let mut diagnostics = Diagnostics {
            context_chars: retrieval.context_text.chars().count(),
            chunk_ids: retrieval.chunk_ids,
            estimated_input_tokens: estimate_tokens(prompt_chars),
            using_user_api_key,
            stage_errors: Vec::new(),
        };
        tracing::debug!(
            context_chars = diagnostics.context_chars,
            estimated_input_tokens = diagnostics.estimated_input_tokens,
            using_user_api_key,
            "assembled completion prompt"
        );

        let client = match self.factory.client_for(api_key) {
            Ok(client) => client,
            Err(error) => {
                return CompletionOutcome::Failure {
                    stage: FailureStage::Configuration,
                    message: error.to_string(),
                };
            }
        };

        match self
            .run_stage(client.as_ref(), &self.config.primary, &outgoing)
            .await
        {
            StageOutcome::Completed(response) => {
                return success(response, false, diagnostics);
            }
            StageOutcome::RateLimited(details) => {
                tracing::warn!(model = %self.config.primary.model, %details, "primary model rate limited");
                return CompletionOutcome::RateLimited {
                    details: format!("{details} {RATE_LIMIT_GUIDANCE}"),
                };
            }
            StageOutcome::Failed(message) => {
                tracing::warn!(model = %self.config.primary.model, %message, "primary model failed, trying fallback");
                diagnostics.stage_errors.push(StageFailure {
                    stage: FailureStage::Primary,
                    message,
                });
            }
        }

        match self
            .run_stage(client.as_ref(), &self.config.secondary, &outgoing)
            .await
        {
            StageOutcome::Completed(response) => success(response, true, diagnostics),
            StageOutcome::RateLimited(details) => {
                tracing::warn!(model = %self.config.secondary.model, %details, "fallback model rate limited");
                CompletionOutcome::RateLimited {
                    details: format!("{details} {RATE_LIMIT_GUIDANCE}"),
                }
            }
            StageOutcome::Failed(message) => {
                diagnostics.stage_errors.push(StageFailure {
                    stage: FailureStage::Fallback,
                    message,
                });
                tracing::error!(
                    stage_errors = ?diagnostics.stage_errors,
                    "both models failed, returning degraded response"
                );
                CompletionOutcome::Degraded {
                    message: DEGRADED_RESPONSE.to_string(),
                    diagnostics,
                }
            }
        }
    }

    /// Exactly one attempt against one model, bounded by the route's
    /// wall-clock deadline.
    async fn run_stage(
        &self,
        client: &dyn LlmClient,
        route: &ModelRoute,
        messages: &[Message],
    ) -> StageOutcome {
        let request = ChatRequest {
            model: route.model.clone(),
            messages: messages.to_vec(),
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_output_tokens),
        };

        let attempt = tokio::time::timeout(
            Duration::from_millis(route.timeout_ms),
            client.complete(request),
        );
        match attempt.await {
            Ok(Ok(response)) => {
                tracing::debug!(
                    model = %response.model,
                    output_tokens = response.usage.output_tokens,
                    "model completed"
                );
                StageOutcome::Completed(response)
            }
            Ok(Err(error)) if is_rate_limit_error(&error) => {
                StageOutcome::RateLimited(error.to_string())
            }
            Ok(Err(error)) => StageOutcome::Failed(error.to_string()),
            Err(_elapsed) => StageOutcome::Failed(format!(
                "request to {} timed out after {}ms",
                route.model, route.timeout_ms
            )),
        }
    }
}

fn success(response: ChatResponse, fallback: bool, diagnostics: Diagnostics) -> CompletionOutcome {
    CompletionOutcome::Success {
        content: response.content,
        model: response.model,
        fallback,
        usage: response.usage,
        diagnostics,
    }
}
