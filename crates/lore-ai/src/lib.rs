//! Chat-completion types and the OpenRouter HTTP client for Lore.
mod openrouter;
mod types;

pub use openrouter::{OpenRouterClient, OpenRouterConfig, DEFAULT_API_BASE};
pub use types::{
    estimate_tokens, is_rate_limit_error, ChatRequest, ChatResponse, ChatUsage, LlmClient,
    LoreAiError, Message, MessageRole,
};
