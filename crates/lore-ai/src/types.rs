use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Enumerates supported `MessageRole` values.
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Public struct `Message` used across Lore components.
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Public struct `ChatRequest` used across Lore components.
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
/// Public struct `ChatUsage` used across Lore components.
pub struct ChatUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// Public struct `ChatResponse` used across Lore components.
///
/// `content` is guaranteed non-blank: the response parser rejects
/// missing or whitespace-only completions before this type is built.
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub usage: ChatUsage,
}

#[derive(Debug, Error)]
/// Enumerates supported `LoreAiError` values.
pub enum LoreAiError {
    #[error("missing API key")]
    MissingApiKey,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider returned non-success status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("provider returned empty completion content")]
    EmptyContent,
}

#[async_trait]
/// Trait contract for `LlmClient` behavior.
///
/// Exactly one attempt per call; escalation across models is the
/// orchestrator's concern, not the client's.
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LoreAiError>;
}

/// Classifies provider errors that signal quota or rate exhaustion.
///
/// Heuristic: status 429, or an error body mentioning rate/limit/quota.
/// Substring matching can misfire on unrelated provider text, so
/// callers must treat this as a routing hint rather than a guarantee.
pub fn is_rate_limit_error(error: &LoreAiError) -> bool {
    let LoreAiError::HttpStatus { status, body } = error else {
        return false;
    };
    if *status == 429 {
        return true;
    }
    let normalized = body.to_ascii_lowercase();
    normalized.contains("rate") || normalized.contains("limit") || normalized.contains("quota")
}

/// Coarse token estimate (~4 characters per token) used for pacing
/// logs only, never for hard limits.
pub fn estimate_tokens(prompt_chars: usize) -> usize {
    prompt_chars.div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::{estimate_tokens, is_rate_limit_error, LoreAiError, Message, MessageRole};

    #[test]
    fn message_constructors_set_roles() {
        assert_eq!(Message::system("s").role, MessageRole::System);
        assert_eq!(Message::user("u").role, MessageRole::User);
        assert_eq!(Message::assistant("a").role, MessageRole::Assistant);
        assert_eq!(Message::user("hello").content, "hello");
    }

    #[test]
    fn unit_rate_limit_classifier_accepts_status_and_body_patterns() {
        assert!(is_rate_limit_error(&LoreAiError::HttpStatus {
            status: 429,
            body: "too many requests".to_string(),
        }));
        assert!(is_rate_limit_error(&LoreAiError::HttpStatus {
            status: 500,
            body: "free tier quota exhausted".to_string(),
        }));
        assert!(is_rate_limit_error(&LoreAiError::HttpStatus {
            status: 403,
            body: "Rate limit exceeded".to_string(),
        }));
        assert!(!is_rate_limit_error(&LoreAiError::HttpStatus {
            status: 401,
            body: "unauthorized".to_string(),
        }));
        assert!(!is_rate_limit_error(&LoreAiError::EmptyContent));
        assert!(!is_rate_limit_error(&LoreAiError::InvalidResponse(
            "rate limit mentioned but not an http error".to_string(),
        )));
    }

    #[test]
    fn unit_token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(0), 0);
        assert_eq!(estimate_tokens(1), 1);
        assert_eq!(estimate_tokens(4), 1);
        assert_eq!(estimate_tokens(5), 2);
        assert_eq!(estimate_tokens(800), 200);
    }

    #[test]
    fn message_serializes_with_snake_case_role() {
        let serialized =
            serde_json::to_value(Message::user("hi")).expect("message must serialize");
        assert_eq!(serialized["role"], "user");
        assert_eq!(serialized["content"], "hi");
    }
}
