use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::{ChatRequest, ChatResponse, ChatUsage, LlmClient, LoreAiError};

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";

const DEFAULT_X_TITLE: &str = "lore-assistant";

#[derive(Debug, Clone)]
/// Public struct `OpenRouterConfig` used across Lore components.
pub struct OpenRouterConfig {
    pub api_base: String,
    pub api_key: String,
    pub request_timeout_ms: u64,
    pub http_referer: Option<String>,
    pub x_title: Option<String>,
}

impl OpenRouterConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: api_key.into(),
            request_timeout_ms: 30_000,
            http_referer: None,
            x_title: None,
        }
    }
}

#[derive(Debug, Clone)]
/// Public struct `OpenRouterClient` used across Lore components.
pub struct OpenRouterClient {
    client: reqwest::Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    pub fn new(config: OpenRouterConfig) -> Result<Self, LoreAiError> {
        if config.api_key.trim().is_empty() {
            return Err(LoreAiError::MissingApiKey);
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = format!("Bearer {}", config.api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&bearer)
                .map_err(|e| LoreAiError::InvalidResponse(format!("invalid API key header: {e}")))?,
        );

        if let Some(referer) = config.http_referer.as_deref() {
            headers.insert(
                "HTTP-Referer",
                HeaderValue::from_str(referer).map_err(|e| {
                    LoreAiError::InvalidResponse(format!("invalid HTTP-Referer header: {e}"))
                })?,
            );
        }

        let title = config.x_title.as_deref().unwrap_or(DEFAULT_X_TITLE);
        headers.insert(
            "X-Title",
            HeaderValue::from_str(title)
                .map_err(|e| LoreAiError::InvalidResponse(format!("invalid X-Title header: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_millis(
                config.request_timeout_ms.max(1),
            ))
            .build()?;

        Ok(Self { client, config })
    }

    fn chat_completions_url(&self) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        if base.ends_with("/chat/completions") {
            return base.to_string();
        }

        format!("{base}/chat/completions")
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, LoreAiError> {
        let body = build_chat_request_body(&request);
        let url = self.chat_completions_url();

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();
        let raw = response.text().await?;
        if !status.is_success() {
            return Err(LoreAiError::HttpStatus {
                status: status.as_u16(),
                body: raw,
            });
        }

        parse_chat_response(&raw, &request.model)
    }
}

fn build_chat_request_body(request: &ChatRequest) -> Value {
    let mut body = json!({
        "model": request.model,
        "messages": request.messages,
    });

    if let Some(temperature) = request.temperature {
        body["temperature"] = json!(temperature);
    }

    if let Some(max_tokens) = request.max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }

    body
}

fn parse_chat_response(raw: &str, requested_model: &str) -> Result<ChatResponse, LoreAiError> {
    let parsed: OpenRouterChatResponse = serde_json::from_str(raw)?;
    let choice =
        parsed.choices.into_iter().next().ok_or_else(|| {
            LoreAiError::InvalidResponse("response contained no choices".to_string())
        })?;

    // A well-formed body with blank content is provider-level content
    // suppression, not a success.
    let content = choice.message.content.unwrap_or_default();
    if content.trim().is_empty() {
        return Err(LoreAiError::EmptyContent);
    }

    let usage = parsed
        .usage
        .map(|usage| ChatUsage {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        })
        .unwrap_or_default();

    Ok(ChatResponse {
        content,
        model: parsed
            .model
            .unwrap_or_else(|| requested_model.to_string()),
        usage,
    })
}

#[derive(Debug, Deserialize)]
struct OpenRouterChatResponse {
    model: Option<String>,
    choices: Vec<OpenRouterChoice>,
    usage: Option<OpenRouterUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct OpenRouterChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenRouterUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: u64,
}
