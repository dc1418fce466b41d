use std::sync::Arc;

use lore_ai::{LlmClient, LoreAiError, OpenRouterClient, OpenRouterConfig, DEFAULT_API_BASE};

/// Builds an [`LlmClient`] for one request's resolved credential.
///
/// Credentials arrive per request (a caller-supplied key overrides the
/// configured default), so the client is constructed at handle time
/// rather than held for the pipeline's lifetime.
pub trait ClientFactory: Send + Sync {
    fn client_for(&self, api_key: &str) -> Result<Arc<dyn LlmClient>, LoreAiError>;
}

#[derive(Debug, Clone)]
/// Production factory producing [`OpenRouterClient`] instances.
pub struct OpenRouterFactory {
    pub api_base: String,
    pub request_timeout_ms: u64,
    pub http_referer: Option<String>,
    pub x_title: Option<String>,
}

impl Default for OpenRouterFactory {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_ms: 30_000,
            http_referer: None,
            x_title: None,
        }
    }
}

impl OpenRouterFactory {
    pub fn with_api_base(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::default()
        }
    }
}

impl ClientFactory for OpenRouterFactory {
    fn client_for(&self, api_key: &str) -> Result<Arc<dyn LlmClient>, LoreAiError> {
        let mut config = OpenRouterConfig::new(api_key);
        config.api_base = self.api_base.clone();
        config.request_timeout_ms = self.request_timeout_ms;
        config.http_referer = self.http_referer.clone();
        config.x_title = self.x_title.clone();
        let client = OpenRouterClient::new(config)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::{ClientFactory, OpenRouterFactory};

    #[test]
    fn unit_factory_rejects_blank_api_key() {
        let factory = OpenRouterFactory::default();
        assert!(factory.client_for("  ").is_err());
    }

    #[test]
    fn unit_factory_builds_client_for_real_key() {
        let factory = OpenRouterFactory::with_api_base("http://localhost:9/v1");
        assert!(factory.client_for("sk-test").is_ok());
    }
}
