//! Chat-completion client: builds the HTTP request for an OpenAI-compatible
//! endpoint and pulls the assistant text back out of the response.

use std::future::Future;

use serde_json::Value;

use crate::error::AgentError;
use crate::settings::CompletionConfig;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Resolved endpoint details ready for making an API call.
#[derive(Debug, Clone)]
pub struct ResolvedProvider {
    pub url: String,
    pub api_key: String,
    pub model: String,
}

impl ResolvedProvider {
    /// Resolve a config into concrete URL / key / model values.
    ///
    /// # Errors
    /// Returns [`AgentError::NoApiKey`] if the API key is missing.
    pub fn from_config(config: &CompletionConfig) -> Result<Self, AgentError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(AgentError::NoApiKey)?
            .to_string();
        let base = config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let base = base.trim_end_matches('/');
        Ok(Self {
            url: format!("{base}/chat/completions"),
            api_key,
            model: config
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }
}

/// One system + one user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
}

/// Raw HTTP outcome, before any interpretation of the body.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub status: u16,
    /// The transport's description of `status` ("OK", "Unauthorized", ...).
    pub status_text: String,
    pub body: String,
}

impl CompletionResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can carry a [`CompletionRequest`] to a model.
pub trait CompletionTransport: Send + Sync {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, AgentError>> + Send;
}

/// JSON body for the chat-completions endpoint.
pub fn request_body(model: &str, request: &CompletionRequest) -> Value {
    serde_json::json!({
        "model": model,
        "messages": [
            { "role": "system", "content": request.system },
            { "role": "user", "content": request.user },
        ],
    })
}

/// Build the HTTP request for the resolved provider.
pub fn build_request(
    client: &reqwest::Client,
    provider: &ResolvedProvider,
    request: &CompletionRequest,
) -> reqwest::RequestBuilder {
    client
        .post(&provider.url)
        .header("Authorization", format!("Bearer {}", provider.api_key))
        .header("content-type", "application/json")
        .json(&request_body(&provider.model, request))
}

/// `choices[0].message.content` of a chat-completions response.
///
/// # Errors
/// Returns [`AgentError::InvalidResponse`] if the body is not JSON or has no
/// message content.
pub fn parse_response_content(body: &str) -> Result<String, AgentError> {
    let json: Value = serde_json::from_str(body).map_err(|e| AgentError::InvalidResponse {
        message: e.to_string(),
    })?;
    json.get("choices")
        .and_then(Value::as_array)
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| AgentError::InvalidResponse {
            message: "No message content in first choice".to_string(),
        })
}

/// reqwest-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    provider: ResolvedProvider,
}

impl HttpTransport {
    pub fn new(provider: ResolvedProvider) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider,
        }
    }

    pub fn from_config(config: &CompletionConfig) -> Result<Self, AgentError> {
        Ok(Self::new(ResolvedProvider::from_config(config)?))
    }

    pub fn provider(&self) -> &ResolvedProvider {
        &self.provider
    }
}

impl CompletionTransport for HttpTransport {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<CompletionResponse, AgentError>> + Send {
        let builder = build_request(&self.client, &self.provider, request);
        async move {
            let response = builder.send().await?;
            let status = response.status();
            let status_text = status
                .canonical_reason()
                .map_or_else(|| status.as_str().to_string(), str::to_string);
            let body = response.text().await?;
            Ok(CompletionResponse {
                status: status.as_u16(),
                status_text,
                body,
            })
        }
    }
}
