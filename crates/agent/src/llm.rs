use std::time::Duration;

use async_trait::async_trait;
use helpdesk_core::config::LlmConfig;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Which judgment or generation a completion serves. Carried for logging and test fakes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PromptKind {
    Classification,
    Sentiment,
    SalesComplexity,
    FieldExtraction,
    TechnicalAnswer,
}

impl PromptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Sentiment => "sentiment",
            Self::SalesComplexity => "sales_complexity",
            Self::FieldExtraction => "field_extraction",
            Self::TechnicalAnswer => "technical_answer",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub purpose: PromptKind,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub json_response: bool,
}

impl CompletionRequest {
    pub fn user_prompt(purpose: PromptKind, prompt: impl Into<String>) -> Self {
        Self {
            purpose,
            messages: vec![ChatMessage::user(prompt)],
            temperature: 0.0,
            max_tokens: None,
            json_response: false,
        }
    }

    /// Puts a system message ahead of the conversation.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.messages.insert(0, ChatMessage::system(system));
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn json_response(mut self) -> Self {
        self.json_response = true;
        self
    }

    /// The last user message, which is the customer text for most prompts.
    pub fn user_content(&self) -> &str {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == ChatRole::User)
            .map(|message| message.content.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm request timed out")]
    Timeout,
    #[error("llm request failed: {0}")]
    Transport(String),
    #[error("llm provider returned status {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("llm provider payload invalid: {0}")]
    InvalidPayload(String),
    #[error("llm client misconfigured: {0}")]
    Configuration(String),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Returns the trimmed text of the first choice.
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError>;
}

/// Chat-completions client for any OpenAI-compatible provider (Groq, OpenAI, Ollama).
#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(
        base_url: &str,
        api_key: Option<SecretString>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| LlmError::Configuration(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        if config.provider.requires_api_key() && config.api_key.is_none() {
            return Err(LlmError::Configuration(format!(
                "provider `{}` requires llm.api_key",
                config.provider.as_str()
            )));
        }

        Self::new(
            &config.effective_base_url(),
            config.api_key.clone(),
            config.model.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, request: &CompletionRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": request.messages,
            "temperature": request.temperature,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        if request.json_response {
            body["response_format"] = json!({ "type": "json_object" });
        }
        body
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        let mut builder = self.client.post(&self.endpoint).json(&self.request_body(&request));
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await.map_err(|error| {
            if error.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Transport(error.to_string())
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|error| LlmError::InvalidPayload(format!("response body unreadable: {error}")))?;

        if !status.is_success() {
            return Err(LlmError::Provider { status: status.as_u16(), body });
        }

        let parsed: CompletionResponse = serde_json::from_str(&body)
            .map_err(|error| LlmError::InvalidPayload(format!("response not json: {error}")))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidPayload("missing choice".to_string()))?
            .message
            .content
            .unwrap_or_default();

        tracing::debug!(
            event_name = "llm.completion_received",
            purpose = request.purpose.as_str(),
            chars = content.len(),
            "llm completion received"
        );

        Ok(content.trim().to_string())
    }
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}
