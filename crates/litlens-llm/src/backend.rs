//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   OpenAiBackend           — OpenAI chat completions (gpt-4o, gpt-4o-mini, …)
//!   OpenAiCompatibleBackend — any OpenAI-compatible endpoint (vLLM, LMStudio,
//!                             Ollama, OpenRouter, …)
//!   DisabledBackend         — no credentials configured; every call fails

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use litlens_common::{LitlensError, SandboxClient};
use litlens_config::{LlmConfig, LlmProvider};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Blocked(#[from] LitlensError),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("Rate limit exceeded")]
    RateLimited,
    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask the backend to constrain output to a JSON object.
    #[serde(default)]
    pub json_mode: bool,
}

impl LlmRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system), Message::user(user)],
            ..Default::default()
        }
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    fn max_output_tokens(&self) -> usize;
}

// ── Helpers: OpenAI wire format ──────────────────────────────────────────────

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> LlmResponse {
    LlmResponse {
        content: json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

fn chat_body(req: &LlmRequest, default_model: &str) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model":       req.model.as_deref().unwrap_or(default_model),
        "messages":    req.messages,
        "max_tokens":  req.max_tokens.unwrap_or(2048),
        "temperature": req.temperature.unwrap_or(0.2),
    });
    if req.json_mode {
        body["response_format"] = serde_json::json!({"type": "json_object"});
    }
    body
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    if status == 429 {
        return Err(LlmError::RateLimited);
    }
    if status >= 400 {
        let msg = serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|body| {
                body["error"]["message"]
                    .as_str()
                    .or_else(|| body["message"].as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| if text.is_empty() { "unknown API error".to_string() } else { text });
        return Err(LlmError::Api { status, message: msg });
    }
    Ok(serde_json::from_str(&text)?)
}

const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

// ── 1. OpenAI ─────────────────────────────────────────────────────────────────

pub struct OpenAiBackend {
    pub model: String,
    api_key: SecretString,
    client: SandboxClient,
}

impl OpenAiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            model: model.into(),
            api_key: SecretString::from(api_key.into()),
            client: SandboxClient::new()?,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = SandboxClient::with_timeout(timeout)?;
        Ok(self)
    }
}

#[async_trait]
impl LlmBackend for OpenAiBackend {
    #[tracing::instrument(skip(self, req), fields(model = %self.model))]
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = chat_body(&req, &self.model);
        let resp = self.client
            .post(OPENAI_CHAT_URL)?
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn model_id(&self) -> &str { &self.model }
    fn max_output_tokens(&self) -> usize { 16_384 }
}

// ── 2. OpenAI-Compatible (vLLM, LMStudio, Ollama, OpenRouter, …) ─────────────

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<SecretString>,
    client: SandboxClient,
}

impl OpenAiCompatibleBackend {
    /// The host of `base_url` is added to the sandbox allowlist; every other
    /// host stays blocked.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.into();
        let client = sandbox_for(&base_url, SandboxClient::new()?)?;
        Ok(Self {
            base_url,
            model: model.into(),
            api_key: api_key.map(SecretString::from),
            client,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = sandbox_for(&self.base_url, SandboxClient::with_timeout(timeout)?)?;
        Ok(self)
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'))
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k.expose_secret()),
            None    => req,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    #[tracing::instrument(skip(self, req), fields(model = %self.model, base_url = %self.base_url))]
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let body = chat_body(&req, &self.model);
        let resp = self.auth(self.client.post(&self.endpoint())?).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn model_id(&self) -> &str { &self.model }
    fn max_output_tokens(&self) -> usize { 8_192 }
}

fn sandbox_for(base_url: &str, mut client: SandboxClient) -> Result<SandboxClient, LlmError> {
    let host = Url::parse(base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .ok_or_else(|| LlmError::Unavailable(format!("invalid llm.base_url: {}", base_url)))?;
    client.allow_domain(&host);
    Ok(client)
}

// ── 3. Disabled ──────────────────────────────────────────────────────────────

/// Stand-in used when no credentials are configured. Pipelines running on it
/// produce their default outputs.
pub struct DisabledBackend {
    reason: String,
}

impl DisabledBackend {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

#[async_trait]
impl LlmBackend for DisabledBackend {
    async fn complete(&self, _req: LlmRequest) -> Result<LlmResponse, LlmError> {
        Err(LlmError::Unavailable(self.reason.clone()))
    }

    fn model_id(&self) -> &str { "disabled" }
    fn max_output_tokens(&self) -> usize { 0 }
}

// ── Construction from config ─────────────────────────────────────────────────

pub fn build_backend(cfg: &LlmConfig) -> Result<Arc<dyn LlmBackend>, LlmError> {
    let timeout = Duration::from_secs(cfg.timeout_secs);
    match cfg.provider {
        LlmProvider::OpenAi => match &cfg.api_key {
            Some(key) => {
                let backend = OpenAiBackend::new(key.expose_secret(), cfg.model.clone())?
                    .with_timeout(timeout)?;
                Ok(Arc::new(backend))
            }
            None => {
                tracing::warn!("No OpenAI API key configured; LLM pipelines will return defaults");
                Ok(Arc::new(DisabledBackend::new("OpenAI API key not configured")))
            }
        },
        LlmProvider::OpenAiCompatible => {
            let base_url = cfg.base_url.clone().ok_or_else(|| {
                LlmError::Unavailable("llm.base_url is required for openai_compatible".into())
            })?;
            let key = cfg.api_key.as_ref().map(|k| k.expose_secret().to_string());
            let backend = OpenAiCompatibleBackend::new(base_url, cfg.model.clone(), key)?
                .with_timeout(timeout)?;
            Ok(Arc::new(backend))
        }
    }
}
