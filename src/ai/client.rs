//! LLM API client supporting Anthropic, OpenAI-compatible and Gemini backends
//!
//! Uses ureq (sync HTTP), no async runtime needed.

use crate::ai::{AiError, AiResult, ModelService};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Supported LLM backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmBackend {
    #[default]
    Anthropic,
    OpenAi,
    Gemini,
    Perplexity,
    OpenRouter,
    Ollama,
}

impl LlmBackend {
    pub fn env_key(&self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "ANTHROPIC_API_KEY",
            LlmBackend::OpenAi => "OPENAI_API_KEY",
            LlmBackend::Gemini => "GEMINI_API_KEY",
            LlmBackend::Perplexity => "PERPLEXITY_API_KEY",
            LlmBackend::OpenRouter => "OPENROUTER_API_KEY",
            LlmBackend::Ollama => "OLLAMA_MODEL",
        }
    }

    pub fn signup_url(&self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "https://console.anthropic.com/settings/keys",
            LlmBackend::OpenAi => "https://platform.openai.com/api-keys",
            LlmBackend::Gemini => "https://aistudio.google.com/app/apikey",
            LlmBackend::Perplexity => "https://www.perplexity.ai/settings/api",
            LlmBackend::OpenRouter => "https://openrouter.ai/keys",
            LlmBackend::Ollama => "https://ollama.ai (no key needed, just run locally)",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "claude-sonnet-4-20250514",
            LlmBackend::OpenAi => "gpt-4o",
            LlmBackend::Gemini => "gemini-1.5-flash",
            LlmBackend::Perplexity => "sonar",
            LlmBackend::OpenRouter => "anthropic/claude-sonnet-4",
            LlmBackend::Ollama => "deepseek-coder:6.7b",
        }
    }

    /// Endpoint for a completion request. Gemini puts the model in the path.
    pub fn api_url(&self, model: &str) -> String {
        match self {
            LlmBackend::Anthropic => "https://api.anthropic.com/v1/messages".to_string(),
            LlmBackend::OpenAi => "https://api.openai.com/v1/chat/completions".to_string(),
            LlmBackend::Gemini => format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
                model
            ),
            LlmBackend::Perplexity => "https://api.perplexity.ai/chat/completions".to_string(),
            LlmBackend::OpenRouter => "https://openrouter.ai/api/v1/chat/completions".to_string(),
            LlmBackend::Ollama => "http://localhost:11434/v1/chat/completions".to_string(),
        }
    }

    pub fn is_openai_compatible(&self) -> bool {
        matches!(
            self,
            LlmBackend::OpenAi | LlmBackend::Perplexity | LlmBackend::OpenRouter | LlmBackend::Ollama
        )
    }

    pub fn requires_api_key(&self) -> bool {
        !matches!(self, LlmBackend::Ollama)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmBackend::Anthropic => "anthropic",
            LlmBackend::OpenAi => "openai",
            LlmBackend::Gemini => "gemini",
            LlmBackend::Perplexity => "perplexity",
            LlmBackend::OpenRouter => "openrouter",
            LlmBackend::Ollama => "ollama",
        }
    }
}

impl FromStr for LlmBackend {
    type Err = AiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(LlmBackend::Anthropic),
            "openai" | "gpt" => Ok(LlmBackend::OpenAi),
            "gemini" | "google" => Ok(LlmBackend::Gemini),
            "perplexity" => Ok(LlmBackend::Perplexity),
            "openrouter" => Ok(LlmBackend::OpenRouter),
            "ollama" => Ok(LlmBackend::Ollama),
            other => Err(AiError::ConfigError(format!("unknown provider '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub backend: LlmBackend,
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Bound on a single request, connect to last byte
    pub timeout: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            model: None,
            max_tokens: 2000,
            temperature: 0.3,
            timeout: Duration::from_secs(120),
        }
    }
}

impl AiConfig {
    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.backend.default_model())
    }
}

/// Unified LLM client, sync HTTP via ureq
pub struct AiClient {
    config: AiConfig,
    api_key: String,
    agent: ureq::Agent,
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    ureq::config::Config::builder()
        .http_status_as_error(false) // Status codes are mapped to AiError below
        .timeout_global(Some(timeout))
        .build()
        .new_agent()
}

impl AiClient {
    pub fn new(config: AiConfig, api_key: impl Into<String>) -> Self {
        let agent = make_agent(config.timeout);
        Self {
            config,
            api_key: api_key.into(),
            agent,
        }
    }

    pub fn backend(&self) -> LlmBackend {
        self.config.backend
    }

    pub fn model(&self) -> &str {
        self.config.model()
    }

    /// Generate a response for a single user prompt (sync)
    pub fn generate(&self, prompt: &str, max_tokens: u32) -> AiResult<String> {
        match self.config.backend {
            LlmBackend::Anthropic => self.generate_anthropic(prompt, max_tokens),
            LlmBackend::Gemini => self.generate_gemini(prompt, max_tokens),
            _ => self.generate_openai(prompt, max_tokens),
        }
    }

    fn generate_openai(&self, prompt: &str, max_tokens: u32) -> AiResult<String> {
        let body = OpenAiRequest {
            model: self.config.model().to_string(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            max_tokens,
            temperature: self.config.temperature,
        };

        let mut req = self
            .agent
            .post(&self.config.backend.api_url(self.model()))
            .header("Content-Type", "application/json");

        if self.config.backend.requires_api_key() {
            req = req.header("Authorization", &format!("Bearer {}", self.api_key));
        }

        let response = check_status(req.send_json(&body)?)?;
        let resp: OpenAiResponse = response
            .into_body()
            .read_json()
            .map_err(|e| AiError::ParseError(e.to_string()))?;

        resp.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AiError::ParseError("No response choices".to_string()))
    }

    fn generate_anthropic(&self, prompt: &str, max_tokens: u32) -> AiResult<String> {
        let body = AnthropicRequest {
            model: self.config.model().to_string(),
            max_tokens,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(self.config.temperature),
        };

        let response = self
            .agent
            .post(&self.config.backend.api_url(self.model()))
            .header("Content-Type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .send_json(&body)?;

        let resp: AnthropicResponse = check_status(response)?
            .into_body()
            .read_json()
            .map_err(|e| AiError::ParseError(e.to_string()))?;

        resp.content
            .into_iter()
            .find(|c| c.content_type == "text")
            .map(|c| c.text)
            .ok_or_else(|| AiError::ParseError("No text content in response".to_string()))
    }

    fn generate_gemini(&self, prompt: &str, max_tokens: u32) -> AiResult<String> {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                max_output_tokens: max_tokens,
                temperature: self.config.temperature,
            },
        };

        let response = self
            .agent
            .post(&self.config.backend.api_url(self.model()))
            .query("key", &self.api_key)
            .header("Content-Type", "application/json")
            .send_json(&body)?;

        let resp: GeminiResponse = check_status(response)?
            .into_body()
            .read_json()
            .map_err(|e| AiError::ParseError(e.to_string()))?;

        resp.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| AiError::ParseError("No candidates in response".to_string()))
    }
}

fn check_status(
    response: ureq::http::Response<ureq::Body>,
) -> AiResult<ureq::http::Response<ureq::Body>> {
    let status = response.status().as_u16();
    if status >= 400 {
        let error_text = response.into_body().read_to_string().unwrap_or_default();
        return Err(AiError::ApiError {
            status,
            message: error_text,
        });
    }
    Ok(response)
}

impl ModelService for AiClient {
    fn name(&self) -> String {
        format!("{}/{}", self.config.backend.as_str(), self.model())
    }

    fn probe(&self) -> AiResult<()> {
        if self.config.backend.requires_api_key() && self.api_key.trim().is_empty() {
            return Err(AiError::MissingApiKey {
                env_var: self.config.backend.env_key().to_string(),
                signup_url: self.config.backend.signup_url().to_string(),
            });
        }
        self.generate("Reply with OK.", 5).map(|_| ())
    }

    fn complete(&self, prompt: &str) -> AiResult<String> {
        self.generate(prompt, self.config.max_tokens)
    }
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

// OpenAI-compatible API types
#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: String,
}

// Anthropic API types
#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

// Gemini API types
#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}
