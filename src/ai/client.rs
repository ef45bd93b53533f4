use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use futures::future;
use futures::stream::{BoxStream, StreamExt};
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::error::{AppError, Result};

use super::stream::{lines, sse_data};

/// Local models can take a long time on large prompts.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15 * 60);
const MAX_TOKENS: u32 = 4096;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A text-completion service.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    fn model_id(&self) -> &str;

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Lazily produced, finite, non-restartable text fragments.
    async fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<BoxStream<'static, Result<String>>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
    Ollama,
}

impl Provider {
    /// Splits `provider/model` into its parts.
    pub fn parse(model_id: &str) -> Result<(Provider, &str)> {
        let (prefix, model) = model_id.split_once('/').ok_or_else(|| {
            AppError::Config(format!(
                "model `{model_id}` must look like `anthropic/<model>`, `openai/<model>` or `ollama/<model>`"
            ))
        })?;

        let provider = match prefix {
            "anthropic" => Provider::Anthropic,
            "openai" => Provider::OpenAi,
            "ollama" => Provider::Ollama,
            other => return Err(AppError::Config(format!("unsupported model provider `{other}`"))),
        };

        if model.is_empty() {
            return Err(AppError::Config(format!("model `{model_id}` has no model name")));
        }
        Ok((provider, model))
    }

    fn default_base_url(self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Ollama => "http://localhost:11434",
        }
    }

    fn key_env(self) -> Option<&'static str> {
        match self {
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Ollama => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ReplyMessage,
}

/// What one line of a streaming body means.
#[derive(Debug, PartialEq)]
enum StreamLine {
    Text(String),
    Skip,
    Done,
}

/// HTTP client for the configured provider.
pub struct ModelClient {
    client: Client,
    provider: Provider,
    model_id: String,
    model: String,
    api_key: Option<String>,
    base_url: String,
}

impl ModelClient {
    pub fn new(model_id: &str, api_key: Option<String>, base_url: Option<String>) -> Result<Self> {
        let (provider, model) = Provider::parse(model_id)?;

        let api_key = api_key.or_else(|| provider.key_env().and_then(|var| std::env::var(var).ok()));
        if let (None, Some(var)) = (&api_key, provider.key_env()) {
            return Err(AppError::Config(format!(
                "no API key for `{model_id}`: set llm.api_key or {var}"
            )));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            provider,
            model_id: model_id.to_string(),
            model: model.to_string(),
            api_key,
            base_url: base_url
                .unwrap_or_else(|| provider.default_base_url().to_string())
                .trim_end_matches('/')
                .to_string(),
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Self::new(&config.model, config.api_key.clone(), config.base_url.clone())
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Sends a tiny prompt and reports whether any text came back.
    pub async fn test_connection(&self) -> bool {
        match self.complete("Reply with 'ok'", "ok?").await {
            Ok(text) => !text.trim().is_empty(),
            Err(e) => {
                tracing::warn!("Connection test failed: {}", e);
                false
            }
        }
    }

    fn request(&self, system_prompt: &str, user_prompt: &str, stream: bool) -> RequestBuilder {
        tracing::info!(
            "Calling LLM with model: {}{}",
            self.model_id,
            if stream { " (streaming)" } else { "" }
        );
        tracing::debug!(
            "System prompt length: {} chars, user prompt length: {} chars",
            system_prompt.len(),
            user_prompt.len()
        );

        let messages = |with_system: bool| {
            let mut messages = Vec::with_capacity(2);
            if with_system {
                messages.push(ChatMessage {
                    role: "system",
                    content: system_prompt,
                });
            }
            messages.push(ChatMessage {
                role: "user",
                content: user_prompt,
            });
            messages
        };

        match self.provider {
            Provider::Anthropic => self
                .client
                .post(format!("{}/messages", self.base_url))
                .header("x-api-key", self.api_key.as_deref().unwrap_or_default())
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&MessageRequest {
                    model: &self.model,
                    max_tokens: MAX_TOKENS,
                    system: system_prompt,
                    messages: messages(false),
                    stream,
                }),
            Provider::OpenAi => self
                .client
                .post(format!("{}/chat/completions", self.base_url))
                .bearer_auth(self.api_key.as_deref().unwrap_or_default())
                .json(&ChatRequest {
                    model: &self.model,
                    messages: messages(true),
                    stream,
                }),
            Provider::Ollama => self
                .client
                .post(format!("{}/api/chat", self.base_url))
                .json(&ChatRequest {
                    model: &self.model,
                    messages: messages(true),
                    stream,
                }),
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(llm_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!("LLM call failed with {}: {}", status, body);
            return Err(AppError::Llm(format!("API error ({status}): {body}")));
        }
        Ok(response)
    }
}

#[async_trait]
impl LanguageModel for ModelClient {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let response = self
            .send(self.request(system_prompt, user_prompt, false))
            .await?;

        let text = match self.provider {
            Provider::Anthropic => {
                let body: MessageResponse = response.json().await.map_err(llm_error)?;
                body.content
                    .into_iter()
                    .filter_map(|block| block.text)
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Provider::OpenAi => {
                let body: ChatCompletionResponse = response.json().await.map_err(llm_error)?;
                body.choices
                    .into_iter()
                    .next()
                    .and_then(|c| c.message.content)
                    .ok_or_else(|| AppError::Llm("response contained no choices".into()))?
            }
            Provider::Ollama => {
                let body: OllamaChatResponse = response.json().await.map_err(llm_error)?;
                body.message.content.unwrap_or_default()
            }
        };

        Ok(text)
    }

    async fn complete_stream(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<BoxStream<'static, Result<String>>> {
        let response = self
            .send(self.request(system_prompt, user_prompt, true))
            .await?;
        let provider = self.provider;

        let fragments = lines(Box::pin(response.bytes_stream()))
            .map(move |line| line.and_then(|l| parse_stream_line(provider, &l)))
            .take_while(|line| future::ready(!matches!(line, Ok(StreamLine::Done))))
            .filter_map(|line| {
                future::ready(match line {
                    Ok(StreamLine::Text(text)) => Some(Ok(text)),
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                })
            });

        Ok(fragments.boxed())
    }
}

fn llm_error(e: impl Display) -> AppError {
    AppError::Llm(e.to_string())
}

fn parse_stream_line(provider: Provider, line: &str) -> Result<StreamLine> {
    let payload = match provider {
        Provider::Ollama => line.trim(),
        Provider::Anthropic | Provider::OpenAi => match sse_data(line) {
            Some(data) => data,
            None => return Ok(StreamLine::Skip),
        },
    };

    if payload.is_empty() {
        return Ok(StreamLine::Skip);
    }
    if payload == "[DONE]" {
        return Ok(StreamLine::Done);
    }

    let event: Value = serde_json::from_str(payload).map_err(llm_error)?;

    let error = event.get("error").filter(|e| !e.is_null()).map(|e| {
        e.as_str()
            .or_else(|| e.get("message").and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| e.to_string())
    });
    if let Some(message) = error {
        return Err(AppError::Llm(message));
    }

    let text = match provider {
        Provider::Anthropic => match event["type"].as_str() {
            Some("content_block_delta") => event["delta"]["text"].as_str(),
            Some("message_stop") => return Ok(StreamLine::Done),
            _ => None,
        },
        Provider::OpenAi => event["choices"][0]["delta"]["content"].as_str(),
        Provider::Ollama => {
            let text = event["message"]["content"].as_str().unwrap_or_default();
            if event["done"].as_bool() == Some(true) {
                return Ok(if text.is_empty() {
                    StreamLine::Done
                } else {
                    StreamLine::Text(text.to_string())
                });
            }
            Some(text)
        }
    };

    Ok(match text {
        Some(text) if !text.is_empty() => StreamLine::Text(text.to_string()),
        _ => StreamLine::Skip,
    })
}
