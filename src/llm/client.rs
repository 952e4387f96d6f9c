use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

use crate::config::{AgentConfig, DEFAULT_BASE_URL};

#[derive(Error, Debug)]
pub enum LLMError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },
    #[error("Response parsing error: {0}")]
    ParseError(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

#[derive(Debug, Clone)]
pub struct LLMConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.3-70b-versatile".to_string(),
            temperature: 0.4,
            max_tokens: Some(1024),
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

impl LLMConfig {
    pub fn for_agent(agent: &AgentConfig) -> Self {
        let mut config = Self::default();
        if let Some(model) = &agent.model {
            config.model = model.clone();
        }
        config
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    pub content: String,
    pub usage: Option<Usage>,
    pub model: String,
    pub finish_reason: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// OpenAI-compatible chat completions client, Groq by default
pub struct GroqLLM {
    client: Client,
    api_key: String,
    base_url: String,
    config: LLMConfig,
}

impl GroqLLM {
    pub fn new(api_key: String) -> Result<Self, LLMError> {
        Self::with_config(api_key, DEFAULT_BASE_URL, LLMConfig::default())
    }

    pub fn with_config(
        api_key: String,
        base_url: &str,
        config: LLMConfig,
    ) -> Result<Self, LLMError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60)) // LLM calls can be slow
            .build()
            .map_err(|e| LLMError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Generate a completion from messages
    pub async fn complete(&self, messages: Vec<Message>) -> Result<LLMResponse, LLMError> {
        self.complete_with_tools(messages, &self.config, &[]).await
    }

    /// Generate a completion with tools
    pub async fn complete_with_tools(
        &self,
        messages: Vec<Message>,
        config: &LLMConfig,
        tools: &[Value],
    ) -> Result<LLMResponse, LLMError> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = build_payload(&messages, config, tools);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LLMError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let response_text = response.text().await?;
        parse_response(&response_text, &config.model)
    }

    /// Get available models
    pub async fn get_models(&self) -> Result<Vec<String>, LLMError> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(LLMError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let response_text = response.text().await?;
        let json: Value = serde_json::from_str(&response_text)
            .map_err(|e| LLMError::ParseError(format!("Invalid JSON: {}", e)))?;

        let models = json["data"]
            .as_array()
            .ok_or_else(|| LLMError::ParseError("Missing 'data' field".to_string()))?
            .iter()
            .filter_map(|model| model["id"].as_str().map(|s| s.to_string()))
            .collect();

        Ok(models)
    }
}

/// Request body for `/chat/completions`
pub fn build_payload(messages: &[Message], config: &LLMConfig, tools: &[Value]) -> Value {
    let mut payload = json!({
        "model": config.model,
        "messages": messages,
        "temperature": config.temperature,
        "top_p": config.top_p,
        "frequency_penalty": config.frequency_penalty,
        "presence_penalty": config.presence_penalty,
        "stream": false
    });

    if let Some(max_tokens) = config.max_tokens {
        payload["max_tokens"] = json!(max_tokens);
    }

    if !tools.is_empty() {
        payload["tools"] = json!(tools);
        payload["tool_choice"] = json!("auto");
    }

    payload
}

/// Parse a chat completion response body
pub fn parse_response(response_text: &str, default_model: &str) -> Result<LLMResponse, LLMError> {
    let json: Value = serde_json::from_str(response_text)
        .map_err(|e| LLMError::ParseError(format!("Invalid JSON: {}", e)))?;

    let choices = json["choices"]
        .as_array()
        .ok_or_else(|| LLMError::ParseError("Missing 'choices' field".to_string()))?;

    let first_choice = choices
        .first()
        .ok_or_else(|| LLMError::ParseError("Empty choices array".to_string()))?;
    let message = &first_choice["message"];

    let content = message["content"]
        .as_str()
        .unwrap_or("") // Content can be null when tool calls are made
        .to_string();

    let finish_reason = first_choice["finish_reason"]
        .as_str()
        .map(|s| s.to_string());

    let model = json["model"].as_str().unwrap_or(default_model).to_string();

    let usage = json.get("usage").map(|usage_json| Usage {
        prompt_tokens: usage_json["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: usage_json["completion_tokens"].as_u64().unwrap_or(0) as u32,
        total_tokens: usage_json["total_tokens"].as_u64().unwrap_or(0) as u32,
    });

    let mut tool_calls = Vec::new();
    if let Some(tool_calls_array) = message.get("tool_calls").and_then(|v| v.as_array()) {
        for tool_call_json in tool_calls_array {
            if let (Some(id), Some(name), Some(function)) = (
                tool_call_json["id"].as_str(),
                tool_call_json["function"]["name"].as_str(),
                tool_call_json["function"]["arguments"].as_str(),
            ) {
                // Some models send "" for tools without parameters
                let arguments: Value = if function.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(function).map_err(|e| {
                        LLMError::ParseError(format!("Invalid tool call arguments: {}", e))
                    })?
                };

                tool_calls.push(ToolCall {
                    id: id.to_string(),
                    name: name.to_string(),
                    arguments,
                });
            }
        }
    }

    Ok(LLMResponse {
        content,
        usage,
        model,
        finish_reason,
        tool_calls,
    })
}

#[async_trait::async_trait]
pub trait LLMClient: Send + Sync {
    async fn complete_with_internal_tools(
        &self,
        messages: Vec<Message>,
        tools: &[serde_json::Value],
    ) -> Result<LLMResponse, LLMError>;
}

#[async_trait::async_trait]
impl LLMClient for GroqLLM {
    async fn complete_with_internal_tools(
        &self,
        messages: Vec<Message>,
        tools: &[serde_json::Value],
    ) -> Result<LLMResponse, LLMError> {
        self.complete_with_tools(messages, &self.config, tools).await
    }
}
