use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

use super::types::{Completion, CompletionRequest, ToolCall, ToolChoice};
use super::{ChatCompletion, LlmError};

/// Configuration for LlmClient loaded from environment variables
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub base_url: String, // e.g., https://api.openai.com/v1
    pub model: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            base_url: std::env::var("SKYCAST_LLM_BASE_URL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            model: std::env::var("SKYCAST_LLM_MODEL")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
            api_key: std::env::var("SKYCAST_LLM_API_KEY")
                .ok()
                .filter(|s| !s.is_empty()),
            request_timeout_ms: std::env::var("SKYCAST_LLM_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(30_000),
            temperature: std::env::var("SKYCAST_LLM_TEMPERATURE")
                .ok()
                .and_then(|v| v.parse::<f32>().ok())
                .unwrap_or(0.7),
            max_tokens: std::env::var("SKYCAST_LLM_MAX_TOKENS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(1024),
        }
    }
}

/// HTTP client for an OpenAI-compatible chat/completions endpoint
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    cfg: LlmClientConfig,
}

impl LlmClient {
    pub fn new(cfg: LlmClientConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.request_timeout_ms))
            .build()?;
        Ok(Self { http, cfg })
    }

    pub fn from_env() -> Result<Self, LlmError> {
        Self::new(LlmClientConfig::default())
    }

    pub fn config(&self) -> &LlmClientConfig {
        &self.cfg
    }
}

#[async_trait]
impl ChatCompletion for LlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let url = format!(
            "{}/chat/completions",
            self.cfg.base_url.trim_end_matches('/')
        );
        debug!(
            target: "llm_client",
            messages = request.messages.len(),
            tools = request.tools.len(),
            "POST {}", url
        );

        let mut body = json!({
            "model": self.cfg.model,
            "messages": request.messages,
            "temperature": self.cfg.temperature,
            "max_tokens": self.cfg.max_tokens,
        });
        if !request.tools.is_empty() && request.tool_choice != ToolChoice::None {
            body["tools"] = Value::Array(request.tools.clone());
            body["tool_choice"] = json!(request.tool_choice);
        }

        let mut req = self.http.post(&url).header("content-type", "application/json");
        if let Some(key) = &self.cfg.api_key {
            req = req.bearer_auth(key);
        }

        let resp = req.json(&body).send().await?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            error!(target: "llm_client", %status, body = %text, "Chat Completions error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let val: Value = resp
            .json()
            .await
            .map_err(|e| LlmError::MalformedResponse(format!("not JSON: {e}")))?;
        parse_completion(&val)
    }
}

/// Normalize the provider's single choice into text plus tool calls.
/// Public so tests can feed captured payloads through it.
pub fn parse_completion(v: &Value) -> Result<Completion, LlmError> {
    let message = v
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| LlmError::MalformedResponse("missing choices[0].message".to_string()))?;

    let text = message
        .get("content")
        .and_then(|c| c.as_str())
        .unwrap_or_default()
        .to_string();

    Ok(Completion {
        text,
        tool_calls: parse_tool_calls(message),
    })
}

/// Extract tool calls from an assistant message value. Arguments may arrive
/// as a JSON-encoded string or an inline object; both normalize to the
/// encoded string form.
pub fn parse_tool_calls(message: &Value) -> Vec<ToolCall> {
    let mut calls = Vec::new();
    if let Some(arr) = message.get("tool_calls").and_then(|x| x.as_array()) {
        for tc in arr {
            let id = tc
                .get("id")
                .and_then(|x| x.as_str())
                .unwrap_or_default()
                .to_string();
            if let Some(func) = tc.get("function") {
                let name = func
                    .get("name")
                    .and_then(|n| n.as_str())
                    .unwrap_or("")
                    .to_string();
                let arguments = match func.get("arguments") {
                    Some(Value::String(s)) => s.clone(),
                    Some(v) => v.to_string(),
                    None => "{}".to_string(),
                };
                if !name.is_empty() {
                    calls.push(ToolCall::new(id, name, arguments));
                }
            }
        }
    }
    calls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_text_choice() {
        let v = json!({
            "choices": [{"message": {"content": "Sunny all week."}}]
        });
        let completion = parse_completion(&v).unwrap();
        assert_eq!(completion.text, "Sunny all week.");
        assert!(completion.tool_calls.is_empty());
    }

    #[test]
    fn parses_tool_calls_with_string_arguments() {
        let v = json!({
            "choices": [{"message": {
                "content": null,
                "tool_calls": [
                    {"id": "call_1", "type": "function",
                     "function": {"name": "get_weather_data_by_date",
                                  "arguments": "{\"date\":\"2024-01-01\"}"}}
                ]
            }}]
        });
        let completion = parse_completion(&v).unwrap();
        assert_eq!(completion.text, "");
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].id, "call_1");
        assert_eq!(completion.tool_calls[0].function.name, "get_weather_data_by_date");
        let args: Value =
            serde_json::from_str(&completion.tool_calls[0].function.arguments).unwrap();
        assert_eq!(args["date"], "2024-01-01");
    }

    #[test]
    fn normalizes_inline_object_arguments() {
        let message = json!({
            "tool_calls": [
                {"id": "call_2", "type": "function",
                 "function": {"name": "get_weather_data", "arguments": {"limit": 5}}}
            ]
        });
        let calls = parse_tool_calls(&message);
        assert_eq!(calls.len(), 1);
        let args: Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(args["limit"], 5);
    }

    #[test]
    fn missing_choice_is_an_error() {
        let v = json!({"choices": []});
        assert!(parse_completion(&v).is_err());
    }
}
