//! Groq LLM Provider
//!
//! Implementation of `LlmProvider` for Groq's OpenAI-compatible Chat
//! Completions API. Any endpoint speaking the same protocol works by
//! pointing `base_url` at it.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, ToolCall},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, ModelInfo, TokenUsage},
    tool::ToolSchema,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Groq's OpenAI-compatible endpoint
pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1";

/// Environment variable holding the API credential
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    /// Null for assistant turns that only call tools
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    r#type: &'static str,
    function: WireFunctionCall<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    arguments: &'a str,
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    r#type: &'static str,
    function: WireFunctionDef<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionDef<'a> {
    name: &'a str,
    description: &'a str,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
    /// Absent, null or a list depending on the server
    #[serde(default)]
    tool_calls: Option<Vec<ResponseToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ResponseToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ResponseFunction,
}

#[derive(Debug, Deserialize)]
struct ResponseFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<WireModel>,
}

#[derive(Debug, Deserialize)]
struct WireModel {
    id: String,
    owned_by: Option<String>,
    context_window: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// Provider
// ============================================================================

/// Groq provider configuration
#[derive(Clone)]
pub struct GroqConfig {
    /// Bearer credential
    pub api_key: String,

    /// API base URL, without trailing slash
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl std::fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl GroqConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GROQ_API_URL.into(),
            timeout_secs: 120,
        }
    }

    /// Read `GROQ_API_KEY`, `GROQ_BASE_URL` and `GROQ_TIMEOUT_SECS` from any
    /// key/value source; the API key must be present and non-blank
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(API_KEY_VAR)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                AgentError::Config(format!("{API_KEY_VAR} environment variable is required"))
            })?;

        let mut config = Self::new(api_key);
        if let Some(url) = lookup("GROQ_BASE_URL").filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(secs) = lookup("GROQ_TIMEOUT_SECS") {
            config.timeout_secs = secs.trim().parse().map_err(|_| {
                AgentError::Config(format!("GROQ_TIMEOUT_SECS must be a whole number, got '{secs}'"))
            })?;
        }
        Ok(config)
    }
}

/// Groq LLM provider
pub struct GroqProvider {
    client: Client,
    config: GroqConfig,
}

impl GroqProvider {
    /// Create from configuration
    pub fn from_config(config: GroqConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Convert agent messages to the wire format
    fn convert_messages(messages: &[Message]) -> Vec<WireMessage<'_>> {
        messages
            .iter()
            .map(|m| match m {
                Message::System { content } => WireMessage {
                    role: "system",
                    content: Some(content.as_str()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                Message::User { content } => WireMessage {
                    role: "user",
                    content: Some(content.as_str()),
                    tool_calls: None,
                    tool_call_id: None,
                },
                Message::Assistant { content, tool_calls } => WireMessage {
                    role: "assistant",
                    content: content.as_deref(),
                    tool_calls: (!tool_calls.is_empty()).then(|| {
                        tool_calls
                            .iter()
                            .map(|c| WireToolCall {
                                id: &c.id,
                                r#type: "function",
                                function: WireFunctionCall {
                                    name: &c.name,
                                    arguments: &c.arguments,
                                },
                            })
                            .collect()
                    }),
                    tool_call_id: None,
                },
                Message::Tool { content, tool_call_id } => WireMessage {
                    role: "tool",
                    content: Some(content.as_str()),
                    tool_calls: None,
                    tool_call_id: Some(tool_call_id.as_str()),
                },
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolSchema]) -> Vec<WireTool<'_>> {
        tools
            .iter()
            .map(|t| WireTool {
                r#type: "function",
                function: WireFunctionDef {
                    name: &t.name,
                    description: &t.description,
                    parameters: t.json_schema(),
                },
            })
            .collect()
    }

    /// Convert the wire response to an agent completion
    fn convert_completion(response: ChatResponse, requested_model: &str) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Parse("response contained no choices".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| {
                ToolCall::new(
                    c.id.unwrap_or_default(),
                    c.function.name,
                    c.function.arguments.unwrap_or_default(),
                )
            })
            .collect();

        Ok(Completion {
            content: choice.message.content,
            tool_calls,
            model: if response.model.is_empty() {
                requested_model.to_string()
            } else {
                response.model
            },
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
        })
    }

    /// Map a non-success HTTP status onto the error taxonomy
    fn classify_status(status: StatusCode, body: &str) -> AgentError {
        let detail = serde_json::from_str::<ErrorEnvelope>(body)
            .map_or_else(|_| body.to_string(), |e| e.error.message);
        let detail = format!("{status}: {detail}");

        match status.as_u16() {
            401 | 403 => AgentError::Auth(detail),
            429 => AgentError::RateLimited(detail),
            500..=599 => AgentError::ProviderUnavailable(detail),
            _ => AgentError::Provider(detail),
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Self::classify_status(status, &body))
    }
}

#[async_trait]
impl LlmProvider for GroqProvider {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let request = ChatRequest {
            model: &options.model,
            messages: Self::convert_messages(messages),
            tools: Self::convert_tools(tools),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            top_p: options.top_p,
        };

        tracing::debug!(model = %options.model, messages = messages.len(), "Groq request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(format!("request failed: {e}")))?;

        let response: ChatResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("failed to parse completion: {e}")))?;

        Self::convert_completion(response, &options.model)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let response = self
            .client
            .get(format!("{}/models", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let models: ModelList = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("failed to parse model list: {e}")))?;

        Ok(models
            .data
            .into_iter()
            .map(|m| ModelInfo {
                id: m.id,
                owned_by: m.owned_by,
                context_length: m.context_window,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use agent_core::tool::ParameterSchema;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = GroqConfig::from_lookup(lookup(&[("GROQ_API_KEY", "gsk-test")])).unwrap();
        assert_eq!(config.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(config.timeout_secs, 120);
    }

    #[test]
    fn test_config_requires_key() {
        assert!(matches!(
            GroqConfig::from_lookup(lookup(&[])),
            Err(AgentError::Config(_))
        ));
        assert!(GroqConfig::from_lookup(lookup(&[("GROQ_API_KEY", "  ")])).is_err());
    }

    #[test]
    fn test_config_overrides() {
        let config = GroqConfig::from_lookup(lookup(&[
            ("GROQ_API_KEY", "k"),
            ("GROQ_BASE_URL", "http://localhost:8080/v1/"),
            ("GROQ_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.timeout_secs, 15);

        assert!(GroqConfig::from_lookup(lookup(&[
            ("GROQ_API_KEY", "k"),
            ("GROQ_TIMEOUT_SECS", "soon"),
        ]))
        .is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let config = GroqConfig::new("gsk-very-secret");
        assert!(!format!("{config:?}").contains("gsk-very-secret"));
    }

    #[test]
    fn test_message_conversion() {
        let messages = vec![
            Message::system("You are FinAI."),
            Message::user("I got my salary of 50000"),
            Message::assistant_with_tools(
                None,
                vec![ToolCall::new("call_1", "addIncome", r#"{"name":"Salary","amount":50000}"#)],
            ),
            Message::tool("Added income: Salary - 50000 INR to the database.", "call_1"),
        ];

        let converted = GroqProvider::convert_messages(&messages);
        let json = serde_json::to_value(&converted).unwrap();

        assert_eq!(json[0]["role"], "system");
        assert_eq!(json[2]["role"], "assistant");
        assert!(json[2]["content"].is_null());
        assert_eq!(json[2]["tool_calls"][0]["type"], "function");
        assert_eq!(json[2]["tool_calls"][0]["function"]["name"], "addIncome");
        assert_eq!(json[3]["role"], "tool");
        assert_eq!(json[3]["tool_call_id"], "call_1");
        assert!(json[1].get("tool_calls").is_none());
    }

    #[test]
    fn test_tool_conversion() {
        let schema = ToolSchema {
            name: "addExpense".into(),
            description: "Add new expense entry".into(),
            parameters: vec![ParameterSchema::required("amount", "number", "Amount")],
            category: None,
            has_side_effects: true,
        };
        let tools = [schema];
        let json = serde_json::to_value(GroqProvider::convert_tools(&tools)).unwrap();
        assert_eq!(json[0]["type"], "function");
        assert_eq!(json[0]["function"]["parameters"]["required"][0], "amount");
    }

    #[test]
    fn test_response_with_tool_calls() {
        let body = r#"{
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [
                        {"id": "call_a", "type": "function",
                         "function": {"name": "addExpense", "arguments": "{\"name\":\"Rent\",\"amount\":100}"}},
                        {"id": "call_b", "type": "function",
                         "function": {"name": "getMoneyBalance", "arguments": "{}"}}
                    ]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        let completion = GroqProvider::convert_completion(response, "fallback").unwrap();

        assert!(completion.content.is_none());
        assert_eq!(completion.tool_calls.len(), 2);
        assert_eq!(completion.tool_calls[1].id, "call_b");
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(completion.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn test_response_with_null_tool_calls() {
        let body = r#"{
            "model": "llama-3.3-70b-versatile",
            "choices": [{
                "message": {"role": "assistant", "content": "Your balance is 50000 INR.", "tool_calls": null},
                "finish_reason": "stop"
            }]
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        let completion = GroqProvider::convert_completion(response, "fallback").unwrap();

        assert_eq!(completion.content.as_deref(), Some("Your balance is 50000 INR."));
        assert!(!completion.has_tool_calls());
        assert_eq!(completion.finish_reason, Some(FinishReason::Stop));
        assert!(completion.usage.is_none());
    }

    #[test]
    fn test_tool_call_with_null_id_and_arguments() {
        let body = r#"{
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [
                        {"id": null, "type": "function",
                         "function": {"name": "getMoneyBalance", "arguments": null}}
                    ]
                },
                "finish_reason": "tool_calls"
            }]
        }"#;
        let response: ChatResponse = serde_json::from_str(body).unwrap();
        let completion = GroqProvider::convert_completion(response, "fallback").unwrap();

        assert_eq!(completion.model, "fallback");
        assert_eq!(completion.tool_calls[0].id, "");
        assert_eq!(completion.tool_calls[0].arguments, "");
    }

    #[test]
    fn test_response_without_choices() {
        let response: ChatResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(
            GroqProvider::convert_completion(response, "m"),
            Err(AgentError::Parse(_))
        ));
    }

    #[test]
    fn test_status_classification() {
        let body = r#"{"error": {"message": "Invalid API Key", "type": "invalid_request_error"}}"#;
        let err = GroqProvider::classify_status(StatusCode::UNAUTHORIZED, body);
        assert!(matches!(err, AgentError::Auth(ref m) if m.contains("Invalid API Key")));

        assert!(matches!(
            GroqProvider::classify_status(StatusCode::TOO_MANY_REQUESTS, ""),
            AgentError::RateLimited(_)
        ));
        assert!(matches!(
            GroqProvider::classify_status(StatusCode::BAD_GATEWAY, "upstream"),
            AgentError::ProviderUnavailable(_)
        ));
        assert!(matches!(
            GroqProvider::classify_status(StatusCode::BAD_REQUEST, "nope"),
            AgentError::Provider(_)
        ));
    }
}
