//! Chat model bridge: the planning oracle behind the orchestrator.
//!
//! [`ChatModel`] abstracts one chat-completion turn with tool definitions attached.
//! [`OpenAiChatModel`] speaks the OpenAI-compatible `/chat/completions` wire format with
//! function calling. Whatever the model returns is treated as untrusted: tool arguments are
//! checked by the tool registry, the final answer by the validator.

use crate::config::AgentConfig;
use crate::error::{DiagnoseError, DiagnoseResult};
use crate::orchestrator::traits::ToolSpec;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A function call requested by the model. `arguments` is the raw JSON text the model wrote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.to_string(),
            },
        }
    }
}

/// One message in the conversation, in OpenAI wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(Role::Assistant, content)
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: None,
            tool_calls,
            tool_call_id: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// One chat-completion turn. Implementations decide which tools to call; callers never
/// trust the answer for structure.
#[async_trait::async_trait]
pub trait ChatModel: Send + Sync {
    /// Model identifier, for logs and health output.
    fn model_name(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> DiagnoseResult<ChatMessage>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<serde_json::Value>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// OpenAI-compatible chat completion client with function calling.
pub struct OpenAiChatModel {
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    json_mode: bool,
    client: reqwest::Client,
}

impl OpenAiChatModel {
    /// Build from config. Fails when no API key is configured.
    pub fn from_config(config: &AgentConfig) -> DiagnoseResult<Self> {
        let api_key = config.require_api_key()?.to_string();
        let client = reqwest::Client::builder()
            .timeout(config.chat_timeout())
            .build()
            .map_err(|e| DiagnoseError::Config(format!("HTTP client build failed: {}", e)))?;
        Ok(Self {
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.chat_model.clone(),
            temperature: config.temperature,
            json_mode: config.json_mode,
            client,
        })
    }

    fn request_body<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        tools: &[ToolSpec],
    ) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages,
            tools: tools.iter().map(ToolSpec::to_openai_function).collect(),
            temperature: self.temperature,
            response_format: self
                .json_mode
                .then(|| serde_json::json!({ "type": "json_object" })),
        }
    }
}

#[async_trait::async_trait]
impl ChatModel for OpenAiChatModel {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> DiagnoseResult<ChatMessage> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(messages, tools);
        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "chat completion request");

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| DiagnoseError::Model(format!("chat request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(DiagnoseError::Model(format!("chat API error {}: {}", status, body)));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| DiagnoseError::Model(format!("chat response parse failed: {}", e)))?;
        first_message(parsed)
    }
}

fn first_message(parsed: ChatResponse) -> DiagnoseResult<ChatMessage> {
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .ok_or_else(|| DiagnoseError::Model("chat response had no choices".to_string()))
}
