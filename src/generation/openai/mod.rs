//! OpenAI-compatible chat-completions client.
//!
//! Invariants:
//! - request path is `POST <base_url>/chat/completions`
//! - `Authorization: Bearer <key>` is sent only when a key is configured
//! - JSON capabilities (branch, score) request `response_format: json_object`
//!   and still accept replies wrapped in a markdown fence
//! - at most one tool round trip per call

mod prompts;
mod settings;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::tools::ToolRegistry;
use super::{GenerationError, GenerationService, Result, ScoreReport};
use crate::analysis::SelectionSummary;
use crate::conversation::{preview, Message};

pub use prompts::{extract_json, transcript};
pub use settings::{load_dotenv_if_present, parse_dotenv, LlmSettings};

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: Value,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ToolCallFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    id: String,
    function: ToolCallFunction,
}

/// [`GenerationService`] backed by a chat-completions endpoint
pub struct OpenAiService {
    settings: LlmSettings,
    client: reqwest::Client,
    tools: ToolRegistry,
}

impl OpenAiService {
    /// Build the HTTP client for `settings`
    pub fn new(settings: LlmSettings) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = &settings.api_key {
            let hv = reqwest::header::HeaderValue::from_str(&format!("Bearer {key}"))
                .map_err(|e| GenerationError::Transport(format!("invalid Authorization header: {e}")))?;
            headers.insert(reqwest::header::AUTHORIZATION, hv);
        }
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| GenerationError::Transport(format!("http client build: {e}")))?;
        Ok(Self { settings, client, tools: ToolRegistry::new() })
    }

    /// Attach tools the model may call
    ///
    /// The `colloquy` binary registers none; embedders that own tools wire
    /// them in here.
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn settings(&self) -> &LlmSettings {
        &self.settings
    }

    async fn post(&self, payload: &Value) -> Result<Value> {
        let url = format!("{}/chat/completions", self.settings.base_url);
        let resp = self.client.post(url).json(payload).send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout(self.settings.timeout)
            } else {
                GenerationError::Transport(format!("http request failed: {e}"))
            }
        })?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GenerationError::Transport(format!("http body read: {e}")))?;
        if !status.is_success() {
            return Err(GenerationError::Status { status: status.as_u16(), body: preview(&body, 500) });
        }
        serde_json::from_str(&body).map_err(|e| GenerationError::InvalidResponse(format!("http json decode: {e}")))
    }

    fn payload(&self, messages: &[Value], json_mode: bool, max_tokens: Option<u32>, with_tools: bool) -> Value {
        let mut payload = json!({
            "model": self.settings.model,
            "messages": messages,
            "temperature": self.settings.temperature,
        });
        if json_mode {
            payload["response_format"] = json!({"type": "json_object"});
        }
        if let Some(n) = max_tokens {
            payload["max_tokens"] = json!(n);
        }
        if with_tools && !self.tools.is_empty() {
            payload["tools"] = Value::Array(self.tools.schemas());
        }
        payload
    }

    /// One chat completion, resolving a single round of tool calls
    async fn chat(&self, messages: Vec<Value>, json_mode: bool, max_tokens: Option<u32>) -> Result<String> {
        debug!(
            model = %self.settings.model,
            message_count = messages.len(),
            json_mode,
            "chat completion request"
        );
        let raw = self.post(&self.payload(&messages, json_mode, max_tokens, true)).await?;
        let message = first_message(&raw)?;

        let calls = tool_calls(&message)?;
        if calls.is_empty() {
            return message_content(&message);
        }

        info!(tool_call_count = calls.len(), "resolving tool calls");
        let mut full = messages;
        full.push(message);
        for call in calls {
            let content = match self.tools.invoke(&call.function.name, &call.function.arguments).await {
                Ok(value) => value.to_string(),
                Err(err) => json!({"error": err.to_string()}).to_string(),
            };
            full.push(json!({
                "role": "tool",
                "tool_call_id": call.id,
                "name": call.function.name,
                "content": content,
            }));
        }

        let raw = self.post(&self.payload(&full, json_mode, max_tokens, false)).await?;
        message_content(&first_message(&raw)?)
    }
}

impl std::fmt::Debug for OpenAiService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiService")
            .field("settings", &self.settings)
            .field("tools", &self.tools)
            .finish()
    }
}

fn wire(message: &Message) -> Value {
    json!({"role": message.role.as_str(), "content": message.content})
}

fn system(content: String) -> Value {
    json!({"role": "system", "content": content})
}

fn with_system(prompt: String, conversation: &[Message]) -> Vec<Value> {
    std::iter::once(system(prompt)).chain(conversation.iter().map(wire)).collect()
}

fn first_message(raw: &Value) -> Result<Value> {
    let parsed: ChatCompletionResponse = serde_json::from_value(raw.clone())
        .map_err(|e| GenerationError::InvalidResponse(format!("invalid chat response: {e}")))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message)
        .filter(Value::is_object)
        .ok_or_else(|| GenerationError::InvalidResponse("missing choices[0].message".to_string()))
}

fn tool_calls(message: &Value) -> Result<Vec<ToolCall>> {
    match message.get("tool_calls") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(calls) => serde_json::from_value(calls.clone())
            .map_err(|e| GenerationError::InvalidResponse(format!("invalid tool_calls: {e}"))),
    }
}

fn message_content(message: &Value) -> Result<String> {
    let content = message.get("content").and_then(Value::as_str).unwrap_or("").trim();
    if content.is_empty() {
        return Err(GenerationError::InvalidResponse("empty message content".to_string()));
    }
    Ok(content.to_string())
}

#[async_trait]
impl GenerationService for OpenAiService {
    async fn generate_branch(
        &self,
        conversation: &[Message],
        existing_responses: &[String],
        goal: Option<&str>,
        max_tokens: u32,
    ) -> Result<String> {
        let messages = with_system(prompts::branch_prompt(existing_responses, goal), conversation);
        let text = self.chat(messages, true, Some(max_tokens)).await?;
        prompts::parse_branch(&text)
    }

    async fn generate_reaction(&self, conversation: &[Message], goal: Option<&str>) -> Result<String> {
        let messages = vec![
            system(prompts::reaction_prompt(goal)),
            json!({"role": "user", "content": transcript(conversation)}),
        ];
        self.chat(messages, false, None).await
    }

    async fn generate_continuation(&self, conversation: &[Message], max_tokens: u32) -> Result<String> {
        let messages = with_system(prompts::continuation_prompt(), conversation);
        self.chat(messages, false, Some(max_tokens)).await
    }

    async fn score(&self, conversation: &[Message], goal: Option<&str>) -> Result<ScoreReport> {
        let messages = vec![
            system(prompts::scoring_prompt(goal)),
            json!({"role": "user", "content": transcript(conversation)}),
        ];
        let text = self.chat(messages, true, None).await?;
        parse_score(&text)
    }

    async fn explain_selection(
        &self,
        conversation: &[Message],
        summary: &SelectionSummary,
        goal: Option<&str>,
        max_tokens: u32,
    ) -> Result<String> {
        let messages = with_system(prompts::explanation_prompt(summary, goal), conversation);
        self.chat(messages, false, Some(max_tokens.saturating_mul(2))).await
    }
}

/// Read metric maps, ignoring non-numeric entries
fn parse_score(text: &str) -> Result<ScoreReport> {
    let value = extract_json(text)?;
    let numeric = |key: &str| {
        value
            .get(key)
            .and_then(Value::as_object)
            .map(|m| m.iter().filter_map(|(k, v)| v.as_f64().map(|f| (k.clone(), f))).collect())
            .unwrap_or_default()
    };
    Ok(ScoreReport { general: numeric("general_metrics"), goal: numeric("goal_metrics") })
}
