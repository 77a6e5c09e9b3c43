//! Explicit registry of tools the model may call.
//!
//! Tools are registered by name once, when the client is configured. The
//! client advertises [`ToolRegistry::schemas`] with each request and routes
//! returned tool calls through [`ToolRegistry::invoke`].

use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::{GenerationError, Result};

/// Async tool implementation: parsed JSON arguments in, JSON result out
pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, std::result::Result<Value, String>> + Send + Sync>;

/// A tool's advertised description
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the argument object
    pub parameters: Value,
}

impl ToolDefinition {
    /// OpenAI `tools[]` entry for this definition
    pub fn to_schema(&self) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
            }
        })
    }
}

struct RegisteredTool {
    definition: ToolDefinition,
    handler: ToolHandler,
}

/// Name-to-handler map built at configuration time
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register<F, Fut>(mut self, definition: ToolDefinition, handler: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = std::result::Result<Value, String>> + Send + 'static,
    {
        let handler: ToolHandler = Arc::new(move |args| Box::pin(handler(args)));
        self.tools.insert(definition.name.clone(), RegisteredTool { definition, handler });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Registered tool names in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Schemas of every registered tool
    pub fn schemas(&self) -> Vec<Value> {
        self.tools.values().map(|t| t.definition.to_schema()).collect()
    }

    /// Run the named tool with raw JSON-encoded arguments
    pub async fn invoke(&self, name: &str, arguments: &str) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| GenerationError::Tool(format!("tool '{name}' is not registered")))?;

        let args: Value = if arguments.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(arguments)
                .map_err(|e| GenerationError::Tool(format!("invalid arguments for '{name}': {e}")))?
        };

        debug!(tool = name, "invoking tool");
        (tool.handler)(args)
            .await
            .map_err(|e| GenerationError::Tool(format!("'{name}' failed: {e}")))
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry").field("tools", &self.names()).finish()
    }
}
