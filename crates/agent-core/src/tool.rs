//! Tool System
//!
//! Extensible tool framework for agent capabilities.
//! Tools are registered up front and invoked by the reasoning loop. Every
//! failure on the way to a tool (unknown name, malformed JSON, bad
//! arguments) comes back as a failed [`ToolResult`], never as an error, so
//! the model can read it and explain it.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::error::{AgentError, Result};
use crate::message::ToolCall;

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call ID the result answers
    pub id: Option<String>,

    /// Whether execution succeeded
    pub success: bool,

    /// Text handed back to the model
    pub output: String,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: true,
            output: output.into(),
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            success: false,
            output: error.into(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
        }
    }

    pub fn optional(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Category for grouping
    #[serde(default)]
    pub category: Option<String>,

    /// Whether tool has side effects
    #[serde(default)]
    pub has_side_effects: bool,
}

impl ToolSchema {
    /// Names of the parameters the model must supply
    pub fn required_parameters(&self) -> BTreeSet<&str> {
        self.parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect()
    }

    /// JSON Schema object describing the parameters
    pub fn json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    serde_json::json!({
                        "type": p.param_type,
                        "description": p.description,
                    }),
                )
            })
            .collect();

        let mut schema = serde_json::json!({
            "type": "object",
            "properties": properties,
        });
        let required = self.required_parameters();
        if !required.is_empty() {
            schema["required"] = Value::Array(required.into_iter().map(Value::from).collect());
        }
        schema
    }

    fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AgentError::ToolRegistration("tool name is empty".into()));
        }
        let mut seen = BTreeSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(AgentError::ToolRegistration(format!(
                    "{}: parameter '{}' declared twice",
                    self.name, param.name
                )));
            }
        }
        Ok(())
    }
}

/// Deserialize tool arguments into a typed argument struct
pub fn parse_arguments<T: DeserializeOwned>(args: &Value) -> Result<T> {
    let args = if args.is_null() {
        Value::Object(Map::new())
    } else {
        args.clone()
    };
    serde_json::from_value(args).map_err(|e| AgentError::ToolValidation(e.to_string()))
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with parsed arguments
    async fn execute(&self, args: &Value) -> Result<ToolResult>;

    /// Structural check before execution. Field-level rules belong to the
    /// tool itself, which reports them in its own words.
    fn validate(&self, args: &Value) -> Result<()> {
        if args.is_object() || args.is_null() {
            Ok(())
        } else {
            Err(AgentError::ToolValidation(
                "arguments must be a JSON object".into(),
            ))
        }
    }
}

/// Registry for available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    schemas: Vec<ToolSchema>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_boxed(Arc::new(tool))
    }

    /// Register a shared tool, checking its signature first
    pub fn register_boxed(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let schema = tool.schema();
        schema.check()?;
        if self.tools.contains_key(&schema.name) {
            return Err(AgentError::ToolRegistration(format!(
                "tool '{}' is already registered",
                schema.name
            )));
        }
        self.tools.insert(schema.name.clone(), tool);
        self.schemas.push(schema);
        Ok(())
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Execute a tool call. Never fails; problems become a failed result.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.try_execute(&call.name, &call.arguments).await {
            Ok(result) => result.with_id(&call.id),
            Err(e) => {
                tracing::warn!(tool = %call.name, id = %call.id, error = %e, "Tool call failed");
                ToolResult::failure(
                    &call.name,
                    format!("Error: Failed to execute {}: {e}", call.name),
                )
                .with_id(&call.id)
            }
        }
    }

    /// Execute by name with raw JSON argument text and return the text result
    pub async fn execute_raw(&self, name: &str, raw_arguments: &str) -> String {
        let call = ToolCall::new(String::new(), name, raw_arguments);
        self.execute(&call).await.output
    }

    async fn try_execute(&self, name: &str, raw_arguments: &str) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        let args: Value = if raw_arguments.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(raw_arguments)
                .map_err(|e| AgentError::ToolValidation(format!("malformed arguments: {e}")))?
        };

        tool.validate(&args)?;
        tool.execute(&args).await
    }

    /// All tool schemas, in registration order
    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    /// Get tool names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.schemas.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
