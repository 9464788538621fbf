//! Conversation Messages
//!
//! Standard message format used across the agent system, and the
//! append-only conversation that is sent with every completion request.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (injected as context)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// Tool call request emitted by the model
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id, echoed back by the matching tool message
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments exactly as the model produced them (JSON text)
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    /// Create a plain assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::Assistant {
            content: Some(content.into()),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message that requests tool calls
    pub const fn assistant_with_tools(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self::Assistant { content, tool_calls }
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    pub const fn role(&self) -> Role {
        match self {
            Self::System { .. } => Role::System,
            Self::User { .. } => Role::User,
            Self::Assistant { .. } => Role::Assistant,
            Self::Tool { .. } => Role::Tool,
        }
    }

    /// Text content, if any
    pub fn content(&self) -> Option<&str> {
        match self {
            Self::System { content } | Self::User { content } | Self::Tool { content, .. } => {
                Some(content.as_str())
            }
            Self::Assistant { content, .. } => content.as_deref(),
        }
    }

    /// Tool calls carried by an assistant message (empty for other roles)
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Self::Assistant { tool_calls, .. } => tool_calls,
            _ => &[],
        }
    }

    /// Estimate token count (rough approximation)
    pub fn estimate_tokens(&self) -> u32 {
        let arguments: usize = self
            .tool_calls()
            .iter()
            .map(|c| c.name.len() + c.arguments.len())
            .sum();
        // ~4 characters per token is a rough estimate
        let chars = self.content().map_or(0, str::len) + arguments;
        u32::try_from(chars / 4).unwrap_or(u32::MAX).saturating_add(4) // +4 for role overhead
    }
}

/// Append-only conversation history.
///
/// Always starts with exactly one system message. While the latest assistant
/// message has unanswered tool calls, the only thing that may be appended is
/// a tool message answering one of them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,

    /// Ids of tool calls from the last assistant message still awaiting results
    #[serde(default)]
    pending: Vec<String>,
}

impl Conversation {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
            pending: Vec::new(),
        }
    }

    /// Append a message, rejecting anything that would break the history's shape
    pub fn push(&mut self, message: Message) -> Result<()> {
        match &message {
            Message::System { .. } => {
                return Err(AgentError::Conversation(
                    "conversation already has a system prompt".into(),
                ));
            }
            Message::Tool { tool_call_id, .. } => {
                let pos = self
                    .pending
                    .iter()
                    .position(|id| id == tool_call_id)
                    .ok_or_else(|| {
                        AgentError::Conversation(format!(
                            "tool result '{tool_call_id}' does not answer a pending tool call"
                        ))
                    })?;
                self.pending.swap_remove(pos);
            }
            Message::User { .. } | Message::Assistant { .. } => {
                if !self.pending.is_empty() {
                    return Err(AgentError::Conversation(format!(
                        "{} tool call(s) still awaiting results",
                        self.pending.len()
                    )));
                }
                if let Message::Assistant { tool_calls, .. } = &message {
                    self.pending = Self::check_call_ids(tool_calls)?;
                }
            }
        }

        self.messages.push(message);
        Ok(())
    }

    fn check_call_ids(tool_calls: &[ToolCall]) -> Result<Vec<String>> {
        let mut ids: Vec<String> = Vec::with_capacity(tool_calls.len());
        for call in tool_calls {
            if call.id.is_empty() {
                return Err(AgentError::Conversation(format!(
                    "tool call '{}' has no id",
                    call.name
                )));
            }
            if ids.contains(&call.id) {
                return Err(AgentError::Conversation(format!(
                    "duplicate tool call id '{}'",
                    call.id
                )));
            }
            ids.push(call.id.clone());
        }
        Ok(ids)
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Tool call ids that still need a tool message
    pub fn awaiting_tool_results(&self) -> &[String] {
        &self.pending
    }

    /// Estimate total tokens in conversation
    pub fn estimate_tokens(&self) -> u32 {
        self.messages.iter().map(Message::estimate_tokens).sum()
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the system prompt is present from construction
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
