//! # agent-core
//!
//! Core agent logic with provider-agnostic LLM abstraction and extensible tool system.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Agent                                 │
//! │  ┌─────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  Reasoning  │  │    Tools    │  │   LlmProvider       │  │
//! │  │    Loop     │──│   Registry  │──│   (Strategy)        │  │
//! │  └──────┬──────┘  └─────────────┘  └─────────────────────┘  │
//! │         │                                                    │
//! │  ┌──────┴──────────────────────┐                             │
//! │  │ Conversation (append-only)  │                             │
//! │  └─────────────────────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` trait enables swapping between Groq, OpenAI, local
//! servers, or a scripted provider without changing agent logic.

pub mod provider;
pub mod tool;
pub mod reasoning;
pub mod message;
pub mod error;
pub mod session;

pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role, ToolCall};
pub use provider::{Completion, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, TurnOutcome};
pub use session::{Session, SessionId};
pub use tool::{ParameterSchema, Tool, ToolRegistry, ToolResult, ToolSchema, parse_arguments};
