//! # agent-runtime
//!
//! Runtime providers for the FinAI agent.
//!
//! ## Providers
//!
//! - **Groq** (default): OpenAI-compatible chat completions with native tool calling
//! - **Scripted** (feature `scripted`): canned completions for offline runs and tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::GroqProvider;
//!
//! let config = GroqConfig::from_lookup(|key| std::env::var(key).ok())?;
//! let provider = GroqProvider::from_config(config)?;
//! let agent = AgentBuilder::new()
//!     .provider(Arc::new(provider))
//!     .tools(registry)
//!     .build()?;
//! ```

#[cfg(feature = "groq")]
pub mod groq;

#[cfg(feature = "scripted")]
pub mod scripted;

#[cfg(feature = "groq")]
pub use groq::{GroqConfig, GroqProvider};

#[cfg(feature = "scripted")]
pub use scripted::ScriptedProvider;

// Re-export core types for convenience
pub use agent_core::{
    Agent, AgentError, LlmProvider, Message, Result, Role, Session, Tool, ToolRegistry,
};
