//! Reasoning Loop
//!
//! Drives one user turn: ask the model, run any tools it requests, feed the
//! results back, and repeat until it answers in plain text.
//!
//! Ordering within a round is strict: the assistant message is appended,
//! then every tool runs (ledger writes included) and its result message is
//! appended, and only then is the next completion requested.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message, ToolCall};
use crate::provider::{Completion, GenerationOptions, LlmProvider};
use crate::tool::ToolRegistry;

/// Shown to the user when a turn cannot be completed
pub const DEFAULT_APOLOGY: &str = "I'm sorry, I encountered an error. Please try again.";

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// Generation options
    pub generation: GenerationOptions,

    /// Deadline for each completion request
    pub request_timeout: Option<Duration>,

    /// Optional cap on completion rounds per turn (unbounded when `None`)
    pub max_rounds: Option<usize>,

    /// Reply used when a turn fails
    pub apology: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            generation: GenerationOptions::default(),
            request_timeout: None,
            max_rounds: None,
            apology: DEFAULT_APOLOGY.into(),
        }
    }
}

/// How a user turn ended
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model's final answer
    Answer(String),
    /// The turn failed; the text is the apology to show
    Apology(String),
}

impl TurnOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Answer(text) | Self::Apology(text) => text,
        }
    }

    pub const fn is_answer(&self) -> bool {
        matches!(self, Self::Answer(_))
    }
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    config: AgentConfig,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            config,
        }
    }

    /// Create with default configuration
    pub fn with_defaults(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self::new(provider, tools, AgentConfig::default())
    }

    /// Run one turn and never fail: errors are logged and turned into the apology.
    ///
    /// Messages appended before a failure stay in the conversation.
    pub async fn respond(&self, conversation: &mut Conversation, input: &str) -> TurnOutcome {
        match self.run_turn(conversation, input).await {
            Ok(answer) => TurnOutcome::Answer(answer),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    retryable = e.is_retryable(),
                    messages = conversation.len(),
                    "Error in agent response"
                );
                TurnOutcome::Apology(self.config.apology.clone())
            }
        }
    }

    /// Append the user's text and run the loop to a final answer
    pub async fn run_turn(&self, conversation: &mut Conversation, input: &str) -> Result<String> {
        conversation.push(Message::user(input))?;
        self.run(conversation).await
    }

    /// Run the agent loop on the conversation as it stands
    pub async fn run(&self, conversation: &mut Conversation) -> Result<String> {
        let mut round = 0;

        loop {
            round += 1;

            if let Some(max) = self.config.max_rounds {
                if round > max {
                    return Err(AgentError::MaxIterations(max));
                }
            }

            if !conversation.awaiting_tool_results().is_empty() {
                return Err(AgentError::Conversation(format!(
                    "refusing to request a completion with {} unanswered tool call(s)",
                    conversation.awaiting_tool_results().len()
                )));
            }

            tracing::debug!(
                round,
                messages = conversation.len(),
                estimated_tokens = conversation.estimate_tokens(),
                "Requesting completion"
            );

            let completion = self.complete(conversation).await?;
            if let Some(usage) = &completion.usage {
                tracing::debug!(
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "Completion received"
                );
            }

            let tool_calls = Self::assign_call_ids(completion.tool_calls);
            let content = completion.content;

            // Appended unconditionally, even when it only carries tool calls
            conversation.push(Message::assistant_with_tools(content.clone(), tool_calls.clone()))?;

            if tool_calls.is_empty() {
                return Ok(content.unwrap_or_default());
            }

            for call in &tool_calls {
                tracing::debug!(tool = %call.name, id = %call.id, "Executing tool");
                let result = self.tools.execute(call).await;
                conversation.push(Message::tool(result.output, call.id.clone()))?;
            }
        }
    }

    async fn complete(&self, conversation: &Conversation) -> Result<Completion> {
        let request = self.provider.complete(
            conversation.messages(),
            self.tools.schemas(),
            &self.config.generation,
        );

        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, request)
                .await
                .map_err(|_| AgentError::Timeout(limit))?,
            None => request.await,
        }
    }

    /// Give every tool call a unique id: empty and repeated ids are replaced
    fn assign_call_ids(calls: Vec<ToolCall>) -> Vec<ToolCall> {
        let mut seen = HashSet::with_capacity(calls.len());
        calls
            .into_iter()
            .map(|mut call| {
                if call.id.is_empty() || seen.contains(&call.id) {
                    let id = format!("call_{}", uuid::Uuid::new_v4().simple());
                    if !call.id.is_empty() {
                        tracing::debug!(tool = %call.name, duplicate = %call.id, new_id = %id, "Replacing repeated tool call id");
                    }
                    call.id = id;
                }
                seen.insert(call.id.clone());
                call
            })
            .collect()
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: ToolRegistry,
    config: AgentConfig,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: ToolRegistry::new(),
            config: AgentConfig::default(),
        }
    }

    #[must_use]
    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    #[must_use]
    pub const fn temperature(mut self, temp: f32) -> Self {
        self.config.generation.temperature = temp;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn max_rounds(mut self, max: Option<usize>) -> Self {
        self.config.max_rounds = max;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self.provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        Ok(Agent::new(provider, Arc::new(self.tools), self.config))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use serde_json::Value;
    use tokio::sync::Mutex;

    use super::*;
    use crate::message::Role;
    use crate::provider::ModelInfo;
    use crate::tool::{ParameterSchema, Tool, ToolResult, ToolSchema};

    /// Replays canned completions and remembers what it was sent
    #[derive(Default)]
    struct MockProvider {
        replies: Mutex<VecDeque<Result<Completion>>>,
        seen: Mutex<Vec<Vec<Message>>>,
        delay: Option<Duration>,
    }

    impl MockProvider {
        fn new(replies: Vec<Result<Completion>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockProvider {
        async fn complete(
            &self,
            messages: &[Message],
            _tools: &[ToolSchema],
            _options: &GenerationOptions,
        ) -> Result<Completion> {
            self.seen.lock().await.push(messages.to_vec());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.replies
                .lock()
                .await
                .pop_front()
                .unwrap_or_else(|| Err(AgentError::ProviderUnavailable("no more replies".into())))
        }

        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(Vec::new())
        }
    }

    /// Counts invocations so ordering can be checked
    #[derive(Default)]
    struct CounterTool {
        hits: Mutex<u32>,
    }

    #[async_trait]
    impl Tool for CounterTool {
        fn schema(&self) -> ToolSchema {
            ToolSchema {
                name: "count".into(),
                description: "Increment and report a counter".into(),
                parameters: vec![ParameterSchema::optional("step", "number", "Ignored")],
                category: None,
                has_side_effects: true,
            }
        }

        async fn execute(&self, _args: &Value) -> Result<ToolResult> {
            let mut hits = self.hits.lock().await;
            *hits += 1;
            Ok(ToolResult::success("count", format!("count={}", *hits)))
        }
    }

    fn agent(provider: Arc<MockProvider>, config: AgentConfig) -> Agent {
        let mut tools = ToolRegistry::new();
        tools.register(CounterTool::default()).unwrap();
        Agent::new(provider, Arc::new(tools), config)
    }

    fn calls(ids: &[&str]) -> Vec<ToolCall> {
        ids.iter().map(|id| ToolCall::new(*id, "count", "{}")).collect()
    }

    #[tokio::test]
    async fn test_plain_answer() {
        let provider = Arc::new(MockProvider::new(vec![Ok(Completion::text("Hello!"))]));
        let agent = agent(provider.clone(), AgentConfig::default());
        let mut conv = Conversation::new("sys");

        let answer = agent.run_turn(&mut conv, "hi").await.unwrap();
        assert_eq!(answer, "Hello!");
        assert_eq!(conv.len(), 3);
        assert_eq!(provider.seen.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_tool_results_precede_next_request() {
        let provider = Arc::new(MockProvider::new(vec![
            Ok(Completion::with_tool_calls(calls(&["a", "b"]))),
            Ok(Completion::text("done")),
        ]));
        let agent = agent(provider.clone(), AgentConfig::default());
        let mut conv = Conversation::new("sys");

        agent.run_turn(&mut conv, "count twice").await.unwrap();

        let seen = provider.seen.lock().await;
        assert_eq!(seen.len(), 2);
        let second = &seen[1];
        // system, user, assistant(tool calls), tool a, tool b
        assert_eq!(second.len(), 5);
        assert_eq!(second[2].tool_calls().len(), 2);
        let answered: Vec<_> = second[3..]
            .iter()
            .map(|m| match m {
                Message::Tool { tool_call_id, .. } => tool_call_id.as_str(),
                other => panic!("expected tool message, got {:?}", other.role()),
            })
            .collect();
        assert_eq!(answered, vec!["a", "b"]);
        assert_eq!(second[4].content(), Some("count=2"));
    }

    #[tokio::test]
    async fn test_multiple_rounds_in_one_turn() {
        let provider = Arc::new(MockProvider::new(vec![
            Ok(Completion::with_tool_calls(calls(&["r1"]))),
            Ok(Completion::with_tool_calls(calls(&["r2"]))),
            Ok(Completion::with_tool_calls(calls(&["r3"]))),
            Ok(Completion::text("three rounds")),
        ]));
        let agent = agent(provider.clone(), AgentConfig::default());
        let mut conv = Conversation::new("sys");

        let answer = agent.run_turn(&mut conv, "go").await.unwrap();
        assert_eq!(answer, "three rounds");
        // sys + user + 3 * (assistant + tool) + final assistant
        assert_eq!(conv.len(), 9);
        assert!(conv.awaiting_tool_results().is_empty());
    }

    #[tokio::test]
    async fn test_missing_call_ids_are_generated() {
        let provider = Arc::new(MockProvider::new(vec![
            Ok(Completion::with_tool_calls(calls(&[""]))),
            Ok(Completion::text("ok")),
        ]));
        let agent = agent(provider, AgentConfig::default());
        let mut conv = Conversation::new("sys");

        agent.run_turn(&mut conv, "go").await.unwrap();
        let id = &conv.messages()[2].tool_calls()[0].id;
        assert!(id.starts_with("call_"));
        assert!(matches!(
            &conv.messages()[3],
            Message::Tool { tool_call_id, .. } if tool_call_id == id
        ));
    }

    #[tokio::test]
    async fn test_repeated_call_ids_still_run_every_tool() {
        let provider = Arc::new(MockProvider::new(vec![
            Ok(Completion::with_tool_calls(calls(&["dup", "dup", ""]))),
            Ok(Completion::text("counted three times")),
        ]));
        let agent = agent(provider.clone(), AgentConfig::default());
        let mut conv = Conversation::new("sys");

        let outcome = agent.respond(&mut conv, "count thrice").await;
        assert_eq!(outcome, TurnOutcome::Answer("counted three times".into()));

        // sys, user, assistant, 3 tool results, final answer
        assert_eq!(conv.len(), 7);
        let ids: Vec<_> = conv.messages()[2]
            .tool_calls()
            .iter()
            .map(|c| c.id.clone())
            .collect();
        assert_eq!(ids[0], "dup");
        assert_ne!(ids[1], "dup");
        assert_ne!(ids[1], ids[2]);

        let answered: Vec<_> = conv.messages()[3..6]
            .iter()
            .map(|m| match m {
                Message::Tool { tool_call_id, .. } => tool_call_id.clone(),
                other => panic!("expected tool message, got {:?}", other.role()),
            })
            .collect();
        assert_eq!(answered, ids);
        assert_eq!(conv.messages()[5].content(), Some("count=3"));
    }

    #[tokio::test]
    async fn test_failure_mid_turn_keeps_appended_messages() {
        let provider = Arc::new(MockProvider::new(vec![
            Ok(Completion::with_tool_calls(calls(&["a"]))),
            Err(AgentError::RateLimited("quota".into())),
        ]));
        let agent = agent(provider, AgentConfig::default());
        let mut conv = Conversation::new("sys");

        let outcome = agent.respond(&mut conv, "count").await;
        assert_eq!(outcome, TurnOutcome::Apology(DEFAULT_APOLOGY.into()));
        // user, assistant with call, tool result all retained
        assert_eq!(conv.len(), 4);
        assert_eq!(conv.last().unwrap().role(), Role::Tool);

        // the session can carry on afterwards
        assert!(conv.push(Message::user("again")).is_ok());
    }

    #[tokio::test]
    async fn test_timeout_ends_turn() {
        let provider = Arc::new(MockProvider {
            replies: Mutex::new(vec![Ok(Completion::text("late"))].into()),
            delay: Some(Duration::from_millis(200)),
            ..Default::default()
        });
        let config = AgentConfig {
            request_timeout: Some(Duration::from_millis(10)),
            ..Default::default()
        };
        let agent = agent(provider, config);
        let mut conv = Conversation::new("sys");

        let err = agent.run_turn(&mut conv, "hi").await.unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)));
        assert_eq!(conv.len(), 2);
    }

    #[tokio::test]
    async fn test_round_cap() {
        let provider = Arc::new(MockProvider::new(vec![
            Ok(Completion::with_tool_calls(calls(&["a"]))),
            Ok(Completion::with_tool_calls(calls(&["b"]))),
        ]));
        let config = AgentConfig {
            max_rounds: Some(1),
            ..Default::default()
        };
        let agent = agent(provider, config);
        let mut conv = Conversation::new("sys");

        let err = agent.run_turn(&mut conv, "loop").await.unwrap_err();
        assert!(matches!(err, AgentError::MaxIterations(1)));
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(AgentBuilder::new().build().is_err());
    }
}
