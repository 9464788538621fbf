//! Scripted Provider
//!
//! Replays queued completions in order and records every conversation
//! snapshot it receives. Useful for driving the agent without a network.

use std::collections::VecDeque;

use agent_core::{
    error::{AgentError, Result},
    message::Message,
    provider::{Completion, GenerationOptions, LlmProvider, ModelInfo},
    tool::ToolSchema,
};
use async_trait::async_trait;
use tokio::sync::Mutex;

/// Provider that answers from a queue instead of a model
#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<Completion>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a list of successful completions
    pub fn with_replies(replies: impl IntoIterator<Item = Completion>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            ..Default::default()
        }
    }

    /// Queue a completion
    pub async fn push_reply(&self, completion: Completion) {
        self.replies.lock().await.push_back(Ok(completion));
    }

    /// Queue a failure for the next request
    pub async fn push_failure(&self, error: AgentError) {
        self.replies.lock().await.push_back(Err(error));
    }

    /// Conversation snapshots received so far, one per request
    pub async fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().await.clone()
    }

    /// Completions still waiting to be served
    pub async fn remaining(&self) -> usize {
        self.replies.lock().await.len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        self.requests.lock().await.push(messages.to_vec());

        let reply = self.replies.lock().await.pop_front().ok_or_else(|| {
            AgentError::ProviderUnavailable("script has no more completions".into())
        })?;

        reply.map(|mut completion| {
            if completion.model.is_empty() {
                completion.model.clone_from(&options.model);
            }
            completion
        })
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        Ok(vec![ModelInfo {
            id: "scripted".into(),
            owned_by: None,
            context_length: None,
        }])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let provider = ScriptedProvider::with_replies([Completion::text("one")]);
        provider.push_reply(Completion::text("two")).await;

        let opts = GenerationOptions::default();
        let msgs = [Message::system("sys")];
        let first = provider.complete(&msgs, &[], &opts).await.unwrap();
        let second = provider.complete(&msgs, &[], &opts).await.unwrap();
        assert_eq!(first.content.as_deref(), Some("one"));
        assert_eq!(second.content.as_deref(), Some("two"));
        assert_eq!(second.model, opts.model);

        let err = provider.complete(&msgs, &[], &opts).await.unwrap_err();
        assert!(matches!(err, AgentError::ProviderUnavailable(_)));
        assert_eq!(provider.requests().await.len(), 3);
    }

    #[tokio::test]
    async fn test_queued_failure() {
        let provider = ScriptedProvider::new();
        provider.push_failure(AgentError::Auth("bad key".into())).await;
        let result = provider
            .complete(&[], &[], &GenerationOptions::default())
            .await;
        assert!(matches!(result, Err(AgentError::Auth(_))));
        assert!(provider.health_check().await.unwrap());
    }
}
