//! 基于 LlmClient 的 Translator 实现
//!
//! decompose / translate 走规划模型，summarize 可单独指定更快的模型；每次调用受超时约束。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::parse::{parse_call_spec, parse_tasks};
use super::prompts;
use super::{CallSpec, Task, Translator};
use crate::core::RelayError;
use crate::llm::{LlmClient, Message};
use crate::store::{AgentDescriptor, Turn, TurnRole};

pub struct LlmTranslator {
    planner: Arc<dyn LlmClient>,
    summarizer: Arc<dyn LlmClient>,
    timeout: Duration,
}

impl LlmTranslator {
    pub fn new(llm: Arc<dyn LlmClient>, timeout_secs: u64) -> Self {
        Self {
            summarizer: llm.clone(),
            planner: llm,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 摘要使用独立（通常更轻量）的模型
    pub fn with_summarizer(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.summarizer = llm;
        self
    }

    async fn complete(
        &self,
        llm: &Arc<dyn LlmClient>,
        messages: &[Message],
    ) -> Result<String, RelayError> {
        match tokio::time::timeout(self.timeout, llm.complete(messages)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(RelayError::TranslationFailure(e)),
            Err(_) => Err(RelayError::TranslationFailure(format!(
                "LLM request timed out after {}s",
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl Translator for LlmTranslator {
    async fn decompose(
        &self,
        intent: &str,
        agents: &[AgentDescriptor],
        history: &[Turn],
    ) -> Result<Vec<Task>, RelayError> {
        let mut messages = vec![Message::system(prompts::decompose_system_prompt(agents))];
        messages.extend(history.iter().map(|turn| match turn.role {
            TurnRole::User => Message::user(prompts::user_intent(&turn.text)),
            TurnRole::AgentSummary => Message::assistant(turn.text.clone()),
        }));
        messages.push(Message::user(prompts::user_intent(intent)));

        let output = self.complete(&self.planner, &messages).await?;
        let tasks = parse_tasks(&output)?;
        tracing::debug!("Decomposed intent into {} task(s)", tasks.len());
        Ok(tasks)
    }

    async fn translate(&self, intent: &str, documentation: &str) -> Result<CallSpec, RelayError> {
        let messages = [
            Message::system(prompts::call_spec_system_prompt(documentation)),
            Message::user(prompts::user_intent(intent)),
        ];
        let output = self.complete(&self.planner, &messages).await?;
        parse_call_spec(&output)
    }

    async fn summarize(
        &self,
        intent: &str,
        response: &serde_json::Value,
    ) -> Result<String, RelayError> {
        let messages = [
            Message::system(prompts::SUMMARY_SYSTEM_PROMPT),
            Message::user(prompts::summary_user_prompt(intent, response)),
        ];
        let text = self.complete(&self.summarizer, &messages).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(RelayError::TranslationFailure("empty summary".to_string()));
        }
        Ok(text.to_string())
    }
}
