//! Translator：自然语言推理协作方
//!
//! 三个纯请求/响应操作：
//! - **decompose**：意图 + Agent 列表 + 会话历史 → 有序任务列表
//! - **translate**：意图 + 目标 Agent 文档 → 调用规格（method / endpoint / body / reasoning）
//! - **summarize**：意图 + 原始响应 → 简短摘要
//!
//! 核心只依赖 `Translator` trait；默认实现 `LlmTranslator` 基于 LlmClient。

mod llm;
pub mod parse;
mod prompts;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::RelayError;
use crate::store::{AgentDescriptor, Turn};

pub use llm::LlmTranslator;

/// 翻译得到的单次 HTTP 调用规格
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSpec {
    /// 大写 HTTP 方法（GET / POST / ...）
    pub method: String,
    /// 以 `/` 开头的路径
    pub endpoint: String,
    /// JSON 请求体；Null 表示不发送请求体
    #[serde(default)]
    pub body: serde_json::Value,
    pub reasoning: String,
}

impl CallSpec {
    pub fn new(
        method: impl Into<String>,
        endpoint: impl Into<String>,
        body: serde_json::Value,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            method: method.into(),
            endpoint: endpoint.into(),
            body,
            reasoning: reasoning.into(),
        }
    }
}

/// 拆解出的子任务（字段名与 Translator 输出保持一致）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub agent_name: String,
    pub sub_intent: String,
    #[serde(default)]
    pub reasoning: String,
}

impl Task {
    pub fn new(
        agent_name: impl Into<String>,
        sub_intent: impl Into<String>,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            agent_name: agent_name.into(),
            sub_intent: sub_intent.into(),
            reasoning: reasoning.into(),
        }
    }
}

/// 调用规格来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallSource {
    /// 命中映射缓存
    Cache,
    /// 本次自省 + 翻译得到
    Translated,
}

/// 自然语言推理能力（外部协作方）
#[async_trait]
pub trait Translator: Send + Sync {
    /// 将意图拆解为有序任务；history 用于解析「刚才那个」之类的指代
    async fn decompose(
        &self,
        intent: &str,
        agents: &[AgentDescriptor],
        history: &[Turn],
    ) -> Result<Vec<Task>, RelayError>;

    /// 根据目标文档生成调用规格
    async fn translate(&self, intent: &str, documentation: &str) -> Result<CallSpec, RelayError>;

    /// 对 Agent 原始响应生成面向用户的摘要
    async fn summarize(
        &self,
        intent: &str,
        response: &serde_json::Value,
    ) -> Result<String, RelayError>;
}
