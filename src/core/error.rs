//! 代理错误类型
//!
//! 请求级错误（Validation / NoPlanFound）在任何任务开始前终止请求；
//! 任务级错误（AgentNotFound / DispatchFailure 等）只影响单个任务，计划继续执行。

use thiserror::Error;

/// 代理运行过程中可能出现的错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RelayError {
    /// 请求缺少必填字段，在开始任何工作前拒绝
    #[error("Validation error: {0}")]
    Validation(String),

    /// /docs 与 /capabilities 均不可用（不触发自愈重试）
    #[error("Could not fetch documentation from target agent: {0}")]
    DocumentationUnavailable(String),

    /// Translator 返回无法解析或字段缺失的内容
    #[error("Translation failed: {0}")]
    TranslationFailure(String),

    /// 目标 Agent 调用失败（网络错误、超时、非 2xx）
    #[error("Dispatch failed: {0}")]
    DispatchFailure(String),

    #[error("Agent {0} not found in registry.")]
    AgentNotFound(String),

    #[error("No suitable agents found.")]
    NoPlanFound,

    /// 存储后端错误（SQLite 等）
    #[error("Store error: {0}")]
    Store(String),
}

impl RelayError {
    /// 是否属于可自愈的失败（仅 Dispatch 失败且来源为缓存时才会重试）
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(self, RelayError::DispatchFailure(_))
    }
}

#[cfg(feature = "async-sqlite")]
impl From<sqlx::Error> for RelayError {
    fn from(e: sqlx::Error) -> Self {
        RelayError::Store(e.to_string())
    }
}
