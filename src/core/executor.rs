//! 单请求执行器：把 (目标 URL, 意图) 变成一次实际的 HTTP 调用
//!
//! 状态流转：
//! - LOOKUP 命中 → DISPATCH
//! - LOOKUP 未命中 → INTROSPECT → TRANSLATE → PERSIST → DISPATCH
//! - 来自缓存的规格 DISPATCH 失败且尚未重试 → INVALIDATE → 强制未命中重走一遍
//!
//! 重试次数由 `Attempt` 显式记录，第二次失败直接返回错误。

use std::sync::Arc;

use serde_json::Value;

use crate::core::{EventSink, ProgressEvent, RelayError};
use crate::store::CallSpecCache;
use crate::translator::{CallSource, CallSpec, Translator};
use crate::transport::{join_url, AgentTransport, CAPABILITIES_PATH, DOCS_PATH};

/// 摘要失败时的固定回退文本
pub const SUMMARY_FALLBACK: &str = "Action completed.";

const CACHED_REASONING: &str = "Cached from previous execution.";

const HEALING_MESSAGE: &str = "[RETRY] Cached mapping failed. Triggering AI Introspection...";

/// 单次执行的成功结果
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub source: CallSource,
    pub reasoning: String,
    pub summary: String,
    pub response: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Attempt {
    First,
    /// 缓存规格失效后的唯一一次重试
    Healing,
}

pub struct Executor {
    cache: CallSpecCache,
    translator: Arc<dyn Translator>,
    transport: Arc<dyn AgentTransport>,
}

impl Executor {
    pub fn new(
        cache: CallSpecCache,
        translator: Arc<dyn Translator>,
        transport: Arc<dyn AgentTransport>,
    ) -> Self {
        Self {
            cache,
            translator,
            transport,
        }
    }

    pub fn cache(&self) -> &CallSpecCache {
        &self.cache
    }

    /// 执行意图；sink 存在时推送 healing 事件
    pub async fn execute(
        &self,
        target_url: &str,
        intent: &str,
        sink: Option<&EventSink>,
    ) -> Result<ExecutionResult, RelayError> {
        let mut attempt = Attempt::First;
        loop {
            let cached = match attempt {
                Attempt::First => self.cache.lookup(target_url, intent).await?,
                Attempt::Healing => None,
            };

            let (spec, source) = match cached {
                Some(spec) => {
                    tracing::info!("[{}] Cache HIT.", target_url);
                    (spec, CallSource::Cache)
                }
                None => {
                    tracing::info!("[{}] Cache MISS. Introspecting...", target_url);
                    (self.resolve(target_url, intent).await?, CallSource::Translated)
                }
            };

            match self.dispatch(target_url, &spec).await {
                Ok(response) => return Ok(self.finish(intent, spec, source, response).await),
                Err(e)
                    if e.is_dispatch_failure()
                        && source == CallSource::Cache
                        && attempt == Attempt::First =>
                {
                    tracing::warn!(
                        "[Self-Healing] Outdated mapping detected for {} ({}). Deleting and re-trying...",
                        target_url,
                        e
                    );
                    if let Some(sink) = sink {
                        sink.emit(ProgressEvent::Healing {
                            message: HEALING_MESSAGE.to_string(),
                        });
                    }
                    self.cache.invalidate(target_url, intent).await?;
                    attempt = Attempt::Healing;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// INTROSPECT → TRANSLATE → PERSIST
    async fn resolve(&self, target_url: &str, intent: &str) -> Result<CallSpec, RelayError> {
        let documentation = self.introspect(target_url).await?;
        let spec = self.translator.translate(intent, &documentation).await?;
        self.cache.store(target_url, intent, spec.clone()).await?;
        Ok(spec)
    }

    /// 先取 /docs，失败时回退 /capabilities
    async fn introspect(&self, target_url: &str) -> Result<String, RelayError> {
        let docs_err = match self.transport.get_text(&join_url(target_url, DOCS_PATH)).await {
            Ok(docs) => return Ok(docs),
            Err(e) => e,
        };
        tracing::debug!(
            "[{}] {} unavailable ({}), trying {}",
            target_url,
            DOCS_PATH,
            docs_err,
            CAPABILITIES_PATH
        );

        self.transport
            .get_text(&join_url(target_url, CAPABILITIES_PATH))
            .await
            .map_err(|caps_err| {
                RelayError::DocumentationUnavailable(format!(
                    "{}: {}; {}: {}",
                    DOCS_PATH, docs_err, CAPABILITIES_PATH, caps_err
                ))
            })
    }

    async fn dispatch(&self, target_url: &str, spec: &CallSpec) -> Result<Value, RelayError> {
        let url = join_url(target_url, &spec.endpoint);
        tracing::info!("[{}] Executing {} to {}", target_url, spec.method, url);
        self.transport
            .send(&spec.method, &url, &spec.body)
            .await
            .map_err(|e| {
                tracing::error!("[{}] Execution failed: {}", target_url, e);
                RelayError::DispatchFailure(e)
            })
    }

    async fn finish(
        &self,
        intent: &str,
        spec: CallSpec,
        source: CallSource,
        response: Value,
    ) -> ExecutionResult {
        let summary = match self.translator.summarize(intent, &response).await {
            Ok(summary) => summary,
            Err(e) => {
                tracing::warn!("Summary failed, using fallback: {}", e);
                SUMMARY_FALLBACK.to_string()
            }
        };
        let reasoning = if spec.reasoning.trim().is_empty() && source == CallSource::Cache {
            CACHED_REASONING.to_string()
        } else {
            spec.reasoning
        };
        ExecutionResult {
            source,
            reasoning,
            summary,
            response,
        }
    }
}
