//! 进度事件：编排过程中推送给调用方的 NDJSON 事件

use serde::Serialize;
use tokio::sync::mpsc;

use crate::translator::{CallSource, Task};

/// 单个进度事件（每个事件独立序列化为一行 JSON）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// 阶段提示；首个 status 事件携带会话 ID
    Status {
        message: String,
        #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// 拆解出的任务计划
    Plan { tasks: Vec<Task> },
    /// 单个任务（或直连模式下的单次调用）执行结果
    Result {
        agent: String,
        action: String,
        reasoning: String,
        summary: String,
        source: CallSource,
        result: serde_json::Value,
    },
    /// 任务级（带 agent）或请求级错误
    Error {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        agent: Option<String>,
    },
    /// 缓存映射失效，正在重新自省
    Healing { message: String },
    /// 流结束
    Done,
}

impl ProgressEvent {
    pub fn status(message: impl Into<String>) -> Self {
        ProgressEvent::Status {
            message: message.into(),
            session_id: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            message: message.into(),
            agent: None,
        }
    }

    /// 单个任务失败，不终止计划
    pub fn task_error(agent: impl Into<String>, message: impl Into<String>) -> Self {
        ProgressEvent::Error {
            message: message.into(),
            agent: Some(agent.into()),
        }
    }

    /// 是否为请求级终止事件（done 或不属于任何任务的 error）
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProgressEvent::Done | ProgressEvent::Error { agent: None, .. }
        )
    }

    /// 序列化为一行 NDJSON（含结尾换行）
    pub fn to_ndjson(&self) -> String {
        match serde_json::to_string(self) {
            Ok(json) => format!("{}\n", json),
            Err(e) => format!(
                "{}\n",
                serde_json::json!({ "type": "error", "message": e.to_string() })
            ),
        }
    }
}

/// 事件发送端：调用方断开后发送静默失败，处理继续进行
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }

    /// 创建一对发送端 / 接收端
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// best-effort 推送
    pub fn emit(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Progress sink closed, event dropped");
        }
    }
}
