//! 编排器：把一次意图请求变成进度事件流
//!
//! - 直连模式（带 target_url）：Executor 执行一次，不更新会话历史
//! - 自动模式：拆解为任务计划，按返回顺序逐个执行；单个任务失败只产生该任务的 error 事件
//!
//! 每个请求都以一个 done 或一个请求级 error 结束。

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::core::{EventSink, ExecutionResult, Executor, ProgressEvent, RelayError};
use crate::store::{
    find_agent, AgentDescriptor, AgentRegistry, ConversationSession, SessionStore, Turn,
};
use crate::translator::{Task, Translator};

const DIRECT_AGENT: &str = "Direct Target";
const DIRECT_ACTION: &str = "Single Execution";

/// 一次执行请求
#[derive(Debug, Clone, Default)]
pub struct ExecuteRequest {
    pub intent: String,
    pub target_url: Option<String>,
    pub session_id: Option<String>,
}

impl ExecuteRequest {
    pub fn new(intent: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            ..Self::default()
        }
    }

    pub fn with_target(mut self, target_url: impl Into<String>) -> Self {
        self.target_url = Some(target_url.into());
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn validate(&self) -> Result<(), RelayError> {
        if self.intent.trim().is_empty() {
            return Err(RelayError::Validation("Missing userIntent".to_string()));
        }
        Ok(())
    }
}

/// 会话摘要："A executed 'x'. B executed 'y'"
fn plan_summary(tasks: &[Task]) -> String {
    tasks
        .iter()
        .map(|t| format!("{} executed '{}'", t.agent_name, t.sub_intent))
        .collect::<Vec<_>>()
        .join(". ")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub struct Orchestrator {
    executor: Executor,
    translator: Arc<dyn Translator>,
    agents: Arc<dyn AgentRegistry>,
    sessions: Arc<dyn SessionStore>,
    max_history_turns: usize,
}

impl Orchestrator {
    pub fn new(
        executor: Executor,
        translator: Arc<dyn Translator>,
        agents: Arc<dyn AgentRegistry>,
        sessions: Arc<dyn SessionStore>,
        max_history_turns: usize,
    ) -> Self {
        Self {
            executor,
            translator,
            agents,
            sessions,
            max_history_turns,
        }
    }

    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    pub fn agents(&self) -> &Arc<dyn AgentRegistry> {
        &self.agents
    }

    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// 在后台任务中处理请求，返回事件接收端；调用方提前断开不会中断处理
    pub fn handle(
        self: &Arc<Self>,
        request: ExecuteRequest,
    ) -> mpsc::UnboundedReceiver<ProgressEvent> {
        let (sink, rx) = EventSink::channel();
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.run(request, &sink).await;
        });
        rx
    }

    /// 处理请求并推送事件，最后推送 done 或请求级 error
    pub async fn run(&self, request: ExecuteRequest, sink: &EventSink) {
        match self.drive(request, sink).await {
            Ok(()) => sink.emit(ProgressEvent::Done),
            Err(e) => {
                tracing::error!("Request failed: {}", e);
                sink.emit(ProgressEvent::error(e.to_string()));
            }
        }
    }

    async fn drive(&self, request: ExecuteRequest, sink: &EventSink) -> Result<(), RelayError> {
        request.validate()?;
        let session = self.resolve_session(request.session_id).await?;
        tracing::info!(
            "Request: \"{}\" (Session: {})",
            request.intent,
            session.session_id
        );

        match non_blank(request.target_url) {
            Some(target_url) => {
                self.run_direct(&target_url, &request.intent, &session, sink)
                    .await
            }
            None => self.run_plan(&request.intent, session, sink).await,
        }
    }

    /// 按 ID 恢复会话；未知或已过期则以该 ID 新建，未提供 ID 时生成新 ID
    async fn resolve_session(
        &self,
        session_id: Option<String>,
    ) -> Result<ConversationSession, RelayError> {
        match non_blank(session_id) {
            Some(id) => Ok(self
                .sessions
                .load(&id)
                .await?
                .unwrap_or_else(|| ConversationSession::new(id))),
            None => Ok(ConversationSession::mint()),
        }
    }

    async fn run_direct(
        &self,
        target_url: &str,
        intent: &str,
        session: &ConversationSession,
        sink: &EventSink,
    ) -> Result<(), RelayError> {
        sink.emit(ProgressEvent::Status {
            message: format!("Target provided: {}. Executing...", target_url),
            session_id: Some(session.session_id.clone()),
        });
        let result = self.executor.execute(target_url, intent, Some(sink)).await?;
        sink.emit(result_event(DIRECT_AGENT, DIRECT_ACTION, result.reasoning.clone(), result));
        Ok(())
    }

    async fn run_plan(
        &self,
        intent: &str,
        mut session: ConversationSession,
        sink: &EventSink,
    ) -> Result<(), RelayError> {
        sink.emit(ProgressEvent::Status {
            message: "Analyzing Context & Intent...".to_string(),
            session_id: Some(session.session_id.clone()),
        });

        let agents = self.agents.list().await?;
        let tasks = self
            .translator
            .decompose(intent, &agents, &session.history)
            .await?;
        if tasks.is_empty() {
            return Err(RelayError::NoPlanFound);
        }

        sink.emit(ProgressEvent::Plan {
            tasks: tasks.clone(),
        });

        // 严格顺序：上一个任务的事件发出后才开始下一个
        for task in &tasks {
            self.run_task(task, &agents, sink).await;
        }

        session.append(
            [Turn::user(intent), Turn::agent_summary(plan_summary(&tasks))],
            self.max_history_turns,
        );
        self.sessions.save(session).await
    }

    async fn run_task(&self, task: &Task, agents: &[AgentDescriptor], sink: &EventSink) {
        let Some(agent) = find_agent(agents, &task.agent_name) else {
            let err = RelayError::AgentNotFound(task.agent_name.clone());
            tracing::warn!("{}", err);
            sink.emit(ProgressEvent::task_error(&task.agent_name, err.to_string()));
            return;
        };

        sink.emit(ProgressEvent::status(format!("Contacting {}...", task.agent_name)));
        match self
            .executor
            .execute(&agent.base_url, &task.sub_intent, Some(sink))
            .await
        {
            Ok(result) => {
                let reasoning = format!(
                    "[Task Logic]: {}\n[Execution Logic]: {}",
                    task.reasoning, result.reasoning
                );
                sink.emit(result_event(&task.agent_name, &task.sub_intent, reasoning, result));
            }
            Err(e) => {
                tracing::warn!("Task for {} failed: {}", task.agent_name, e);
                sink.emit(ProgressEvent::task_error(
                    &task.agent_name,
                    format!("Failed to execute {}: {}", task.agent_name, e),
                ));
            }
        }
    }
}

fn result_event(
    agent: &str,
    action: &str,
    reasoning: String,
    result: ExecutionResult,
) -> ProgressEvent {
    ProgressEvent::Result {
        agent: agent.to_string(),
        action: action.to_string(),
        reasoning,
        summary: result.summary,
        source: result.source,
        result: result.response,
    }
}
