//! 集成测试共用的桩实现：可编排的 Translator 与内存 HTTP 传输

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use relay::core::{EventSink, Executor, Orchestrator, ProgressEvent, RelayError};
use relay::store::{AgentDescriptor, AgentRegistry, CallSpecCache, Stores, Turn};
use relay::translator::{CallSpec, Task, Translator};
use relay::transport::AgentTransport;
use serde_json::{json, Value};
use tokio::sync::mpsc;

pub const SESSION_TTL_SECS: u64 = 3600;
pub const CACHE_TTL_SECS: u64 = 3600;
pub const MAX_HISTORY_TURNS: usize = 20;

/// 返回固定计划与调用规格的 Translator，记录每类调用次数
pub struct StubTranslator {
    plan: Mutex<Result<Vec<Task>, RelayError>>,
    spec: Mutex<CallSpec>,
    summary: Mutex<Result<String, RelayError>>,
    pub decompose_calls: AtomicUsize,
    pub translate_calls: AtomicUsize,
    pub summarize_calls: AtomicUsize,
    pub last_history: Mutex<Vec<Turn>>,
    pub last_documentation: Mutex<Option<String>>,
}

impl StubTranslator {
    pub fn new() -> Self {
        Self {
            plan: Mutex::new(Ok(Vec::new())),
            spec: Mutex::new(CallSpec::new(
                "POST",
                "/bookings/create",
                json!({ "time": "17:00" }),
                "Salon docs expose /bookings/create",
            )),
            summary: Mutex::new(Ok("Booked.".to_string())),
            decompose_calls: AtomicUsize::new(0),
            translate_calls: AtomicUsize::new(0),
            summarize_calls: AtomicUsize::new(0),
            last_history: Mutex::new(Vec::new()),
            last_documentation: Mutex::new(None),
        }
    }

    pub fn with_plan(self, tasks: Vec<Task>) -> Self {
        *self.plan.lock().unwrap() = Ok(tasks);
        self
    }

    pub fn with_plan_error(self, err: RelayError) -> Self {
        *self.plan.lock().unwrap() = Err(err);
        self
    }

    pub fn with_spec(self, spec: CallSpec) -> Self {
        *self.spec.lock().unwrap() = spec;
        self
    }

    pub fn with_summary_error(self) -> Self {
        *self.summary.lock().unwrap() =
            Err(RelayError::TranslationFailure("summary model down".to_string()));
        self
    }

    pub fn set_spec(&self, spec: CallSpec) {
        *self.spec.lock().unwrap() = spec;
    }

    pub fn translate_count(&self) -> usize {
        self.translate_calls.load(Ordering::SeqCst)
    }

    pub fn decompose_count(&self) -> usize {
        self.decompose_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for StubTranslator {
    async fn decompose(
        &self,
        _intent: &str,
        _agents: &[AgentDescriptor],
        history: &[Turn],
    ) -> Result<Vec<Task>, RelayError> {
        self.decompose_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_history.lock().unwrap() = history.to_vec();
        self.plan.lock().unwrap().clone()
    }

    async fn translate(&self, _intent: &str, documentation: &str) -> Result<CallSpec, RelayError> {
        self.translate_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_documentation.lock().unwrap() = Some(documentation.to_string());
        Ok(self.spec.lock().unwrap().clone())
    }

    async fn summarize(&self, _intent: &str, _response: &Value) -> Result<String, RelayError> {
        self.summarize_calls.fetch_add(1, Ordering::SeqCst);
        self.summary.lock().unwrap().clone()
    }
}

/// 内存 HTTP：按完整 URL 返回预设文本 / 响应，未配置的 URL 视为 404
#[derive(Default)]
pub struct StubTransport {
    pages: Mutex<HashMap<String, String>>,
    routes: Mutex<HashMap<String, Result<Value, String>>>,
    pub gets: Mutex<Vec<String>>,
    pub sends: Mutex<Vec<(String, String, Value)>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: &str, text: &str) -> Self {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), text.to_string());
        self
    }

    pub fn route(self, url: &str, response: Result<Value, String>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
        self
    }

    pub fn get_count(&self) -> usize {
        self.gets.lock().unwrap().len()
    }

    pub fn sent_urls(&self) -> Vec<String> {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .map(|(_, url, _)| url.clone())
            .collect()
    }
}

#[async_trait]
impl AgentTransport for StubTransport {
    async fn get_text(&self, url: &str) -> Result<String, String> {
        self.gets.lock().unwrap().push(url.to_string());
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| "HTTP 404 Not Found".to_string())
    }

    async fn send(&self, method: &str, url: &str, body: &Value) -> Result<Value, String> {
        self.sends
            .lock()
            .unwrap()
            .push((method.to_string(), url.to_string(), body.clone()));
        self.routes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Err("HTTP 404 Not Found".to_string()))
    }
}

pub struct Harness {
    pub orchestrator: Arc<Orchestrator>,
    pub stores: Stores,
    pub translator: Arc<StubTranslator>,
    pub transport: Arc<StubTransport>,
}

impl Harness {
    pub fn new(translator: StubTranslator, transport: StubTransport) -> Self {
        let stores = Stores::in_memory(SESSION_TTL_SECS);
        let translator = Arc::new(translator);
        let transport = Arc::new(transport);
        let executor = Executor::new(
            CallSpecCache::new(stores.mappings.clone(), CACHE_TTL_SECS),
            translator.clone(),
            transport.clone(),
        );
        let orchestrator = Arc::new(Orchestrator::new(
            executor,
            translator.clone(),
            stores.agents.clone(),
            stores.sessions.clone(),
            MAX_HISTORY_TURNS,
        ));
        Self {
            orchestrator,
            stores,
            translator,
            transport,
        }
    }

    pub fn cache(&self) -> &CallSpecCache {
        self.orchestrator.executor().cache()
    }

    pub async fn register(&self, name: &str, url: &str) {
        let agent = AgentDescriptor::new(name, url, format!("{} agent", name)).unwrap();
        self.stores.agents.register(agent).await.unwrap();
    }

    /// 直接调用 Executor，收集其推送的事件
    pub async fn execute_direct(
        &self,
        target_url: &str,
        intent: &str,
    ) -> (Result<relay::core::ExecutionResult, RelayError>, Vec<ProgressEvent>) {
        let (sink, rx) = EventSink::channel();
        let result = self
            .orchestrator
            .executor()
            .execute(target_url, intent, Some(&sink))
            .await;
        drop(sink);
        (result, collect(rx).await)
    }
}

/// 读到通道关闭为止
pub async fn collect(mut rx: mpsc::UnboundedReceiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(ev) = rx.recv().await {
        events.push(ev);
    }
    events
}

/// 事件的 type 标签序列
pub fn kinds(events: &[ProgressEvent]) -> Vec<&'static str> {
    events
        .iter()
        .map(|ev| match ev {
            ProgressEvent::Status { .. } => "status",
            ProgressEvent::Plan { .. } => "plan",
            ProgressEvent::Result { .. } => "result",
            ProgressEvent::Error { .. } => "error",
            ProgressEvent::Healing { .. } => "healing",
            ProgressEvent::Done => "done",
        })
        .collect()
}
