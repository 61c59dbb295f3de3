//! HTTP 服务：Agent 注册、意图执行（NDJSON 流）、健康检查
//!
//! 路由：
//! - `POST /registry/register`
//! - `GET  /registry/agents`
//! - `POST /proxy/execute`
//! - `GET  /health`

mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio_util::sync::CancellationToken;

use crate::core::Orchestrator;

/// 处理器共享状态
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Arc<Self> {
        Arc::new(Self { orchestrator })
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/registry/register", post(handlers::register_agent))
        .route("/registry/agents", get(handlers::list_agents))
        .route("/proxy/execute", post(handlers::execute))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

/// 监听并服务，token 取消后停止接受新连接并等待进行中的请求结束
pub async fn serve(
    addr: SocketAddr,
    state: Arc<AppState>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Relay listening on http://{}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;
    Ok(())
}

/// 周期性清理过期调用映射与会话，token 取消时退出
pub fn spawn_sweeper(
    orchestrator: Arc<Orchestrator>,
    interval_secs: u64,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        // 第一个 tick 立即返回
        interval.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {}
            }
            match orchestrator.executor().cache().purge_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Purged {} expired call mappings", n),
                Err(e) => tracing::warn!("Mapping sweep failed: {}", e),
            }
            match orchestrator.sessions().cleanup_expired().await {
                Ok(0) => {}
                Ok(n) => tracing::info!("Cleaned up {} expired sessions", n),
                Err(e) => tracing::warn!("Session sweep failed: {}", e),
            }
        }
        tracing::debug!("Sweeper stopped");
    })
}
