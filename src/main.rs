//! Relay 服务入口
//!
//! 初始化日志与配置，装配存储 / Translator / Executor / Orchestrator，启动 HTTP 服务直到收到关闭信号。

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use relay::config::{load_config, AppConfig};
use relay::core::{Executor, Orchestrator, ShutdownManager};
use relay::llm::create_llm_from_config;
use relay::server::{self, AppState};
use relay::store::{create_stores, CallSpecCache};
use relay::translator::LlmTranslator;
use relay::transport::HttpTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    relay::observability::init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let cfg = load_config(config_path).unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    let stores = create_stores(cfg.storage.sqlite_path.as_deref(), cfg.session.ttl_secs).await;

    let planner = create_llm_from_config(&cfg.llm, None);
    let summarizer = create_llm_from_config(&cfg.llm, cfg.llm.summary_model.as_deref());
    let translator = Arc::new(
        LlmTranslator::new(planner.clone(), cfg.llm.timeouts.request)
            .with_summarizer(summarizer.clone()),
    );

    let executor = Executor::new(
        CallSpecCache::new(stores.mappings.clone(), cfg.cache.ttl_secs),
        translator.clone(),
        Arc::new(
            HttpTransport::new(cfg.http.request_timeout_secs)
                .context("Failed to build HTTP client")?,
        ),
    );
    let orchestrator = Arc::new(Orchestrator::new(
        executor,
        translator,
        stores.agents.clone(),
        stores.sessions.clone(),
        cfg.session.max_history_turns,
    ));

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.install_signal_handlers();

    let sweeper = server::spawn_sweeper(
        Arc::clone(&orchestrator),
        cfg.cache.sweep_interval_secs,
        shutdown.token(),
    );

    let addr: SocketAddr = format!("{}:{}", cfg.server.host, cfg.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", cfg.server.host, cfg.server.port))?;
    server::serve(addr, AppState::new(orchestrator), shutdown.token())
        .await
        .context("Server failed")?;

    let _ = sweeper.await;
    stores.close().await;
    for (label, llm) in [("planner", &planner), ("summarizer", &summarizer)] {
        let (prompt, completion, total) = llm.token_usage();
        tracing::info!(
            "Token usage ({}): prompt={} completion={} total={}",
            label,
            prompt,
            completion,
            total
        );
    }
    tracing::info!("Relay stopped");
    Ok(())
}
