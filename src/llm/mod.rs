//! LLM 层：客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）

pub mod deepseek;
pub mod message;
pub mod mock;
pub mod openai;
pub mod traits;

use std::sync::Arc;

use crate::config::LlmSection;

pub use deepseek::{create_deepseek_client, DEEPSEEK_CHAT};
pub use message::{Message, Role};
pub use mock::MockLlmClient;
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;

/// 根据配置与环境变量选择 LLM 后端（DeepSeek / OpenAI 兼容 / Mock）
///
/// `model` 为空时使用配置中的主模型；摘要客户端传入 `summary_model`。
pub fn create_llm_from_config(cfg: &LlmSection, model: Option<&str>) -> Arc<dyn LlmClient> {
    let provider = cfg.provider.to_lowercase();
    let model = model.unwrap_or(&cfg.model);
    // 有 DeepSeek Key 或（配置为 deepseek 且仅有 OpenAI Key 时也走 DeepSeek 兼容端点）
    let use_deepseek = std::env::var("DEEPSEEK_API_KEY").is_ok()
        || (provider == "deepseek" && std::env::var("OPENAI_API_KEY").is_ok());
    let use_openai = std::env::var("OPENAI_API_KEY").is_ok() && provider != "deepseek";

    if use_deepseek && cfg.base_url.is_none() {
        tracing::info!("Using DeepSeek LLM ({})", model);
        Arc::new(create_deepseek_client(Some(model)))
    } else if use_openai || use_deepseek {
        tracing::info!(
            "Using OpenAI-compatible LLM ({}) at {}",
            model,
            cfg.base_url.as_deref().unwrap_or("api.openai.com")
        );
        Arc::new(OpenAiClient::new(
            cfg.base_url.as_deref(),
            model,
            std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("DEEPSEEK_API_KEY"))
                .ok()
                .as_deref(),
        ))
    } else {
        tracing::warn!("No API key set or provider unknown, using Mock LLM");
        Arc::new(MockLlmClient::default())
    }
}
