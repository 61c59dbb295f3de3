//! Relay - 意图路由代理
//!
//! 把自然语言意图翻译为对已注册 HTTP Agent 的具体调用，并以 NDJSON 流回报进度。
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误、进度事件、单请求执行器（缓存 + 自愈）、多 Agent 编排、优雅关闭
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / DeepSeek / Mock）
//! - **observability**: tracing 日志初始化
//! - **server**: axum 路由与 NDJSON 流式响应
//! - **store**: Agent 目录、调用映射缓存、会话历史（内存 / SQLite）
//! - **translator**: 意图拆解、调用规格翻译、结果摘要
//! - **transport**: 访问目标 Agent 的 HTTP 客户端

pub mod config;
pub mod core;
pub mod llm;
pub mod observability;
pub mod server;
pub mod store;
pub mod translator;
pub mod transport;
