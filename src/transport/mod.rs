//! 目标 Agent 的 HTTP 访问
//!
//! Executor 只依赖 `AgentTransport`：GET 文档、按调用规格发出请求。
//! 默认实现基于 reqwest，所有请求共享一个带超时的 Client；超时按普通失败处理。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;

/// 文档路径（优先）
pub const DOCS_PATH: &str = "/docs";
/// 能力描述路径（文档不可用时回退）
pub const CAPABILITIES_PATH: &str = "/capabilities";

/// 拼接 base URL 与路径，去掉 base 末尾的 `/`
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// 目标 Agent 访问接口
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// GET url，成功（2xx）时返回响应文本
    async fn get_text(&self, url: &str) -> Result<String, String>;

    /// 按 method 发出请求，body 非 Null 时作为 JSON 发送；返回解析后的响应体
    async fn send(&self, method: &str, url: &str, body: &Value) -> Result<Value, String>;
}

/// reqwest 实现
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Client 构建失败时返回错误，不回退到无超时的默认 Client
    pub fn new(timeout_secs: u64) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("relay/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

/// 响应体优先按 JSON 解析，失败时保留为字符串
fn parse_body(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String, String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        if !resp.status().is_success() {
            return Err(format!("HTTP {}", resp.status()));
        }
        resp.text().await.map_err(|e| e.to_string())
    }

    async fn send(&self, method: &str, url: &str, body: &Value) -> Result<Value, String> {
        let method = Method::from_bytes(method.as_bytes())
            .map_err(|_| format!("Invalid HTTP method: {}", method))?;
        let mut request = self.client.request(method, url);
        if !body.is_null() {
            request = request.json(body);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| format!("Request failed: {}", e))?;
        let status = resp.status();
        let text = resp.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(format!("HTTP {}: {}", status, text.trim()));
        }
        Ok(parse_body(text))
    }
}
