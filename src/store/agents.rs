//! Agent 目录：名称 → {base URL, 能力描述}
//!
//! 名称与 base URL 均为唯一键；重复注册同一 URL 或同一名称时原地替换旧条目。

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::RelayError;

/// 已注册的 Agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDescriptor {
    pub name: String,
    #[serde(rename = "url")]
    pub base_url: String,
    pub description: String,
    pub last_seen_at: DateTime<Utc>,
}

impl AgentDescriptor {
    /// 校验三个字段均非空后创建
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, RelayError> {
        let (name, base_url, description) = (name.into(), base_url.into(), description.into());
        if [&name, &base_url, &description]
            .iter()
            .any(|field| field.trim().is_empty())
        {
            return Err(RelayError::Validation("Missing fields".to_string()));
        }
        Ok(Self {
            name: name.trim().to_string(),
            base_url: base_url.trim().to_string(),
            description,
            last_seen_at: Utc::now(),
        })
    }
}

/// 在描述列表中按名称查找 Agent
pub fn find_agent<'a>(agents: &'a [AgentDescriptor], name: &str) -> Option<&'a AgentDescriptor> {
    agents.iter().find(|a| a.name == name)
}

/// Agent 目录存储接口
#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// 注册或刷新：同 URL 或同名称的旧条目被替换
    async fn register(&self, agent: AgentDescriptor) -> Result<(), RelayError>;

    /// 全部 Agent（按首次注册顺序）
    async fn list(&self) -> Result<Vec<AgentDescriptor>, RelayError>;
}

/// 内存 Agent 目录
#[derive(Default)]
pub struct MemoryAgentRegistry {
    agents: RwLock<Vec<AgentDescriptor>>,
}

impl MemoryAgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AgentRegistry for MemoryAgentRegistry {
    async fn register(&self, agent: AgentDescriptor) -> Result<(), RelayError> {
        let mut agents = self.agents.write().await;
        // 名称与 URL 都唯一：同名或同 URL 的旧条目合并为一条，保留最早的位置
        let mut slot = None;
        let mut kept = 0;
        agents.retain(|a| {
            let clash = a.base_url == agent.base_url || a.name == agent.name;
            if clash && slot.is_some() {
                return false;
            }
            if clash {
                slot = Some(kept);
            }
            kept += 1;
            true
        });
        match slot {
            Some(i) => agents[i] = agent,
            None => agents.push(agent),
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AgentDescriptor>, RelayError> {
        Ok(self.agents.read().await.clone())
    }
}
