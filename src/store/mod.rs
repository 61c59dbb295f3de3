//! 存储层：Agent 目录、调用映射缓存、会话历史
//!
//! 每类数据一个 trait，内存实现为默认；启用 `async-sqlite` feature 并配置 sqlite_path 时
//! 三者共用一个 SQLite 存储。

pub mod agents;
pub mod mappings;
pub mod sessions;
#[cfg(feature = "async-sqlite")]
mod sqlite;

use std::path::Path;
use std::sync::Arc;

pub use agents::{find_agent, AgentDescriptor, AgentRegistry, MemoryAgentRegistry};
pub use mappings::{fingerprint, CallMapping, CallSpecCache, MappingStore, MemoryMappingStore};
pub use sessions::{ConversationSession, MemorySessionStore, SessionStore, Turn, TurnRole};
#[cfg(feature = "async-sqlite")]
pub use sqlite::SqliteStore;

/// 三类存储的句柄集合
#[derive(Clone)]
pub struct Stores {
    pub agents: Arc<dyn AgentRegistry>,
    pub mappings: Arc<dyn MappingStore>,
    pub sessions: Arc<dyn SessionStore>,
    #[cfg(feature = "async-sqlite")]
    sqlite: Option<Arc<SqliteStore>>,
}

impl Stores {
    /// 纯内存存储
    pub fn in_memory(session_timeout_secs: u64) -> Self {
        Self {
            agents: Arc::new(MemoryAgentRegistry::new()),
            mappings: Arc::new(MemoryMappingStore::new()),
            sessions: Arc::new(MemorySessionStore::new(session_timeout_secs)),
            #[cfg(feature = "async-sqlite")]
            sqlite: None,
        }
    }

    /// 关闭底层连接；内存存储无操作
    pub async fn close(&self) {
        #[cfg(feature = "async-sqlite")]
        if let Some(store) = &self.sqlite {
            store.close().await;
            tracing::info!("SQLite store closed");
        }
    }
}

/// 创建存储
///
/// 如果提供了 db_path 且启用了 async-sqlite feature，则使用持久化存储；否则使用内存存储
pub async fn create_stores(db_path: Option<&Path>, session_timeout_secs: u64) -> Stores {
    #[cfg(feature = "async-sqlite")]
    if let Some(path) = db_path {
        match SqliteStore::new(path, session_timeout_secs).await {
            Ok(store) => {
                tracing::info!("Using SQLite store: {:?}", path);
                let store = Arc::new(store);
                return Stores {
                    agents: store.clone(),
                    mappings: store.clone(),
                    sessions: store.clone(),
                    sqlite: Some(store),
                };
            }
            Err(e) => {
                tracing::warn!("Failed to open SQLite store, falling back to memory: {}", e);
            }
        }
    }

    #[cfg(not(feature = "async-sqlite"))]
    if db_path.is_some() {
        tracing::warn!("sqlite_path set but async-sqlite feature not enabled, using memory store");
    }

    tracing::info!("Using in-memory store");
    Stores::in_memory(session_timeout_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_memory_stores() {
        let stores = create_stores(None, 3600).await;
        stores.close().await;
        assert!(stores.agents.list().await.unwrap().is_empty());
    }

    #[cfg(feature = "async-sqlite")]
    #[tokio::test]
    async fn test_close_sqlite_stores_keeps_data() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("relay.db");

        let stores = create_stores(Some(&path), 3600).await;
        stores
            .agents
            .register(AgentDescriptor::new("SalonBot", "http://a", "Books haircuts").unwrap())
            .await
            .unwrap();
        stores.close().await;
        // 关闭后连接池拒绝新查询
        assert!(stores.agents.list().await.is_err());

        let reopened = create_stores(Some(&path), 3600).await;
        assert_eq!(reopened.agents.list().await.unwrap().len(), 1);
        reopened.close().await;
    }
}
