//! 会话存储：每个会话保留有限长度的对话历史，不活跃超时后丢弃

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::core::RelayError;

/// 历史条目角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    /// 编排结果的合成摘要（哪些 Agent 执行了什么）
    AgentSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
        }
    }

    pub fn agent_summary(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::AgentSummary,
            text: text.into(),
        }
    }
}

/// 单个会话
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub session_id: String,
    pub history: Vec<Turn>,
    pub last_updated_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            history: Vec::new(),
            last_updated_at: Utc::now(),
        }
    }

    /// 由服务端生成新会话 ID
    pub fn mint() -> Self {
        Self::new(uuid::Uuid::new_v4().to_string())
    }

    /// 追加条目；超出 max_turns 时丢弃最旧的部分
    pub fn append(&mut self, turns: impl IntoIterator<Item = Turn>, max_turns: usize) {
        self.history.extend(turns);
        if self.history.len() > max_turns {
            let excess = self.history.len() - max_turns;
            self.history.drain(..excess);
        }
        self.last_updated_at = Utc::now();
    }

    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_updated_at >= ttl
    }
}

/// 会话存储接口
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// 读取会话；已过期的会话视为不存在
    async fn load(&self, session_id: &str) -> Result<Option<ConversationSession>, RelayError>;

    /// 整条保存（last-writer-wins）
    async fn save(&self, session: ConversationSession) -> Result<(), RelayError>;

    /// 清理过期会话，返回清理条数
    async fn cleanup_expired(&self) -> Result<usize, RelayError>;

    async fn active_count(&self) -> Result<usize, RelayError>;
}

/// 内存会话存储
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, ConversationSession>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(session_timeout_secs: u64) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(session_timeout_secs as i64),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new(3600)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, session_id: &str) -> Result<Option<ConversationSession>, RelayError> {
        let now = Utc::now();
        Ok(self
            .sessions
            .read()
            .await
            .get(session_id)
            .filter(|s| !s.is_expired(self.ttl, now))
            .cloned())
    }

    async fn save(&self, session: ConversationSession) -> Result<(), RelayError> {
        self.sessions
            .write()
            .await
            .insert(session.session_id.clone(), session);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, RelayError> {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(self.ttl, now));
        Ok(before - sessions.len())
    }

    async fn active_count(&self) -> Result<usize, RelayError> {
        Ok(self.sessions.read().await.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_keeps_most_recent() {
        let mut session = ConversationSession::new("s1");
        for i in 0..11 {
            session.append(
                [
                    Turn::user(format!("intent {}", i)),
                    Turn::agent_summary(format!("summary {}", i)),
                ],
                20,
            );
        }
        assert_eq!(session.history.len(), 20);
        assert_eq!(session.history[0], Turn::user("intent 1"));
        assert_eq!(session.history[19], Turn::agent_summary("summary 10"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemorySessionStore::new(3600);
        let mut session = ConversationSession::mint();
        session.append([Turn::user("hello")], 20);
        store.save(session.clone()).await.unwrap();

        let loaded = store.load(&session.session_id).await.unwrap().unwrap();
        assert_eq!(loaded.history, vec![Turn::user("hello")]);
        assert!(store.load("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_sessions_are_discarded() {
        let store = MemorySessionStore::new(0);
        store.save(ConversationSession::new("old")).await.unwrap();

        assert!(store.load("old").await.unwrap().is_none());
        assert_eq!(store.cleanup_expired().await.unwrap(), 1);
        assert_eq!(store.active_count().await.unwrap(), 0);
    }
}
