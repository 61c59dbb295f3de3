//! SQLite 持久化存储
//!
//! 同一个连接池同时实现 AgentRegistry / MappingStore / SessionStore，服务重启后注册表、
//! 映射缓存与会话历史都可恢复。时间统一存为毫秒时间戳。

#![cfg(feature = "async-sqlite")]

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::Row;

use super::agents::{AgentDescriptor, AgentRegistry};
use super::mappings::{CallMapping, MappingStore};
use super::sessions::{ConversationSession, SessionStore, Turn};
use crate::core::RelayError;
use crate::translator::CallSpec;

pub struct SqliteStore {
    pool: sqlx::sqlite::SqlitePool,
    session_ttl: Duration,
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

fn decode_err(e: serde_json::Error) -> RelayError {
    RelayError::Store(format!("corrupt row: {}", e))
}

impl SqliteStore {
    pub async fn new(
        db_path: impl AsRef<Path>,
        session_timeout_secs: u64,
    ) -> Result<Self, RelayError> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path.as_ref().display());

        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await?;

        let store = Self {
            pool,
            session_ttl: Duration::seconds(session_timeout_secs as i64),
        };
        store.init_tables().await?;
        Ok(store)
    }

    async fn init_tables(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS agents (
                base_url TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                last_seen_at INTEGER NOT NULL,
                registered_seq INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS call_mappings (
                target_url TEXT NOT NULL,
                fingerprint TEXT NOT NULL,
                call_spec TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                PRIMARY KEY (target_url, fingerprint)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                history TEXT NOT NULL,
                last_updated_at INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// 关闭连接池
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl AgentRegistry for SqliteStore {
    async fn register(&self, agent: AgentDescriptor) -> Result<(), RelayError> {
        let mut tx = self.pool.begin().await?;

        // 同 URL 或同名称的旧条目一并替换，沿用其中最早的注册序号
        let seq: Option<i64> = sqlx::query_scalar(
            "SELECT MIN(registered_seq) FROM agents WHERE base_url = ? OR name = ?",
        )
        .bind(&agent.base_url)
        .bind(&agent.name)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM agents WHERE base_url = ? OR name = ?")
            .bind(&agent.base_url)
            .bind(&agent.name)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO agents (base_url, name, description, last_seen_at, registered_seq)
             VALUES (?, ?, ?, ?, COALESCE(?, (SELECT COALESCE(MAX(registered_seq), 0) + 1 FROM agents)))",
        )
        .bind(&agent.base_url)
        .bind(&agent.name)
        .bind(&agent.description)
        .bind(agent.last_seen_at.timestamp_millis())
        .bind(seq)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AgentDescriptor>, RelayError> {
        let rows = sqlx::query(
            "SELECT base_url, name, description, last_seen_at FROM agents ORDER BY registered_seq ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| AgentDescriptor {
                name: row.get("name"),
                base_url: row.get("base_url"),
                description: row.get("description"),
                last_seen_at: from_millis(row.get("last_seen_at")),
            })
            .collect())
    }
}

#[async_trait]
impl MappingStore for SqliteStore {
    async fn get(
        &self,
        target_url: &str,
        fingerprint: &str,
    ) -> Result<Option<CallMapping>, RelayError> {
        let row = sqlx::query(
            "SELECT call_spec, created_at FROM call_mappings WHERE target_url = ? AND fingerprint = ?",
        )
        .bind(target_url)
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let spec_json: String = row.get("call_spec");
        let call_spec: CallSpec = serde_json::from_str(&spec_json).map_err(decode_err)?;
        Ok(Some(CallMapping {
            target_url: target_url.to_string(),
            fingerprint: fingerprint.to_string(),
            call_spec,
            created_at: from_millis(row.get("created_at")),
        }))
    }

    async fn put(&self, mapping: CallMapping) -> Result<(), RelayError> {
        let spec_json = serde_json::to_string(&mapping.call_spec).map_err(decode_err)?;
        sqlx::query(
            "INSERT OR REPLACE INTO call_mappings (target_url, fingerprint, call_spec, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&mapping.target_url)
        .bind(&mapping.fingerprint)
        .bind(&spec_json)
        .bind(mapping.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, target_url: &str, fingerprint: &str) -> Result<(), RelayError> {
        sqlx::query("DELETE FROM call_mappings WHERE target_url = ? AND fingerprint = ?")
            .bind(target_url)
            .bind(fingerprint)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, RelayError> {
        let result = sqlx::query("DELETE FROM call_mappings WHERE created_at <= ?")
            .bind(cutoff.timestamp_millis())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn len(&self) -> Result<usize, RelayError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM call_mappings")
            .fetch_one(&self.pool)
            .await?
            .get("n");
        Ok(count as usize)
    }
}

#[async_trait]
impl SessionStore for SqliteStore {
    async fn load(&self, session_id: &str) -> Result<Option<ConversationSession>, RelayError> {
        let cutoff = (Utc::now() - self.session_ttl).timestamp_millis();
        let row = sqlx::query(
            "SELECT history, last_updated_at FROM sessions WHERE session_id = ? AND last_updated_at > ?",
        )
        .bind(session_id)
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let history_json: String = row.get("history");
        let history: Vec<Turn> = serde_json::from_str(&history_json).map_err(decode_err)?;
        Ok(Some(ConversationSession {
            session_id: session_id.to_string(),
            history,
            last_updated_at: from_millis(row.get("last_updated_at")),
        }))
    }

    async fn save(&self, session: ConversationSession) -> Result<(), RelayError> {
        let history_json = serde_json::to_string(&session.history).map_err(decode_err)?;
        sqlx::query(
            "INSERT OR REPLACE INTO sessions (session_id, history, last_updated_at) VALUES (?, ?, ?)",
        )
        .bind(&session.session_id)
        .bind(&history_json)
        .bind(session.last_updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, RelayError> {
        let cutoff = (Utc::now() - self.session_ttl).timestamp_millis();
        let result = sqlx::query("DELETE FROM sessions WHERE last_updated_at <= ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() as usize)
    }

    async fn active_count(&self) -> Result<usize, RelayError> {
        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM sessions")
            .fetch_one(&self.pool)
            .await?
            .get("n");
        Ok(count as usize)
    }
}
