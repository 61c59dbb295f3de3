//! 调用映射缓存：(目标 URL, 意图指纹) → 已解析的调用规格
//!
//! 指纹只做 trim + 小写归一化后取 SHA-256，属于精确匹配而非语义匹配。
//! 过期在读取时过滤，后台清理只是回收空间。

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::core::RelayError;
use crate::translator::CallSpec;

/// 意图指纹：大小写与首尾空白不敏感，其余任何差异都产生不同指纹
pub fn fingerprint(intent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(intent.trim().to_lowercase().as_bytes());
    hex::encode(hasher.finalize())
}

/// 一条缓存的映射
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallMapping {
    pub target_url: String,
    pub fingerprint: String,
    pub call_spec: CallSpec,
    pub created_at: DateTime<Utc>,
}

impl CallMapping {
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at >= ttl
    }
}

/// 映射存储接口（按键整条替换，不做部分更新）
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn get(&self, target_url: &str, fingerprint: &str)
        -> Result<Option<CallMapping>, RelayError>;

    async fn put(&self, mapping: CallMapping) -> Result<(), RelayError>;

    async fn remove(&self, target_url: &str, fingerprint: &str) -> Result<(), RelayError>;

    /// 删除 created_at 早于 cutoff 的映射，返回删除条数
    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, RelayError>;

    async fn len(&self) -> Result<usize, RelayError>;
}

type MappingKey = (String, String);

/// 内存映射存储
#[derive(Default)]
pub struct MemoryMappingStore {
    mappings: RwLock<HashMap<MappingKey, CallMapping>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn get(
        &self,
        target_url: &str,
        fingerprint: &str,
    ) -> Result<Option<CallMapping>, RelayError> {
        let key = (target_url.to_string(), fingerprint.to_string());
        Ok(self.mappings.read().await.get(&key).cloned())
    }

    async fn put(&self, mapping: CallMapping) -> Result<(), RelayError> {
        let key = (mapping.target_url.clone(), mapping.fingerprint.clone());
        self.mappings.write().await.insert(key, mapping);
        Ok(())
    }

    async fn remove(&self, target_url: &str, fingerprint: &str) -> Result<(), RelayError> {
        let key = (target_url.to_string(), fingerprint.to_string());
        self.mappings.write().await.remove(&key);
        Ok(())
    }

    async fn purge_before(&self, cutoff: DateTime<Utc>) -> Result<usize, RelayError> {
        let mut mappings = self.mappings.write().await;
        let before = mappings.len();
        mappings.retain(|_, m| m.created_at > cutoff);
        Ok(before - mappings.len())
    }

    async fn len(&self) -> Result<usize, RelayError> {
        Ok(self.mappings.read().await.len())
    }
}

/// 调用规格缓存：在 MappingStore 之上负责指纹计算与 TTL
#[derive(Clone)]
pub struct CallSpecCache {
    store: Arc<dyn MappingStore>,
    ttl: Duration,
}

impl CallSpecCache {
    pub fn new(store: Arc<dyn MappingStore>, ttl_secs: u64) -> Self {
        Self {
            store,
            ttl: Duration::seconds(ttl_secs as i64),
        }
    }

    /// 命中且未过期时返回调用规格
    pub async fn lookup(
        &self,
        target_url: &str,
        intent: &str,
    ) -> Result<Option<CallSpec>, RelayError> {
        let mapping = self.store.get(target_url, &fingerprint(intent)).await?;
        Ok(mapping
            .filter(|m| !m.is_expired(self.ttl, Utc::now()))
            .map(|m| m.call_spec))
    }

    /// 整条替换该键的映射
    pub async fn store(
        &self,
        target_url: &str,
        intent: &str,
        call_spec: CallSpec,
    ) -> Result<(), RelayError> {
        self.store
            .put(CallMapping {
                target_url: target_url.to_string(),
                fingerprint: fingerprint(intent),
                call_spec,
                created_at: Utc::now(),
            })
            .await
    }

    pub async fn invalidate(&self, target_url: &str, intent: &str) -> Result<(), RelayError> {
        self.store.remove(target_url, &fingerprint(intent)).await
    }

    /// 回收已过期映射
    pub async fn purge_expired(&self) -> Result<usize, RelayError> {
        self.store.purge_before(Utc::now() - self.ttl).await
    }

    /// 直接访问底层存储的原始映射（不做过期过滤）
    pub async fn mapping(
        &self,
        target_url: &str,
        intent: &str,
    ) -> Result<Option<CallMapping>, RelayError> {
        self.store.get(target_url, &fingerprint(intent)).await
    }

    pub async fn len(&self) -> Result<usize, RelayError> {
        self.store.len().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(endpoint: &str) -> CallSpec {
        CallSpec::new("POST", endpoint, serde_json::json!({"a": 1}), "test")
    }

    #[test]
    fn test_fingerprint_normalization() {
        assert_eq!(
            fingerprint("Book a haircut at 5pm"),
            fingerprint("  book a HAIRCUT at 5pm\n")
        );
        assert_ne!(fingerprint("book a haircut at 5pm"), fingerprint("book a haircut at 5pm!"));
        assert_ne!(fingerprint("book a haircut at 5pm"), fingerprint("book a  haircut at 5pm"));
        assert_eq!(fingerprint("x").len(), 64);
    }

    #[tokio::test]
    async fn test_store_then_lookup_returns_exact_spec() {
        let cache = CallSpecCache::new(Arc::new(MemoryMappingStore::new()), 3600);
        cache.store("http://a", "book", spec("/bookings/create")).await.unwrap();

        assert_eq!(
            cache.lookup("http://a", "BOOK ").await.unwrap(),
            Some(spec("/bookings/create"))
        );
        assert_eq!(cache.lookup("http://b", "book").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_store_replaces_prior_entry() {
        let cache = CallSpecCache::new(Arc::new(MemoryMappingStore::new()), 3600);
        cache.store("http://a", "book", spec("/v1")).await.unwrap();
        cache.store("http://a", "book", spec("/v2")).await.unwrap();

        assert_eq!(cache.len().await.unwrap(), 1);
        assert_eq!(cache.lookup("http://a", "book").await.unwrap().unwrap().endpoint, "/v2");
    }

    #[tokio::test]
    async fn test_expired_entry_is_not_served() {
        let cache = CallSpecCache::new(Arc::new(MemoryMappingStore::new()), 0);
        cache.store("http://a", "book", spec("/v1")).await.unwrap();

        assert_eq!(cache.lookup("http://a", "book").await.unwrap(), None);
        // 仍物理存在，直到清理
        assert!(cache.mapping("http://a", "book").await.unwrap().is_some());
        assert_eq!(cache.purge_expired().await.unwrap(), 1);
        assert_eq!(cache.len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_invalidate_removes_entry() {
        let cache = CallSpecCache::new(Arc::new(MemoryMappingStore::new()), 3600);
        cache.store("http://a", "book", spec("/v1")).await.unwrap();
        cache.invalidate("http://a", "Book").await.unwrap();
        assert_eq!(cache.lookup("http://a", "book").await.unwrap(), None);
    }
}
